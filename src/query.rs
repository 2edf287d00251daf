//! Query-string input for scripted invocation.
//!
//! Every parameter is optional and decoded independently; decode failures fall
//! back rather than abort. The result is one merged delta.

use crate::settings::{parse_int, with_hash, ContentMode, Position, SettingsDelta};
use crate::storage::{self, KeyValueStore, CLI_IMAGE_KEY};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use url::Url;

/// Standard alphabet, padding optional, trailing bits tolerated
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    pub delta: SettingsDelta,
    /// `export=true` was present
    pub export: bool,
}

/// Decoded `key=value` pairs in their original order
struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    /// Accepts `a=1&b=2`, `?a=1&b=2` or a full URL
    fn parse(input: &str) -> Self {
        let input = input.trim();
        let query = match Url::parse(input) {
            Ok(url) => url.query().unwrap_or("").to_string(),
            Err(_) => input.strip_prefix('?').unwrap_or(input).to_string(),
        };
        let pairs = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Self { pairs }
    }

    fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// First value for `key`
    fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Long name first; an empty or missing value falls back to the short alias.
    /// Empty results are treated as absent.
    fn get_alias(&self, long: &str, short: &str) -> Option<&str> {
        self.get(long)
            .filter(|v| !v.is_empty())
            .or_else(|| self.get(short))
            .filter(|v| !v.is_empty())
    }
}

/// Base64 to UTF-8 text, or the raw value when either step fails
pub fn decode_content(raw: &str) -> String {
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    FORGIVING
        .decode(compact.as_bytes())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| raw.to_string())
}

/// Second percent-decoding pass applied to the `image` parameter.
/// A `%` not followed by two hex digits makes the whole value invalid.
fn decode_image(raw: &str) -> Option<String> {
    let bytes = raw.as_bytes();
    let well_formed = bytes.iter().enumerate().all(|(i, &b)| {
        b != b'%'
            || (bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    });
    if !well_formed {
        return None;
    }
    percent_encoding::percent_decode_str(raw)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}

/// Decode `query` into a single delta.
///
/// With `_cli=1`, the image is read from the one-shot store slot, which is
/// cleared right after. An `image` parameter always forces image mode.
pub fn decode(query: &str, store: &dyn KeyValueStore) -> QueryOutcome {
    let params = Params::parse(query);
    if params.is_empty() {
        return QueryOutcome::default();
    }

    let mut delta = SettingsDelta::default();

    if params.get("_cli") == Some("1") {
        match storage::take(store, CLI_IMAGE_KEY) {
            Ok(Some(image)) if !image.is_empty() => {
                tracing::info!("Using image handed off by the CLI ({} bytes)", image.len());
                delta.image_data = Some(image);
                delta.mode = Some(ContentMode::Image);
            }
            Ok(_) => tracing::debug!("CLI mode without a staged image"),
            Err(e) => tracing::warn!("Failed to read CLI image slot: {:#}", e),
        }
    }

    if params.has("content") {
        delta.content = params.get("content").map(decode_content);
    }

    if let Some(p) = params.get_alias("padding", "p") {
        delta.padding = Some(parse_int(p));
    }
    if let Some(r) = params.get_alias("radius", "r") {
        delta.border_radius = Some(parse_int(r));
    }
    if let Some(f) = params.get_alias("fontSize", "f") {
        delta.font_size = Some(parse_int(f));
    }
    if let Some(a) = params.get_alias("angle", "a") {
        delta.gradient_angle = Some(parse_int(a));
    }
    if let Some(mode) = params.get_alias("mode", "m").and_then(ContentMode::from_name) {
        delta.mode = Some(mode);
    }

    if let Some(image) = params.get_alias("image", "image") {
        match decode_image(image) {
            Some(data) => {
                delta.image_data = Some(data);
                delta.mode = Some(ContentMode::Image);
            }
            None => tracing::error!("Failed to decode image parameter"),
        }
    }

    if let Some(s) = params.get_alias("start", "s") {
        delta.gradient_start = Some(with_hash(s));
    }
    if let Some(e) = params.get_alias("end", "e") {
        delta.gradient_end = Some(with_hash(e));
    }
    if let Some(c) = params.get_alias("colorc", "c") {
        delta.gradient_color_c = Some(with_hash(c));
        delta.use_color_c = Some(true);
    }
    if let Some(cr) = params.get_alias("crange", "cr") {
        delta.color_c_range = Some(parse_int(cr));
    }

    let cx = params.get_alias("cx", "cx");
    let cy = params.get_alias("cy", "cy");
    if cx.is_some() || cy.is_some() {
        delta.color_c_position = Some(Position {
            x: parse_int(cx.unwrap_or("50")),
            y: parse_int(cy.unwrap_or("50")),
        });
    }

    QueryOutcome {
        delta,
        export: params.get("export") == Some("true"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use base64::engine::general_purpose::STANDARD;

    fn decode_plain(query: &str) -> QueryOutcome {
        decode(query, &MemoryStore::new())
    }

    #[test]
    fn test_empty_query_is_noop() {
        assert_eq!(decode_plain(""), QueryOutcome::default());
        assert_eq!(decode_plain("?"), QueryOutcome::default());
    }

    #[test]
    fn test_long_and_short_aliases() {
        let outcome = decode_plain("padding=40&r=8&fontSize=&f=22&a=-30");
        assert_eq!(outcome.delta.padding, Some(40.0));
        assert_eq!(outcome.delta.border_radius, Some(8.0));
        assert_eq!(outcome.delta.font_size, Some(22.0));
        assert_eq!(outcome.delta.gradient_angle, Some(-30.0));
        assert!(outcome.delta.gradient_start.is_none());
        assert!(!outcome.export);
    }

    #[test]
    fn test_content_base64_and_fallback() {
        let encoded = STANDARD.encode("# Héllo **world**");
        let query = format!(
            "content={}",
            percent_encoding::utf8_percent_encode(&encoded, percent_encoding::NON_ALPHANUMERIC)
        );
        assert_eq!(
            decode_plain(&query).delta.content.as_deref(),
            Some("# Héllo **world**")
        );

        // Not base64: the raw parameter is used verbatim
        assert_eq!(
            decode_plain("content=plain%20text!").delta.content.as_deref(),
            Some("plain text!")
        );
        // Valid base64 but not UTF-8
        assert_eq!(decode_content("/w=="), "/w==");
    }

    #[test]
    fn test_colors_get_hash_and_accent_enabled() {
        let outcome = decode_plain("s=ff0000&end=%2300ff00&c=fff");
        assert_eq!(outcome.delta.gradient_start.as_deref(), Some("#ff0000"));
        assert_eq!(outcome.delta.gradient_end.as_deref(), Some("#00ff00"));
        assert_eq!(outcome.delta.gradient_color_c.as_deref(), Some("#fff"));
        assert_eq!(outcome.delta.use_color_c, Some(true));
    }

    #[test]
    fn test_mode_accepts_only_known_values() {
        assert_eq!(decode_plain("m=image").delta.mode, Some(ContentMode::Image));
        assert_eq!(decode_plain("mode=video").delta.mode, None);
    }

    #[test]
    fn test_image_forces_image_mode() {
        let data = "data%253Aimage%252Fpng%253Bbase64%252CAAAA";
        for query in [
            format!("mode=markdown&image={}", data),
            format!("image={}&m=markdown", data),
        ] {
            let outcome = decode_plain(&query);
            assert_eq!(outcome.delta.mode, Some(ContentMode::Image));
            assert_eq!(
                outcome.delta.image_data.as_deref(),
                Some("data:image/png;base64,AAAA")
            );
        }
    }

    #[test]
    fn test_malformed_image_escape_is_skipped() {
        // `%25zz` arrives as `%zz` after the form decoding pass
        let outcome = decode_plain("m=markdown&image=data%25zz");
        assert!(outcome.delta.image_data.is_none());
        assert_eq!(outcome.delta.mode, Some(ContentMode::Markdown));

        let trailing = decode_plain("image=abc%25");
        assert!(trailing.delta.image_data.is_none());
        assert!(trailing.delta.mode.is_none());
    }

    #[test]
    fn test_position_defaults_missing_axis() {
        assert_eq!(
            decode_plain("cx=10").delta.color_c_position,
            Some(Position { x: 10.0, y: 50.0 })
        );
        assert_eq!(
            decode_plain("cy=70&cr=30").delta.color_c_position,
            Some(Position { x: 50.0, y: 70.0 })
        );
        assert_eq!(decode_plain("p=1").delta.color_c_position, None);
    }

    #[test]
    fn test_export_flag() {
        assert!(decode_plain("export=true").export);
        assert!(!decode_plain("export=1").export);
    }

    #[test]
    fn test_full_url_is_accepted() {
        let outcome = decode_plain("http://localhost:3000/?p=12&export=true");
        assert_eq!(outcome.delta.padding, Some(12.0));
        assert!(outcome.export);
    }

    #[test]
    fn test_cli_image_slot_is_single_use() {
        let store = MemoryStore::new();
        store.set(CLI_IMAGE_KEY, "data:image/png;base64,BBBB").unwrap();

        let first = decode("_cli=1&export=true", &store);
        assert_eq!(first.delta.image_data.as_deref(), Some("data:image/png;base64,BBBB"));
        assert_eq!(first.delta.mode, Some(ContentMode::Image));
        assert!(store.get(CLI_IMAGE_KEY).unwrap().is_none());

        let second = decode("_cli=1", &store);
        assert!(second.delta.image_data.is_none());
    }

    #[test]
    fn test_slot_untouched_without_cli_marker() {
        let store = MemoryStore::new();
        store.set(CLI_IMAGE_KEY, "data:image/png;base64,CCCC").unwrap();
        let outcome = decode("p=1", &store);
        assert!(outcome.delta.image_data.is_none());
        assert!(store.get(CLI_IMAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn test_non_numeric_query_value_is_nan() {
        assert!(decode_plain("p=wide").delta.padding.unwrap().is_nan());
    }
}
