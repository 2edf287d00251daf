//! Canonical snapshot settings and the partial delta every input source produces.
//!
//! Numeric fields are `f64` so a non-numeric command value can be written
//! through as NaN, matching how the console has always treated `--p abc`.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTENT: &str = "### 🚀 GLOWSNAP\n\nA high-performance **Markdown Beautifier**.\n\n- Paste your code or text\n- Customize the gradient\n- Export as PNG\n\n```javascript\nconsole.log('Hello World');\n```";

/// Display theme of the preview card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DisplayTheme {
    #[default]
    Dark,
    Light,
    Obsidian,
}

impl DisplayTheme {
    pub fn all() -> [DisplayTheme; 3] {
        [DisplayTheme::Dark, DisplayTheme::Light, DisplayTheme::Obsidian]
    }

    pub fn name(&self) -> &'static str {
        match self {
            DisplayTheme::Dark => "dark",
            DisplayTheme::Light => "light",
            DisplayTheme::Obsidian => "obsidian",
        }
    }

    /// Exact, case-sensitive match against the theme names
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|t| t.name() == name)
    }
}

/// What the card renders: markdown text or an uploaded image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    #[default]
    Markdown,
    Image,
}

impl ContentMode {
    pub fn name(&self) -> &'static str {
        match self {
            ContentMode::Markdown => "markdown",
            ContentMode::Image => "image",
        }
    }

    /// Only the exact strings `markdown` and `image` are accepted
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "markdown" => Some(ContentMode::Markdown),
            "image" => Some(ContentMode::Image),
            _ => None,
        }
    }
}

/// Accent position in percent of the card (0-100 by convention, never clamped).
///
/// A missing axis reads as the default 50. A `null` axis (how a NaN axis is
/// written out) reads back as NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    #[serde(deserialize_with = "nan_if_null")]
    pub x: f64,
    #[serde(deserialize_with = "nan_if_null")]
    pub y: f64,
}

fn nan_if_null<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 50.0, y: 50.0 }
    }
}

/// The single settings record owned by a running session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub content: String,
    pub padding: f64,
    pub border_width: f64,
    pub border_radius: f64,
    pub gradient_start: String,
    pub gradient_end: String,
    pub gradient_angle: f64,

    // Color C - radial accent. Kept while disabled so re-enabling restores it.
    pub use_color_c: bool,
    pub gradient_color_c: String,
    pub color_c_position: Position,
    pub color_c_range: f64,

    pub show_window_controls: bool,
    pub font_size: f64,
    pub opacity: f64,
    pub shadow: f64,
    pub theme: DisplayTheme,
    pub mode: ContentMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            content: DEFAULT_CONTENT.to_string(),
            padding: 60.0,
            border_width: 1.0,
            border_radius: 16.0,
            gradient_start: "#3b82f6".to_string(),
            gradient_end: "#9333ea".to_string(),
            gradient_angle: 135.0,
            use_color_c: false,
            gradient_color_c: "#ffffff".to_string(),
            color_c_position: Position::default(),
            color_c_range: 50.0,
            show_window_controls: true,
            font_size: 16.0,
            opacity: 100.0,
            shadow: 40.0,
            theme: DisplayTheme::Dark,
            mode: ContentMode::Markdown,
            image_data: None,
        }
    }
}

/// A partial settings record. Absent fields leave the target untouched.
///
/// `color_c_position` is replaced as a whole object; producers that only
/// change one axis must copy the other one forward themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_angle: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_color_c: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient_color_c: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_c_position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_c_range: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_window_controls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<DisplayTheme>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ContentMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

impl SettingsDelta {
    pub fn is_empty(&self) -> bool {
        *self == SettingsDelta::default()
    }

    /// Snapshot every field of `settings` except the text content
    pub fn style_of(settings: &Settings) -> Self {
        Self {
            content: None,
            padding: Some(settings.padding),
            border_width: Some(settings.border_width),
            border_radius: Some(settings.border_radius),
            gradient_start: Some(settings.gradient_start.clone()),
            gradient_end: Some(settings.gradient_end.clone()),
            gradient_angle: Some(settings.gradient_angle),
            use_color_c: Some(settings.use_color_c),
            gradient_color_c: Some(settings.gradient_color_c.clone()),
            color_c_position: Some(settings.color_c_position),
            color_c_range: Some(settings.color_c_range),
            show_window_controls: Some(settings.show_window_controls),
            font_size: Some(settings.font_size),
            opacity: Some(settings.opacity),
            shadow: Some(settings.shadow),
            theme: Some(settings.theme),
            mode: Some(settings.mode),
            image_data: settings.image_data.clone(),
        }
    }
}

impl Settings {
    /// Shallow merge of `delta` into this record. No validation.
    pub fn apply(&mut self, delta: SettingsDelta) {
        macro_rules! overwrite {
            ($($field:ident),*) => {
                $(if let Some(value) = delta.$field { self.$field = value; })*
            };
        }
        overwrite!(
            content, padding, border_width, border_radius, gradient_start, gradient_end,
            gradient_angle, use_color_c, gradient_color_c, color_c_position, color_c_range,
            show_window_controls, font_size, opacity, shadow, theme, mode
        );
        if delta.image_data.is_some() {
            self.image_data = delta.image_data;
        }
    }
}

/// Return `current` with every key present in `delta` overwritten
pub fn apply_partial(current: &Settings, delta: SettingsDelta) -> Settings {
    let mut next = current.clone();
    next.apply(delta);
    next
}

/// Prefix a color value with `#` when it is missing. The rest is not checked.
pub fn with_hash(value: &str) -> String {
    if value.starts_with('#') {
        value.to_string()
    } else {
        format!("#{}", value)
    }
}

/// Lenient integer parse.
///
/// Leading whitespace and a sign are accepted, `0x` switches to hex, digits are
/// read until the first non-digit, and input with no digits yields NaN.
pub fn parse_int(input: &str) -> f64 {
    let s = input.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = if s.starts_with("0x") || s.starts_with("0X") {
        (16, &s[2..])
    } else {
        (10, s)
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_digit(radix))
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 {
        return f64::NAN;
    }

    let mut value = 0f64;
    for c in digits[..end].chars() {
        // is_digit(radix) above guarantees to_digit succeeds
        value = value * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64;
    }
    if negative {
        -value
    } else {
        value
    }
}

/// Format a numeric field the way the console prints it (`60`, not `60.0`)
pub fn format_number(value: f64) -> String {
    format!("{}", value)
}

/// Build the `config ...` console command that reproduces a style.
///
/// Missing fields print as `undefined`, which the interpreter parses as NaN.
/// Accent flags are only emitted when the accent is enabled.
pub fn cli_command(style: &SettingsDelta) -> String {
    fn num(value: Option<f64>) -> String {
        value.map(format_number).unwrap_or_else(|| "undefined".to_string())
    }
    fn text(value: &Option<String>) -> String {
        value.clone().unwrap_or_else(|| "undefined".to_string())
    }

    let mut cmd = format!(
        "config --p {} --r {} --f {} --a {} --s {} --e {}",
        num(style.padding),
        num(style.border_radius),
        num(style.font_size),
        num(style.gradient_angle),
        text(&style.gradient_start),
        text(&style.gradient_end),
    );
    if style.use_color_c == Some(true) {
        cmd.push_str(&format!(
            " --c {} --cr {} --cx {} --cy {}",
            text(&style.gradient_color_c),
            num(style.color_c_range),
            num(style.color_c_position.map(|p| p.x)),
            num(style.color_c_position.map(|p| p.y)),
        ));
    }
    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.padding, 60.0);
        assert_eq!(s.border_radius, 16.0);
        assert_eq!(s.gradient_start, "#3b82f6");
        assert_eq!(s.gradient_end, "#9333ea");
        assert_eq!(s.gradient_angle, 135.0);
        assert!(!s.use_color_c);
        assert_eq!(s.color_c_position, Position { x: 50.0, y: 50.0 });
        assert_eq!(s.theme, DisplayTheme::Dark);
        assert_eq!(s.mode, ContentMode::Markdown);
        assert!(s.image_data.is_none());
    }

    #[test]
    fn test_apply_partial_only_touches_present_keys() {
        let base = Settings::default();
        let next = apply_partial(
            &base,
            SettingsDelta {
                padding: Some(80.0),
                ..Default::default()
            },
        );
        assert_eq!(next.padding, 80.0);
        assert_eq!(next.border_radius, base.border_radius);
        assert_eq!(next.content, base.content);
    }

    #[test]
    fn test_position_is_replaced_whole() {
        let mut s = Settings::default();
        s.color_c_position = Position { x: 10.0, y: 90.0 };
        s.apply(SettingsDelta {
            color_c_position: Some(Position { x: 20.0, y: 50.0 }),
            ..Default::default()
        });
        assert_eq!(s.color_c_position, Position { x: 20.0, y: 50.0 });
    }

    #[test]
    fn test_position_reads_null_and_missing_axes() {
        let stored = serde_json::to_string(&Position { x: f64::NAN, y: 20.0 }).unwrap();
        assert_eq!(stored, r#"{"x":null,"y":20.0}"#);

        let back: Position = serde_json::from_str(&stored).unwrap();
        assert!(back.x.is_nan());
        assert_eq!(back.y, 20.0);

        let half: Position = serde_json::from_str(r#"{"x":10}"#).unwrap();
        assert_eq!(half, Position { x: 10.0, y: 50.0 });
    }

    #[test]
    fn test_disabling_accent_keeps_values() {
        let mut s = Settings::default();
        s.apply(SettingsDelta {
            use_color_c: Some(true),
            gradient_color_c: Some("#ff00ff".into()),
            ..Default::default()
        });
        s.apply(SettingsDelta {
            use_color_c: Some(false),
            ..Default::default()
        });
        assert_eq!(s.gradient_color_c, "#ff00ff");
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("80"), 80.0);
        assert_eq!(parse_int("-15"), -15.0);
        assert_eq!(parse_int("12px"), 12.0);
        assert_eq!(parse_int("7.9"), 7.0);
        assert_eq!(parse_int("0x1f"), 31.0);
        assert!(parse_int("abc").is_nan());
        assert!(parse_int("").is_nan());
        assert!(parse_int("undefined").is_nan());
    }

    #[test]
    fn test_with_hash() {
        assert_eq!(with_hash("ff0000"), "#ff0000");
        assert_eq!(with_hash("#ff0000"), "#ff0000");
    }

    #[test]
    fn test_style_snapshot_drops_content() {
        let style = SettingsDelta::style_of(&Settings::default());
        assert!(style.content.is_none());
        assert_eq!(style.padding, Some(60.0));
    }

    #[test]
    fn test_delta_serializes_camel_case_without_absent_keys() {
        let delta = SettingsDelta {
            gradient_start: Some("#ff0000".into()),
            use_color_c: Some(true),
            ..Default::default()
        };
        let json = serde_json::to_string(&delta).unwrap();
        assert_eq!(json, r##"{"gradientStart":"#ff0000","useColorC":true}"##);
    }

    #[test]
    fn test_cli_command() {
        let style = SettingsDelta::style_of(&Settings::default());
        assert_eq!(
            cli_command(&style),
            "config --p 60 --r 16 --f 16 --a 135 --s #3b82f6 --e #9333ea"
        );

        let mut s = Settings::default();
        s.use_color_c = true;
        s.color_c_position = Position { x: 25.0, y: 75.0 };
        let cmd = cli_command(&SettingsDelta::style_of(&s));
        assert!(cmd.ends_with("--c #ffffff --cr 50 --cx 25 --cy 75"));
    }
}
