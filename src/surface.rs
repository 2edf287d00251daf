//! Render surface handed to the snapshot capability.

use crate::markdown::{self, Block};
use crate::settings::{format_number, ContentMode, DisplayTheme, Settings};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SurfaceBody {
    Blocks { blocks: Vec<Block> },
    /// `data` is `None` when image mode has nothing uploaded yet (placeholder)
    Image { data: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderSurface {
    pub background: String,
    pub padding: f64,
    pub border_radius: f64,
    pub border_width: f64,
    pub font_size: f64,
    pub opacity: f64,
    pub shadow: f64,
    pub show_window_controls: bool,
    pub theme: DisplayTheme,
    pub body: SurfaceBody,
}

pub fn linear_background(settings: &Settings) -> String {
    format!(
        "linear-gradient({}deg, {}, {})",
        format_number(settings.gradient_angle),
        settings.gradient_start,
        settings.gradient_end
    )
}

/// Radial accent layer, `None` while the accent is disabled
pub fn accent_background(settings: &Settings) -> Option<String> {
    if !settings.use_color_c {
        return None;
    }
    let pos = settings.color_c_position;
    Some(format!(
        "radial-gradient(circle at {}% {}%, {} 0%, transparent {}%)",
        format_number(pos.x),
        format_number(pos.y),
        settings.gradient_color_c,
        format_number(settings.color_c_range)
    ))
}

impl RenderSurface {
    pub fn compose(settings: &Settings) -> Self {
        let linear = linear_background(settings);
        let background = match accent_background(settings) {
            Some(radial) => format!("{}, {}", radial, linear),
            None => linear,
        };

        let body = match settings.mode {
            ContentMode::Markdown => SurfaceBody::Blocks {
                blocks: markdown::render_blocks(&settings.content),
            },
            ContentMode::Image => SurfaceBody::Image {
                data: settings.image_data.clone(),
            },
        };

        Self {
            background,
            padding: settings.padding,
            border_radius: settings.border_radius,
            border_width: settings.border_width,
            font_size: settings.font_size,
            opacity: settings.opacity,
            shadow: settings.shadow,
            show_window_controls: settings.show_window_controls,
            theme: settings.theme,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Position;

    #[test]
    fn test_linear_only_by_default() {
        let surface = RenderSurface::compose(&Settings::default());
        assert_eq!(surface.background, "linear-gradient(135deg, #3b82f6, #9333ea)");
        assert!(matches!(surface.body, SurfaceBody::Blocks { .. }));
    }

    #[test]
    fn test_accent_layers_before_linear() {
        let mut s = Settings::default();
        s.use_color_c = true;
        s.color_c_position = Position { x: 20.0, y: 80.0 };
        let surface = RenderSurface::compose(&s);
        assert_eq!(
            surface.background,
            "radial-gradient(circle at 20% 80%, #ffffff 0%, transparent 50%), linear-gradient(135deg, #3b82f6, #9333ea)"
        );
    }

    #[test]
    fn test_image_mode_without_payload_is_placeholder() {
        let mut s = Settings::default();
        s.mode = ContentMode::Image;
        let surface = RenderSurface::compose(&s);
        assert_eq!(surface.body, SurfaceBody::Image { data: None });
    }
}
