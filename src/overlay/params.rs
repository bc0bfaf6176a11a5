use std::fmt;

pub const DEFAULT_TEXT: &str = "Sample Text";

/// Anchor of the text block inside the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Center,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Position {
    pub const ALL: [Position; 9] = [
        Position::Center,
        Position::Top,
        Position::Bottom,
        Position::Left,
        Position::Right,
        Position::TopLeft,
        Position::TopRight,
        Position::BottomLeft,
        Position::BottomRight,
    ];

    pub fn parse(value: &str) -> Option<Self> {
        let position = match value.trim().to_ascii_lowercase().as_str() {
            "center" => Position::Center,
            "top" => Position::Top,
            "bottom" => Position::Bottom,
            "left" => Position::Left,
            "right" => Position::Right,
            "top-left" => Position::TopLeft,
            "top-right" => Position::TopRight,
            "bottom-left" => Position::BottomLeft,
            "bottom-right" => Position::BottomRight,
            _ => return None,
        };
        Some(position)
    }

    /// Unknown keywords fall back to `center`.
    pub fn parse_or_center(value: &str) -> Self {
        Self::parse(value).unwrap_or_else(|| {
            tracing::warn!("unknown position '{}', using center", value);
            Position::Center
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Center => "center",
            Position::Top => "top",
            Position::Bottom => "bottom",
            Position::Left => "left",
            Position::Right => "right",
            Position::TopLeft => "top-left",
            Position::TopRight => "top-right",
            Position::BottomLeft => "bottom-left",
            Position::BottomRight => "bottom-right",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Horizontal alignment of each line inside the text block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

impl TextAlign {
    pub fn parse_or_center(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" => TextAlign::Left,
            "right" => TextAlign::Right,
            _ => TextAlign::Center,
        }
    }

    /// Horizontal offset of a line of `line_width` inside a block of `block_width`.
    pub fn offset(&self, block_width: i64, line_width: i64) -> i64 {
        match self {
            TextAlign::Left => 0,
            TextAlign::Center => (block_width - line_width).div_euclid(2),
            TextAlign::Right => block_width - line_width,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayParams {
    pub text: String,
    pub font_name: Option<String>,
    pub font_size: u32,
    pub text_color: String,
    pub bg_color: String,
    pub bg_opacity: u8,
    pub bg_radius: u32,
    pub bg_padding: u32,
    pub bg_blur: u32,
    pub box_width_percent: u32,
    pub position: Position,
    pub text_align: TextAlign,
    pub x_offset: i64,
    pub y_offset: i64,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT.to_string(),
            font_name: None,
            font_size: 40,
            text_color: "#FFFFFF".to_string(),
            bg_color: "#000000".to_string(),
            bg_opacity: 128,
            bg_radius: 15,
            bg_padding: 20,
            bg_blur: 10,
            box_width_percent: 80,
            position: Position::Center,
            text_align: TextAlign::Center,
            x_offset: 0,
            y_offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_position_keyword_round_trips() {
        for position in Position::ALL {
            assert_eq!(Position::parse(position.as_str()), Some(position));
        }
        assert_eq!(Position::parse(" Top-Right "), Some(Position::TopRight));
        assert_eq!(Position::parse("middle"), None);
        assert_eq!(Position::parse_or_center("middle"), Position::Center);
    }

    #[test]
    fn text_align_offsets() {
        assert_eq!(TextAlign::Left.offset(100, 41), 0);
        assert_eq!(TextAlign::Center.offset(100, 41), 29);
        assert_eq!(TextAlign::Right.offset(100, 41), 59);
        assert_eq!(TextAlign::parse_or_center("justify"), TextAlign::Center);
    }

    #[test]
    fn defaults_follow_form_defaults() {
        let params = OverlayParams::default();
        assert_eq!(params.font_size, 40);
        assert_eq!(params.bg_opacity, 128);
        assert_eq!(params.bg_blur, 10);
        assert_eq!(params.box_width_percent, 80);
        assert_eq!(params.position, Position::Center);
    }
}
