use super::params::Position;

/// Margin between an edge anchor and the image border.
pub const EDGE_MARGIN: i64 = 20;
/// Extra leading added to the font size for every line.
pub const LINE_SPACING: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutLine {
    pub text: String,
    pub width: i64,
}

impl LayoutLine {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextLayout {
    pub lines: Vec<LayoutLine>,
    pub line_height: i64,
    pub width: i64,
    pub height: i64,
}

impl TextLayout {
    pub fn measure<F>(lines: Vec<String>, font_size: u32, measure: F) -> Self
    where
        F: Fn(&str) -> f32,
    {
        let line_height = font_size as i64 + LINE_SPACING;
        let lines: Vec<LayoutLine> = lines
            .into_iter()
            .map(|text| {
                let width = measure(&text).ceil().max(0.0) as i64;
                LayoutLine { text, width }
            })
            .collect();
        let width = lines.iter().map(|line| line.width).max().unwrap_or(0);
        let height = line_height * lines.len() as i64;
        Self {
            lines,
            line_height,
            width,
            height,
        }
    }
}

/// Widest a wrapped line may get for the given image width and box settings.
pub fn max_text_width(image_width: u32, box_width_percent: u32, padding: u32) -> f32 {
    let image_width = image_width as f32;
    let padding = padding as f32;
    let percent = box_width_percent.clamp(1, 100) as f32;
    let width = image_width * percent / 100.0 - padding * 2.0;
    width.min(image_width - padding).max(1.0)
}

/// Greedy word wrap. Explicit newlines always break, blank input lines stay
/// as empty lines, and a word wider than `max_width` keeps a line to itself.
pub fn wrap_text<F>(text: &str, max_width: f32, measure: F) -> Vec<String>
where
    F: Fn(&str) -> f32,
{
    let mut wrapped = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut current = String::new();
        let mut words = paragraph.split_whitespace().peekable();
        if words.peek().is_none() {
            wrapped.push(String::new());
            continue;
        }
        for word in words {
            if current.is_empty() {
                current.push_str(word);
                continue;
            }
            let candidate = format!("{} {}", current, word);
            if measure(&candidate) <= max_width {
                current = candidate;
            } else {
                wrapped.push(std::mem::take(&mut current));
                current.push_str(word);
            }
        }
        wrapped.push(current);
    }
    wrapped
}

/// Top-left corner of the text block before clamping.
pub fn anchor_position(
    position: Position,
    image: (u32, u32),
    block: (i64, i64),
    offset: (i64, i64),
) -> (i64, i64) {
    let (image_w, image_h) = (image.0 as i64, image.1 as i64);
    let (block_w, block_h) = block;
    let center_x = (image_w - block_w).div_euclid(2);
    let center_y = (image_h - block_h).div_euclid(2);
    let right = image_w - block_w - EDGE_MARGIN;
    let bottom = image_h - block_h - EDGE_MARGIN;
    let (x, y) = match position {
        Position::Center => (center_x, center_y),
        Position::Top => (center_x, EDGE_MARGIN),
        Position::Bottom => (center_x, bottom),
        Position::Left => (EDGE_MARGIN, center_y),
        Position::Right => (right, center_y),
        Position::TopLeft => (EDGE_MARGIN, EDGE_MARGIN),
        Position::TopRight => (right, EDGE_MARGIN),
        Position::BottomLeft => (EDGE_MARGIN, bottom),
        Position::BottomRight => (right, bottom),
    };
    (x.saturating_add(offset.0), y.saturating_add(offset.1))
}

/// Keeps the padded box inside the image. When the block does not fit the
/// result collapses to `padding`.
pub fn clamp_to_image(
    position: (i64, i64),
    block: (i64, i64),
    image: (u32, u32),
    padding: u32,
) -> (i64, i64) {
    let padding = padding as i64;
    let clamp = |value: i64, block: i64, image: i64| {
        value
            .min(image.saturating_sub(block).saturating_sub(padding))
            .max(padding)
    };
    (
        clamp(position.0, block.0, image.0 as i64),
        clamp(position.1, block.1, image.1 as i64),
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl BoxRect {
    pub fn around(position: (i64, i64), layout: &TextLayout, padding: u32) -> Self {
        let padding = padding as i64;
        Self {
            left: position.0 - padding,
            top: position.1 - padding,
            right: position.0 + layout.width + padding,
            bottom: position.1 + layout.height + padding,
        }
    }

    /// Intersection with the image as `(x, y, width, height)`, if non-empty.
    pub fn clipped(&self, image_w: u32, image_h: u32) -> Option<(u32, u32, u32, u32)> {
        let left = self.left.clamp(0, image_w as i64);
        let top = self.top.clamp(0, image_h as i64);
        let right = self.right.clamp(0, image_w as i64);
        let bottom = self.bottom.clamp(0, image_h as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Some((
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_per_char(text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }

    #[test]
    fn overlong_word_stays_whole_on_its_own_line() {
        let lines = wrap_text("Supercalifragilistic", 50.0, ten_per_char);
        assert_eq!(lines, vec!["Supercalifragilistic"]);

        let lines = wrap_text("a Supercalifragilistic b", 50.0, ten_per_char);
        assert_eq!(lines, vec!["a", "Supercalifragilistic", "b"]);
    }

    #[test]
    fn wide_limit_keeps_input_lines() {
        let lines = wrap_text("Hello world\nsecond line", 10_000.0, ten_per_char);
        assert_eq!(lines, vec!["Hello world", "second line"]);
    }

    #[test]
    fn greedy_packing_and_blank_lines() {
        let lines = wrap_text("aa bb cc dd\n\nee", 50.0, ten_per_char);
        assert_eq!(lines, vec!["aa bb", "cc dd", "", "ee"]);
        assert_eq!(wrap_text("", 50.0, ten_per_char), vec![""]);
        assert_eq!(wrap_text("x\r\ny", 50.0, ten_per_char), vec!["x", "y"]);
    }

    #[test]
    fn wrapped_lines_fit_when_words_fit() {
        let text = "the quick brown fox jumps over the lazy dog again and again";
        for line in wrap_text(text, 120.0, ten_per_char) {
            assert!(ten_per_char(&line) <= 120.0, "{line}");
        }
    }

    #[test]
    fn max_width_uses_percent_and_padding() {
        assert_eq!(max_text_width(1000, 80, 20), 760.0);
        assert_eq!(max_text_width(1000, 100, 0), 1000.0);
        assert_eq!(max_text_width(100, 100, 20), 60.0);
        assert_eq!(max_text_width(10, 10, 20), 1.0);
        assert_eq!(max_text_width(1000, 500, 0), 1000.0);
    }

    #[test]
    fn block_height_counts_blank_lines() {
        let layout = TextLayout::measure(
            vec!["abc".to_string(), String::new(), "a".to_string()],
            40,
            ten_per_char,
        );
        assert_eq!(layout.line_height, 50);
        assert_eq!(layout.height, 150);
        assert_eq!(layout.width, 30);
        assert!(layout.lines[1].is_blank());
    }

    #[test]
    fn offsets_are_added_after_anchoring() {
        let pos = anchor_position(Position::TopLeft, (800, 600), (100, 50), (5, -7));
        assert_eq!(pos, (25, 13));
    }

    #[test]
    fn odd_remainders_floor_like_integer_division() {
        assert_eq!(
            anchor_position(Position::Center, (101, 101), (200, 200), (0, 0)),
            (-50, -50)
        );
    }

    #[test]
    fn extreme_offsets_saturate_and_clamp() {
        let far = anchor_position(Position::Center, (100, 100), (10, 10), (i64::MAX, i64::MIN));
        assert_eq!(far, (i64::MAX, i64::MIN + 45));
        assert_eq!(clamp_to_image(far, (10, 10), (100, 100), 20), (70, 20));

        let far = anchor_position(Position::BottomRight, (100, 100), (10, 10), (i64::MIN, i64::MAX));
        assert_eq!(clamp_to_image(far, (10, 10), (100, 100), 20), (20, 70));
    }

    #[test]
    fn clamp_keeps_padded_box_inside() {
        assert_eq!(clamp_to_image((-30, 900), (100, 50), (800, 600), 20), (20, 530));
        assert_eq!(clamp_to_image((300, 200), (100, 50), (800, 600), 20), (300, 200));
        assert_eq!(clamp_to_image((50, 50), (900, 700), (800, 600), 20), (20, 20));
    }

    #[test]
    fn box_rect_clips_to_image() {
        let layout = TextLayout::measure(vec!["abcd".to_string()], 40, ten_per_char);
        let rect = BoxRect::around((10, 10), &layout, 20);
        assert_eq!(rect, BoxRect { left: -10, top: -10, right: 70, bottom: 80 });
        assert_eq!(rect.clipped(50, 50), Some((0, 0, 50, 50)));
        assert_eq!(rect.clipped(500, 500), Some((0, 0, 70, 80)));

        let outside = BoxRect { left: 600, top: 0, right: 700, bottom: 10 };
        assert_eq!(outside.clipped(500, 500), None);
    }
}
