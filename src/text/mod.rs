//! # Text Layout
//!
//! Greedy word wrap into a fixed box, with ellipsis truncation once the box
//! runs out of lines.
//!
//! ## Algorithm
//!
//! ```text
//! words = split_whitespace(text)
//! line_height = font_size * 1.2
//! max_lines   = max(1, floor(box_height / line_height))
//!
//! for word in words:
//!     candidate = current + " " + word
//!     if width(candidate) > box_width and current is not empty:
//!         if current is line number max_lines:
//!             end current with "..." and stop
//!         commit current, start a new line with word
//!     else:
//!         current = candidate
//! ```
//!
//! ## Placement
//!
//! A single line sits on the box's vertical center. Several lines start at
//! `line_height / 2` and stack downward every `line_height`; overflow is not
//! clipped here. Horizontally, `left`/`right` lines are anchored 10px inside
//! the box edge and `center` lines on the box center.

pub mod font;

pub use font::{FontBook, FontSpec};

use crate::template::TextAlign;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;

/// Inset of left/right aligned lines from the box edge.
pub const HORIZONTAL_INSET: f64 = 10.0;

pub const ELLIPSIS: &str = "...";

/// Width measurement for a single line of text.
pub trait TextMeasure {
    /// Advance width of `text` in pixels at the given font.
    fn measure(&self, text: &str, font: &FontSpec) -> f64;
}

/// Number of lines that fit in `box_height` (never less than one).
pub fn max_lines(box_height: f64, font_size: f64) -> usize {
    let line_height = font_size * LINE_HEIGHT_FACTOR;
    if line_height <= 0.0 || !line_height.is_finite() {
        return 1;
    }
    ((box_height / line_height).floor().max(1.0)) as usize
}

/// Wrap `text` into lines that fit a `box_width` × `box_height` box.
///
/// Deterministic: the same inputs always produce the same lines.
pub fn layout_lines<M: TextMeasure + ?Sized>(
    text: &str,
    box_width: f64,
    box_height: f64,
    font: &FontSpec,
    measure: &M,
) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let limit = max_lines(box_height, font.size);

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in &words {
        let candidate = if current.is_empty() {
            (*word).to_string()
        } else {
            format!("{} {}", current, word)
        };

        if measure.measure(&candidate, font) > box_width && !current.is_empty() {
            if lines.len() + 1 >= limit {
                // Final line and words remain: close it with an ellipsis.
                lines.push(format!("{}{}", current, ELLIPSIS));
                return lines;
            }
            lines.push(std::mem::replace(&mut current, (*word).to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    if lines.len() > limit {
        lines.truncate(limit);
        if let Some(last) = lines.last_mut() {
            *last = replace_last_token(last);
        }
    }
    lines
}

/// Replace the trailing whitespace+token of a line with an ellipsis.
fn replace_last_token(line: &str) -> String {
    match line.rfind(char::is_whitespace) {
        Some(idx) => format!("{}{}", line[..idx].trim_end(), ELLIPSIS),
        None => format!("{}{}", line, ELLIPSIS),
    }
}

/// Vertical center of each line relative to the box top.
pub fn line_offsets(line_count: usize, box_height: f64, font_size: f64) -> Vec<f64> {
    let line_height = font_size * LINE_HEIGHT_FACTOR;
    match line_count {
        0 => Vec::new(),
        1 => vec![box_height / 2.0],
        n => (0..n)
            .map(|i| line_height / 2.0 + i as f64 * line_height)
            .collect(),
    }
}

/// Horizontal anchor of lines relative to the box left edge.
pub fn line_anchor_x(align: TextAlign, box_width: f64) -> f64 {
    match align {
        TextAlign::Left => HORIZONTAL_INSET,
        TextAlign::Center => box_width / 2.0,
        TextAlign::Right => box_width - HORIZONTAL_INSET,
    }
}

/// Left edge of a line of `line_width` drawn at `anchor_x`.
pub fn line_start_x(align: TextAlign, anchor_x: f64, line_width: f64) -> f64 {
    match align {
        TextAlign::Left => anchor_x,
        TextAlign::Center => anchor_x - line_width / 2.0,
        TextAlign::Right => anchor_x - line_width,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// Every character is 10px wide.
    struct Fixed;

    impl TextMeasure for Fixed {
        fn measure(&self, text: &str, _font: &FontSpec) -> f64 {
            text.chars().count() as f64 * 10.0
        }
    }

    fn font(size: f64) -> FontSpec {
        FontSpec::new(size)
    }

    #[test]
    fn test_max_lines() {
        assert_eq!(max_lines(50.0, 20.0), 2);
        assert_eq!(max_lines(24.0, 20.0), 1);
        assert_eq!(max_lines(10.0, 20.0), 1);
        assert_eq!(max_lines(120.0, 10.0), 10);
        assert_eq!(max_lines(100.0, 0.0), 1);
    }

    #[test]
    fn test_single_line_fits() {
        let lines = layout_lines("2020 Toyota Corolla", 200.0, 50.0, &font(20.0), &Fixed);
        assert_eq!(lines, vec!["2020 Toyota Corolla"]);
    }

    #[test]
    fn test_empty_text() {
        assert!(layout_lines("", 200.0, 50.0, &font(20.0), &Fixed).is_empty());
        assert!(layout_lines("   \n\t", 200.0, 50.0, &font(20.0), &Fixed).is_empty());
    }

    #[test]
    fn test_wraps_on_width() {
        // 100px box fits 10 chars per line
        let lines = layout_lines("alpha beta gamma delta", 100.0, 200.0, &font(10.0), &Fixed);
        assert_eq!(lines, vec!["alpha beta", "gamma", "delta"]);
    }

    #[test]
    fn test_long_word_gets_own_line() {
        let lines = layout_lines("a extraordinarily b", 100.0, 200.0, &font(10.0), &Fixed);
        assert_eq!(lines, vec!["a", "extraordinarily", "b"]);
    }

    #[test]
    fn test_truncates_to_max_lines_with_ellipsis() {
        // 3 lines fit (36px / 12px); naive wrap would need 5
        let text = "one two three four five six seven eight nine ten";
        let lines = layout_lines(text, 100.0, 36.0, &font(10.0), &Fixed);
        assert_eq!(lines, vec!["one two", "three four", "five six..."]);
    }

    #[test]
    fn test_final_line_keeps_its_words() {
        // The ellipsis is appended to the committed words, even past the box edge
        let lines = layout_lines("aaaa bbbbb cc", 100.0, 15.0, &font(10.0), &Fixed);
        assert_eq!(lines, vec!["aaaa bbbbb..."]);
    }

    #[test]
    fn test_single_line_box_truncates() {
        let lines = layout_lines("aaaa bbbb cccc dddd", 100.0, 15.0, &font(10.0), &Fixed);
        assert_eq!(lines, vec!["aaaa bbbb..."]);
    }

    #[test]
    fn test_exact_fit_has_no_ellipsis() {
        let lines = layout_lines("aaaa bbbb cccc", 100.0, 24.0, &font(10.0), &Fixed);
        assert_eq!(lines, vec!["aaaa bbbb", "cccc"]);
    }

    #[test]
    fn test_deterministic() {
        let text = "The quick brown fox jumps over the lazy dog again and again";
        let first = layout_lines(text, 120.0, 40.0, &font(12.0), &Fixed);
        for _ in 0..5 {
            assert_eq!(layout_lines(text, 120.0, 40.0, &font(12.0), &Fixed), first);
        }
    }

    #[test]
    fn test_replace_last_token() {
        assert_eq!(replace_last_token("one two three"), "one two...");
        assert_eq!(replace_last_token("single"), "single...");
    }

    #[test]
    fn test_line_offsets() {
        assert_eq!(line_offsets(1, 50.0, 20.0), vec![25.0]);
        let offsets = line_offsets(3, 100.0, 10.0);
        assert_eq!(offsets.len(), 3);
        assert!((offsets[0] - 6.0).abs() < 1e-9);
        assert!((offsets[1] - 18.0).abs() < 1e-9);
        assert!((offsets[2] - 30.0).abs() < 1e-9);
        assert!(line_offsets(0, 50.0, 20.0).is_empty());
    }

    #[test]
    fn test_horizontal_anchors() {
        assert_eq!(line_anchor_x(TextAlign::Left, 200.0), 10.0);
        assert_eq!(line_anchor_x(TextAlign::Center, 200.0), 100.0);
        assert_eq!(line_anchor_x(TextAlign::Right, 200.0), 190.0);
        assert_eq!(line_start_x(TextAlign::Left, 10.0, 50.0), 10.0);
        assert_eq!(line_start_x(TextAlign::Center, 100.0, 50.0), 75.0);
        assert_eq!(line_start_x(TextAlign::Right, 190.0, 50.0), 140.0);
    }
}
