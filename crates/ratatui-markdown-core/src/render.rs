//! Painting helpers shared by widgets.
//!
//! Columns are terminal cells (`unicode-width`), tabs expand to [`TAB_WIDTH`] spaces, and wide
//! characters that straddle a clip edge are dropped rather than split.
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Span;
use unicode_width::UnicodeWidthChar;

use crate::viewport::ViewportState;

pub const TAB_WIDTH: usize = 4;

/// Paints `spans` on row `y`, skipping the first `skip_cols` columns and at most `max_cols` wide.
///
/// Spans with a default style are painted with `fallback`.
pub fn paint_spans(
    buf: &mut Buffer,
    x: u16,
    y: u16,
    skip_cols: u32,
    max_cols: u16,
    spans: &[Span<'_>],
    fallback: Style,
) {
    let skip = skip_cols as usize;
    let max = max_cols as usize;
    let mut col = 0usize;
    let mut out = 0usize;
    let mut tmp = [0u8; 4];

    for span in spans {
        let style = if span.style == Style::default() {
            fallback
        } else {
            span.style
        };
        for ch in span.content.chars() {
            let (symbol, w): (&str, usize) = if ch == '\t' {
                (" ", 1)
            } else {
                let w = UnicodeWidthChar::width(ch).unwrap_or(0);
                if w == 0 {
                    continue;
                }
                (ch.encode_utf8(&mut tmp), w)
            };
            let repeat = if ch == '\t' { TAB_WIDTH } else { 1 };
            for _ in 0..repeat {
                if col < skip {
                    col += w;
                    continue;
                }
                if out + w > max {
                    return;
                }
                let cx = x + out as u16;
                if let Some(cell) = buf.cell_mut((cx, y)) {
                    cell.set_style(style);
                    cell.set_symbol(symbol);
                }
                if w == 2
                    && let Some(cell) = buf.cell_mut((cx + 1, y))
                {
                    cell.set_style(style);
                    cell.set_symbol("");
                }
                out += w;
                col += w;
            }
        }
    }
}

pub fn render_scrollbar(area: Rect, buf: &mut Buffer, state: &ViewportState, style: Style) {
    buf.set_style(area, style);
    if area.height == 0 {
        return;
    }
    let track = u32::from(area.height);
    let (thumb_top, thumb_h) = if state.content_h <= u32::from(state.viewport_h) {
        (0, 0)
    } else {
        let thumb_h = (u32::from(state.viewport_h) * track / state.content_h).clamp(1, track);
        let travel = track - thumb_h;
        let top = state.y * travel / state.max_y().max(1);
        (top, thumb_h)
    };
    for dy in 0..area.height {
        let row = u32::from(dy);
        let symbol = if row >= thumb_top && row < thumb_top + thumb_h {
            "█"
        } else {
            " "
        };
        buf.set_stringn(area.x, area.y + dy, symbol, 1, style);
    }
}

/// Maps the column range `[start_col, end_col)` onto a byte range of the concatenated spans.
///
/// A wide character only partially covered by the range is excluded.
pub fn cols_to_byte_range(
    spans: &[Span<'_>],
    start_col: u32,
    end_col: u32,
) -> Option<(usize, usize)> {
    let (start_col, end_col) = (start_col as usize, end_col as usize);
    if start_col >= end_col {
        return None;
    }
    let mut col = 0usize;
    let mut base = 0usize;
    let mut start_b = None;
    let mut end_b = None;

    'outer: for span in spans {
        let s = span.content.as_ref();
        for (i, ch) in s.char_indices() {
            let w = if ch == '\t' {
                TAB_WIDTH
            } else {
                UnicodeWidthChar::width(ch).unwrap_or(0)
            };
            let b = base + i;
            if start_b.is_none() && col >= start_col {
                start_b = Some(b);
            }
            if col + w > end_col {
                end_b = Some(b);
                break 'outer;
            }
            col += w;
        }
        base += s.len();
    }

    let start_b = start_b?;
    let end_b = end_b.unwrap_or(base);
    (start_b < end_b).then_some((start_b, end_b))
}

pub fn slice_spans_by_bytes(spans: &[Span<'_>], start_b: usize, end_b: usize) -> String {
    let mut out = String::new();
    let mut base = 0usize;
    for span in spans {
        let s = span.content.as_ref();
        let lo = start_b.saturating_sub(base).min(s.len());
        let hi = end_b.saturating_sub(base).min(s.len());
        if lo < hi {
            out.push_str(&s[lo..hi]);
        }
        base += s.len();
        if base >= end_b {
            break;
        }
    }
    out
}

/// Splits spans at the byte range and adds `modifier` to the covered part.
pub fn highlight_byte_range(
    spans: &[Span<'static>],
    start_b: usize,
    end_b: usize,
    modifier: Modifier,
) -> Vec<Span<'static>> {
    let mut out = Vec::with_capacity(spans.len() + 2);
    let mut base = 0usize;
    for span in spans {
        let s = span.content.as_ref();
        let lo = start_b.saturating_sub(base).min(s.len());
        let hi = end_b.saturating_sub(base).min(s.len());
        if lo >= hi {
            out.push(span.clone());
        } else {
            if lo > 0 {
                out.push(Span::styled(s[..lo].to_string(), span.style));
            }
            out.push(Span::styled(
                s[lo..hi].to_string(),
                span.style.add_modifier(modifier),
            ));
            if hi < s.len() {
                out.push(Span::styled(s[hi..].to_string(), span.style));
            }
        }
        base += s.len();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row(buf: &Buffer, w: u16) -> String {
        (0..w)
            .map(|x| buf.cell((x, 0)).map(|c| c.symbol().to_string()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn paint_expands_tabs_and_clips() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 6, 1));
        paint_spans(&mut buf, 0, 0, 0, 6, &[Span::raw("\t1")], Style::default());
        assert_eq!(row(&buf, 6), "    1 ");
    }

    #[test]
    fn paint_skips_leading_columns() {
        let mut buf = Buffer::empty(Rect::new(0, 0, 3, 1));
        paint_spans(&mut buf, 0, 0, 2, 3, &[Span::raw("abcdef")], Style::default());
        assert_eq!(row(&buf, 3), "cde");
    }

    #[test]
    fn cols_to_bytes_drops_partial_wide_chars() {
        let spans = [Span::raw("你好")];
        let s = "你好";
        assert_eq!(cols_to_byte_range(&spans, 0, 2).map(|(a, b)| &s[a..b]), Some("你"));
        assert_eq!(cols_to_byte_range(&spans, 2, 4).map(|(a, b)| &s[a..b]), Some("好"));
        assert_eq!(cols_to_byte_range(&spans, 0, 3).map(|(a, b)| &s[a..b]), Some("你"));
    }

    #[test]
    fn byte_ranges_cross_span_boundaries() {
        let spans = vec![Span::raw("ab"), Span::raw("cd")];
        let (a, b) = cols_to_byte_range(&spans, 1, 3).unwrap();
        assert_eq!(slice_spans_by_bytes(&spans, a, b), "bc");
        let hl = highlight_byte_range(&spans, a, b, Modifier::REVERSED);
        let reversed: String = hl
            .iter()
            .filter(|s| s.style.add_modifier.contains(Modifier::REVERSED))
            .map(|s| s.content.as_ref())
            .collect();
        assert_eq!(reversed, "bc");
    }

    #[test]
    fn scrollbar_draws_thumb() {
        let mut state = ViewportState::default();
        state.set_viewport(10, 5);
        state.set_content(10, 50);
        let mut buf = Buffer::empty(Rect::new(0, 0, 1, 5));
        render_scrollbar(Rect::new(0, 0, 1, 5), &mut buf, &state, Style::default());
        assert_eq!(buf.cell((0, 0)).map(|c| c.symbol().to_string()), Some("█".to_string()));
    }
}
