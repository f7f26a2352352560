//! Element tree to terminal lines for a given width.
//!
//! Prose wraps on whitespace; a word wider than the line is split, at URL punctuation when it
//! looks like a URL. Every line starts with the prefix of the containers it sits in (quote bars,
//! list indentation, the item marker on an item's first line). Code and tables never wrap and
//! are marked `scrollable` instead.
use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::text::Text;
use ratatui_markdown_core::render::TAB_WIDTH;
use ratatui_markdown_core::text::CodeHighlighter;
use ratatui_markdown_core::theme::Typography;
use unicode_width::UnicodeWidthChar;

use crate::annotated::AnnotatedText;
use crate::annotated::LinkAnnotation;
use crate::element::Element;
use crate::element::ImageElement;
use crate::element::ListElement;
use crate::element::Marker;
use crate::element::TableElement;
use crate::image::ImageHandle;
use crate::image::ImageTransformer;
use crate::image::NoImages;
use crate::render::MarkdownOptions;

/// Collaborators and knobs layout needs besides the elements themselves.
pub struct LayoutContext<'a> {
    pub highlighter: Option<&'a dyn CodeHighlighter>,
    pub images: &'a dyn ImageTransformer,
    pub code_block_indent: u16,
    pub blockquote_prefix: &'a str,
}

impl Default for LayoutContext<'_> {
    fn default() -> Self {
        Self {
            highlighter: None,
            images: &NoImages,
            code_block_indent: 4,
            blockquote_prefix: "│ ",
        }
    }
}

impl<'a> LayoutContext<'a> {
    pub fn from_options(options: &'a MarkdownOptions) -> Self {
        Self {
            code_block_indent: options.code_block_indent,
            blockquote_prefix: &options.blockquote_prefix,
            ..Self::default()
        }
    }
}

/// Clickable columns of a rendered line.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkRegion {
    pub start_col: u32,
    /// Exclusive.
    pub end_col: u32,
    pub annotation: LinkAnnotation,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedLine {
    pub spans: Vec<Span<'static>>,
    pub plain: String,
    pub links: Vec<LinkRegion>,
    /// Follows horizontal scrolling; other lines stay put.
    pub scrollable: bool,
    /// Set on the first row reserved for an available image.
    pub image: Option<ImageHandle>,
}

impl RenderedLine {
    pub fn width(&self) -> u32 {
        display_width(&self.plain) as u32
    }

    pub fn link_at(&self, col: u32) -> Option<&LinkAnnotation> {
        self.links
            .iter()
            .find(|r| col >= r.start_col && col < r.end_col)
            .map(|r| &r.annotation)
    }
}

pub fn layout_elements(
    elements: &[Element],
    width: u16,
    typography: &Typography,
    ctx: &LayoutContext<'_>,
) -> Vec<RenderedLine> {
    if width == 0 {
        return Vec::new();
    }
    let mut layout = Layout {
        width: usize::from(width),
        t: typography,
        ctx,
        out: Vec::new(),
    };
    let mut prefix = Prefix::default();
    for element in elements {
        layout.element(element, &mut prefix);
    }
    layout.out
}

pub fn lines_to_text(lines: &[RenderedLine]) -> Text<'static> {
    Text::from(
        lines
            .iter()
            .map(|l| Line::from(l.spans.clone()))
            .collect::<Vec<_>>(),
    )
}

#[derive(Clone, Debug)]
struct Piece {
    text: String,
    style: Style,
    link: Option<LinkAnnotation>,
}

impl Piece {
    fn styled(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
            link: None,
        }
    }

    fn with_text(&self, text: String) -> Self {
        Self {
            text,
            style: self.style,
            link: self.link.clone(),
        }
    }
}

/// Line prefix of the current container: `first` goes on the first line emitted, `rest` on
/// the lines after it.
#[derive(Clone, Debug, Default)]
struct Prefix {
    first: Vec<Piece>,
    rest: Vec<Piece>,
    used: bool,
}

impl Prefix {
    fn take(&mut self) -> Vec<Piece> {
        if std::mem::replace(&mut self.used, true) {
            self.rest.clone()
        } else {
            self.first.clone()
        }
    }

    fn peek(&self) -> &[Piece] {
        if self.used { &self.rest } else { &self.first }
    }

    /// A prefix for a child container that appends `first`/`rest` to ours.
    fn nested(&self, first: Vec<Piece>, rest: Vec<Piece>) -> Self {
        let mut f = self.peek().to_vec();
        f.extend(first);
        let mut r = self.rest.clone();
        r.extend(rest);
        Self {
            first: f,
            rest: r,
            used: false,
        }
    }

    /// Folds a child's progress back: once the child emitted, our first line is gone too.
    fn absorb(&mut self, child: &Prefix) {
        self.used |= child.used;
    }
}

struct Layout<'a, 'c> {
    width: usize,
    t: &'a Typography,
    ctx: &'a LayoutContext<'c>,
    out: Vec<RenderedLine>,
}

impl Layout<'_, '_> {
    fn element(&mut self, element: &Element, prefix: &mut Prefix) {
        match element {
            Element::Heading { text, .. } | Element::Paragraph(text) => self.text(text, prefix),
            Element::BlockQuote(children) => {
                let bar = vec![Piece::styled(self.ctx.blockquote_prefix, self.t.quote)];
                let mut inner = prefix.nested(bar.clone(), bar);
                for child in children {
                    self.element(child, &mut inner);
                }
                if children.is_empty() {
                    let pieces = inner.take();
                    self.push(pieces, Vec::new(), false);
                }
                prefix.absorb(&inner);
            }
            Element::CodeBlock {
                language, lines, ..
            } => self.code(language.as_deref(), lines, prefix),
            Element::List(list) => self.list(list, prefix),
            Element::Table(table) => self.table(table, prefix),
            Element::Image(image) => self.image(image, prefix),
            Element::Divider => {
                let pieces = prefix.take();
                let cols = self.width.saturating_sub(pieces_width(&pieces)).max(1);
                let rule = Piece::styled("─".repeat(cols), self.t.muted);
                self.push(pieces, vec![rule], false);
            }
            Element::Spacer(rows) => {
                for _ in 0..*rows {
                    let pieces = prefix.take();
                    self.push(pieces, Vec::new(), false);
                }
            }
            Element::LinkDefinition { label, destination } => {
                let pieces = prefix.take();
                let body = Piece::styled(format!("[{label}]: {destination}"), self.t.muted);
                self.push(pieces, vec![body], false);
            }
            Element::Column(children) => {
                for child in children {
                    self.element(child, prefix);
                }
            }
            Element::Html(html) => {
                for line in html.lines() {
                    let pieces = prefix.take();
                    self.push(pieces, vec![Piece::styled(line, self.t.muted)], false);
                }
            }
        }
    }

    fn text(&mut self, text: &AnnotatedText, prefix: &mut Prefix) {
        for line in logical_lines(text) {
            self.wrap(&line, prefix);
        }
    }

    fn list(&mut self, list: &ListElement, prefix: &mut Prefix) {
        let indent = " ".repeat(usize::from(list.indent));
        for item in &list.items {
            let marker = item.marker.display();
            let style = match item.marker {
                Marker::Checkbox { .. } => self.t.checkbox,
                Marker::Text(_) => self.t.muted,
            };
            let hang = " ".repeat(display_width(marker));
            let mut item_prefix = prefix.nested(
                vec![
                    Piece::styled(indent.clone(), Style::default()),
                    Piece::styled(marker, style),
                ],
                vec![Piece::styled(format!("{indent}{hang}"), Style::default())],
            );
            for element in &item.content {
                if let Element::List(nested) = element {
                    if !item_prefix.used {
                        let pieces = item_prefix.take();
                        self.push(pieces, Vec::new(), false);
                    }
                    let mut base = prefix.nested(Vec::new(), Vec::new());
                    base.used = true;
                    self.list(nested, &mut base);
                } else {
                    self.element(element, &mut item_prefix);
                }
            }
            if !item_prefix.used {
                let pieces = item_prefix.take();
                self.push(pieces, Vec::new(), false);
            }
            prefix.absorb(&item_prefix);
        }
    }

    fn code(&mut self, language: Option<&str>, lines: &[String], prefix: &mut Prefix) {
        let indent = " ".repeat(usize::from(self.ctx.code_block_indent));
        let style = self.t.code_block;
        let highlighted = self.ctx.highlighter.map(|h| {
            let refs: Vec<&str> = lines.iter().map(String::as_str).collect();
            h.highlight_lines(language, &refs)
        });
        for (i, line) in lines.iter().enumerate() {
            let mut pieces = prefix.take();
            pieces.push(Piece::styled(indent.clone(), style));
            let content = match highlighted.as_ref().and_then(|h| h.get(i)) {
                Some(spans) if !spans.is_empty() => spans
                    .iter()
                    .map(|s| Piece::styled(s.content.to_string(), style.patch(s.style)))
                    .collect(),
                _ => vec![Piece::styled(line.clone(), style)],
            };
            self.push(pieces, content, true);
        }
    }

    fn table(&mut self, table: &TableElement, prefix: &mut Prefix) {
        if table.columns == 0 && table.rows.is_empty() {
            return;
        }
        let w = usize::from(table.cell_width.max(1));
        let bold = Modifier::BOLD;

        let header: Vec<Vec<Piece>> = table
            .header
            .iter()
            .map(|cell| {
                let mut pieces = one_line(cell);
                for p in &mut pieces {
                    p.style = p.style.add_modifier(bold);
                }
                pieces
            })
            .collect();
        let pieces = prefix.take();
        let row = self.table_row(&header, w);
        self.push(pieces, row, true);

        let mut rule = String::new();
        for i in 0..table.columns.max(1) {
            if i > 0 {
                rule.push('┼');
            }
            rule.push_str(&"─".repeat(w + 2));
        }
        let pieces = prefix.take();
        self.push(pieces, vec![Piece::styled(rule, self.t.muted)], true);

        for row in &table.rows {
            let cells: Vec<Vec<Piece>> = row.iter().map(one_line).collect();
            let pieces = prefix.take();
            let row = self.table_row(&cells, w);
            self.push(pieces, row, true);
        }
    }

    fn table_row(&self, cells: &[Vec<Piece>], w: usize) -> Vec<Piece> {
        let mut out = Vec::new();
        for (i, cell) in cells.iter().enumerate() {
            if i > 0 {
                out.push(Piece::styled("│", self.t.muted));
            }
            out.push(Piece::styled(" ", Style::default()));
            let cell = truncate_with_ellipsis(cell, w, self.t.table_body);
            let pad = w.saturating_sub(pieces_width(&cell));
            out.extend(cell);
            out.push(Piece::styled(" ".repeat(pad + 1), Style::default()));
        }
        out
    }

    fn image(&mut self, image: &ImageElement, prefix: &mut Prefix) {
        match self.ctx.images.transform(&image.destination) {
            Some(handle) => {
                let (_, rows) = self.ctx.images.intrinsic_size(&handle);
                let mut handle = Some(handle);
                for _ in 0..rows.max(1) {
                    let pieces = prefix.take();
                    self.push(pieces, Vec::new(), false);
                    if let Some(line) = self.out.last_mut() {
                        line.image = handle.take();
                    }
                }
            }
            None => {
                let label = if image.alt.is_empty() {
                    &image.destination
                } else {
                    &image.alt
                };
                let pieces = prefix.take();
                let body = Piece::styled(format!("🖼 {label}"), self.t.muted);
                self.push(pieces, vec![body], false);
            }
        }
    }

    fn wrap(&mut self, pieces: &[Piece], prefix: &mut Prefix) {
        let width = self.width;
        let tokens: Vec<Piece> = pieces.iter().flat_map(split_whitespace).collect();

        let mut line_prefix = prefix.take();
        let mut cur_cols = pieces_width(&line_prefix);
        let mut cur: Vec<Piece> = Vec::new();
        // An empty logical line still occupies a row.
        let mut emitted = false;

        for tok in tokens {
            if cur.is_empty() && is_all_ws(&tok.text) {
                continue;
            }
            let tok_cols = display_width(&tok.text);
            if cur_cols + tok_cols <= width {
                cur_cols += tok_cols;
                cur.push(tok);
                continue;
            }
            if !cur.is_empty() {
                self.push_wrapped(line_prefix, std::mem::take(&mut cur));
                emitted = true;
                line_prefix = prefix.take();
                cur_cols = pieces_width(&line_prefix);
                if is_all_ws(&tok.text) {
                    continue;
                }
            }
            let mut remaining = tok;
            loop {
                let remaining_cols = display_width(&remaining.text);
                if cur_cols + remaining_cols <= width {
                    cur_cols += remaining_cols;
                    cur.push(remaining);
                    break;
                }
                let max = width.saturating_sub(cur_cols).max(1);
                let (head, tail) = split_to_width_prefer_url_breaks(&remaining, max);
                cur.push(head);
                self.push_wrapped(line_prefix, std::mem::take(&mut cur));
                emitted = true;
                line_prefix = prefix.take();
                cur_cols = pieces_width(&line_prefix);
                if tail.text.is_empty() {
                    break;
                }
                remaining = tail;
            }
        }
        if !cur.is_empty() || !emitted {
            self.push_wrapped(line_prefix, cur);
        }
    }

    fn push_wrapped(&mut self, prefix: Vec<Piece>, mut content: Vec<Piece>) {
        while content.last().is_some_and(|p| is_all_ws(&p.text)) {
            content.pop();
        }
        self.push(prefix, content, false);
    }

    fn push(&mut self, prefix: Vec<Piece>, content: Vec<Piece>, scrollable: bool) {
        let mut spans = Vec::with_capacity(prefix.len() + content.len());
        let mut plain = String::new();
        let mut links: Vec<LinkRegion> = Vec::new();
        let mut col = 0u32;
        for piece in prefix.into_iter().chain(content) {
            if piece.text.is_empty() {
                continue;
            }
            let end = col + display_width(&piece.text) as u32;
            if let Some(annotation) = piece.link {
                match links.last_mut() {
                    Some(region) if region.end_col == col && region.annotation == annotation => {
                        region.end_col = end;
                    }
                    _ => links.push(LinkRegion {
                        start_col: col,
                        end_col: end,
                        annotation,
                    }),
                }
            }
            plain.push_str(&piece.text);
            spans.push(Span::styled(piece.text, piece.style));
            col = end;
        }
        self.out.push(RenderedLine {
            spans,
            plain,
            links,
            scrollable,
            image: None,
        });
    }
}

/// Splits annotated text at line breaks into pieces per logical line.
fn logical_lines(text: &AnnotatedText) -> Vec<Vec<Piece>> {
    let mut lines = vec![Vec::new()];
    for run in &text.runs {
        let shown = text.display_text(run);
        for (i, part) in shown.split('\n').enumerate() {
            if i > 0 {
                lines.push(Vec::new());
            }
            if !part.is_empty()
                && let Some(line) = lines.last_mut()
            {
                line.push(Piece {
                    text: part.to_string(),
                    style: run.style,
                    link: run.link.clone(),
                });
            }
        }
    }
    lines
}

/// The whole text on one line; breaks become spaces.
fn one_line(text: &AnnotatedText) -> Vec<Piece> {
    text.runs
        .iter()
        .map(|run| Piece {
            text: text.display_text(run).replace('\n', " "),
            style: run.style,
            link: run.link.clone(),
        })
        .collect()
}

fn truncate_with_ellipsis(pieces: &[Piece], max_cols: usize, ellipsis_style: Style) -> Vec<Piece> {
    if pieces_width(pieces) <= max_cols {
        return pieces.to_vec();
    }
    if max_cols <= 1 {
        return vec![Piece::styled("…", ellipsis_style)];
    }
    let target = max_cols - 1;
    let mut out = Vec::new();
    let mut cols = 0usize;
    'outer: for piece in pieces {
        let mut buf = String::new();
        for ch in piece.text.chars() {
            let w = char_width(ch);
            if cols + w > target {
                if !buf.is_empty() {
                    out.push(piece.with_text(buf));
                }
                break 'outer;
            }
            cols += w;
            buf.push(ch);
        }
        if !buf.is_empty() {
            out.push(piece.with_text(buf));
        }
    }
    out.push(Piece::styled("…", ellipsis_style));
    out
}

fn split_whitespace(piece: &Piece) -> Vec<Piece> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut last_ws: Option<bool> = None;
    for ch in piece.text.chars() {
        let ws = ch.is_whitespace();
        if last_ws.is_some_and(|prev| prev != ws) {
            out.push(piece.with_text(std::mem::take(&mut buf)));
        }
        buf.push(ch);
        last_ws = Some(ws);
    }
    if !buf.is_empty() {
        out.push(piece.with_text(buf));
    }
    out
}

fn split_to_width_prefer_url_breaks(piece: &Piece, max_cols: usize) -> (Piece, Piece) {
    if looks_like_url(&piece.text)
        && let Some(idx) = last_url_breakpoint_before(&piece.text, max_cols)
    {
        let (a, b) = piece.text.split_at(idx);
        return (piece.with_text(a.to_string()), piece.with_text(b.to_string()));
    }
    split_to_width(piece, max_cols)
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://") || s.starts_with("www.")
}

fn last_url_breakpoint_before(s: &str, max_cols: usize) -> Option<usize> {
    let mut cols = 0usize;
    let mut best = None;
    for (idx, ch) in s.char_indices() {
        let w = char_width(ch);
        if cols + w > max_cols {
            break;
        }
        cols += w;
        if matches!(ch, '/' | '.' | '-' | '_' | '~' | '?' | '&' | '#' | '=') {
            best = Some(idx + ch.len_utf8());
        }
    }
    best.filter(|&idx| idx < s.len())
}

/// Splits after at most `max_cols` columns, always keeping at least one character on the left.
fn split_to_width(piece: &Piece, max_cols: usize) -> (Piece, Piece) {
    let mut cols = 0usize;
    let mut idx = 0usize;
    for (byte_idx, ch) in piece.text.char_indices() {
        let w = char_width(ch);
        if cols + w > max_cols && idx > 0 {
            break;
        }
        cols += w;
        idx = byte_idx + ch.len_utf8();
        if cols >= max_cols {
            break;
        }
    }
    let (a, b) = piece.text.split_at(idx);
    (piece.with_text(a.to_string()), piece.with_text(b.to_string()))
}

fn is_all_ws(s: &str) -> bool {
    s.chars().all(char::is_whitespace)
}

fn char_width(ch: char) -> usize {
    if ch == '\t' {
        TAB_WIDTH
    } else {
        UnicodeWidthChar::width(ch).unwrap_or(0)
    }
}

fn display_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

fn pieces_width(pieces: &[Piece]) -> usize {
    pieces.iter().map(|p| display_width(&p.text)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render_markdown;
    use pretty_assertions::assert_eq;

    fn layout(source: &str, width: u16, options: &MarkdownOptions) -> Vec<RenderedLine> {
        let doc = render_markdown(source, options).unwrap();
        doc.layout(width, &options.typography, &LayoutContext::from_options(options))
    }

    fn plain(source: &str, width: u16) -> Vec<String> {
        layout(source, width, &MarkdownOptions::default())
            .into_iter()
            .map(|l| l.plain)
            .collect()
    }

    #[test]
    fn prose_wraps_on_whitespace() {
        assert_eq!(plain("alpha beta gamma delta", 11), vec!["alpha beta", "gamma delta"]);
    }

    #[test]
    fn long_words_are_split() {
        assert_eq!(plain("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn urls_break_at_punctuation() {
        let lines = plain("https://example.com/a/b/c", 12);
        assert_eq!(lines[0], "https://");
        assert_eq!(lines.concat(), "https://example.com/a/b/c");
    }

    #[test]
    fn zero_width_lays_out_nothing() {
        assert!(plain("text", 0).is_empty());
    }

    #[test]
    fn quotes_prefix_every_line() {
        assert_eq!(plain("> quoted text", 40), vec!["│ quoted text"]);
        assert_eq!(plain("> > deep", 40), vec!["│ │ deep"]);
        assert_eq!(plain("> one two", 7), vec!["│ one", "│ two"]);
    }

    #[test]
    fn list_items_hang_under_the_marker() {
        assert_eq!(plain("- one two three", 8), vec!["• one", "  two", "  three"]);
    }

    #[test]
    fn checkboxes_replace_bullets() {
        assert_eq!(plain("- [x] done\n- [ ] todo\n", 40), vec!["[✓] done", "[ ] todo"]);
    }

    #[test]
    fn nested_lists_indent_by_depth() {
        assert_eq!(plain("- a\n  - b\n", 40), vec!["• a", "  • b"]);
    }

    #[test]
    fn code_blocks_do_not_wrap() {
        let lines = layout("```\nlet x = 1;\n```\n", 6, &MarkdownOptions::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].plain, "    let x = 1;");
        assert!(lines[0].scrollable);
    }

    #[test]
    fn table_cells_truncate_with_ellipsis() {
        let options = MarkdownOptions {
            table_cell_width: 4,
            ..MarkdownOptions::default()
        };
        let lines = layout("| abcdef |\n|---|\n| x |\n", 40, &options);
        let plain: Vec<&str> = lines.iter().map(|l| l.plain.as_str()).collect();
        assert_eq!(plain, vec![" abc… ", "──────", " x    "]);
        assert!(lines.iter().all(|l| l.scrollable));
    }

    #[test]
    fn links_become_click_regions() {
        let lines = layout("go [here](https://h.io)", 40, &MarkdownOptions::default());
        let region = &lines[0].links[0];
        assert_eq!((region.start_col, region.end_col), (3, 7));
        assert_eq!(region.annotation.destination, "https://h.io");
        assert!(lines[0].link_at(2).is_none());
        assert!(lines[0].link_at(6).is_some());
    }

    #[test]
    fn images_without_a_handle_show_alt_text() {
        assert_eq!(plain("![logo](logo.png)", 40), vec!["🖼 logo"]);
    }

    struct TwoRows;

    impl ImageTransformer for TwoRows {
        fn transform(&self, url: &str) -> Option<ImageHandle> {
            Some(ImageHandle {
                id: 7,
                url: url.to_string(),
            })
        }

        fn intrinsic_size(&self, _handle: &ImageHandle) -> (u16, u16) {
            (10, 2)
        }
    }

    #[test]
    fn available_images_reserve_rows() {
        let options = MarkdownOptions::default();
        let doc = render_markdown("![logo](logo.png)", &options).unwrap();
        let ctx = LayoutContext {
            images: &TwoRows,
            ..LayoutContext::from_options(&options)
        };
        let lines = doc.layout(40, &options.typography, &ctx);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].image.as_ref().map(|h| h.id), Some(7));
        assert_eq!(lines[1].image, None);
    }

    #[test]
    fn dividers_span_the_width() {
        assert_eq!(plain("---", 5), vec!["─────"]);
    }
}
