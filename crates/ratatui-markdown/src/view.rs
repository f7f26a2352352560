//! An interactive markdown viewer: scrolling, selection/copy, link activation, async parsing.
use std::sync::Arc;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Modifier;
use ratatui::text::Line;
use ratatui::text::Span;
use ratatui::text::Text;
use ratatui_markdown_core::input::InputEvent;
use ratatui_markdown_core::input::MouseButton;
use ratatui_markdown_core::input::MouseEvent;
use ratatui_markdown_core::input::MouseEventKind;
use ratatui_markdown_core::input::ScrollBindings;
use ratatui_markdown_core::input::SelectionBindings;
use ratatui_markdown_core::render;
use ratatui_markdown_core::text::CodeHighlighter;
use ratatui_markdown_core::viewport::ViewportState;
use tracing::debug;
use tracing::warn;

use crate::error::ParseError;
use crate::image::ImageTransformer;
use crate::image::NoImages;
use crate::layout::LayoutContext;
use crate::layout::RenderedLine;
use crate::layout::lines_to_text;
use crate::render::MarkdownDocument;
use crate::render::MarkdownOptions;
use crate::render::RenderedDocument;
use crate::worker::ParseWorker;

#[derive(Clone, Debug)]
pub struct MarkdownViewOptions {
    pub render: MarkdownOptions,
    pub show_scrollbar: bool,
    pub padding_left: u16,
    pub padding_right: u16,
    /// Rows per mouse wheel step.
    pub wheel_lines: i32,
    pub scroll: ScrollBindings,
    pub enable_selection: bool,
    pub selection: SelectionBindings,
}

impl Default for MarkdownViewOptions {
    fn default() -> Self {
        Self {
            render: MarkdownOptions::default(),
            show_scrollbar: true,
            padding_left: 0,
            padding_right: 0,
            wheel_lines: 3,
            scroll: ScrollBindings::default(),
            enable_selection: true,
            selection: SelectionBindings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MarkdownState {
    /// A background parse is in flight.
    Loading,
    Success,
    /// Terminal until new markdown is set.
    Error(ParseError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewAction {
    None,
    Redraw,
    /// The caller owns the clipboard; this is the selected text.
    CopyRequested(String),
    /// A link was clicked; its listener has already run.
    LinkActivated(String),
}

type Pos = (usize, u32);

pub struct MarkdownView {
    source: String,
    state: MarkdownState,
    document: Option<RenderedDocument>,
    lines: Vec<RenderedLine>,
    cached_width: Option<u16>,
    pub viewport: ViewportState,
    options: MarkdownViewOptions,
    highlighter: Option<Arc<dyn CodeHighlighter + Send + Sync>>,
    images: Arc<dyn ImageTransformer + Send + Sync>,
    worker: Option<ParseWorker>,
    pending: Option<u64>,
    selection_anchor: Option<Pos>,
    selection: Option<(Pos, Pos)>,
}

impl Default for MarkdownView {
    fn default() -> Self {
        Self::with_options(MarkdownViewOptions::default())
    }
}

impl MarkdownView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MarkdownViewOptions) -> Self {
        Self {
            source: String::new(),
            state: MarkdownState::Success,
            document: None,
            lines: Vec::new(),
            cached_width: None,
            viewport: ViewportState::default(),
            options,
            highlighter: None,
            images: Arc::new(NoImages),
            worker: None,
            pending: None,
            selection_anchor: None,
            selection: None,
        }
    }

    pub fn options(&self) -> &MarkdownViewOptions {
        &self.options
    }

    pub fn state(&self) -> &MarkdownState {
        &self.state
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn document(&self) -> Option<&RenderedDocument> {
        self.document.as_ref()
    }

    /// Parses and renders `input` on the caller's thread.
    pub fn set_markdown(&mut self, input: &str) {
        self.source = input.to_string();
        self.pending = None;
        match MarkdownDocument::parse(input, &self.options.render) {
            Ok(doc) => self.apply(&doc),
            Err(err) => self.fail(err),
        }
    }

    /// Queues `input` for the background worker; call [`Self::poll_parse`] to pick it up.
    ///
    /// Content from the previous source stays on screen until the new parse lands.
    pub fn set_markdown_async(&mut self, input: &str) -> Result<u64, ParseError> {
        if self.worker.is_none() {
            self.worker = Some(ParseWorker::spawn(self.options.render.parser.clone())?);
        }
        let Some(worker) = self.worker.as_mut() else {
            return Err(ParseError::Worker("worker unavailable".to_string()));
        };
        let generation = worker.submit(input, &self.options.render.flavour)?;
        self.source = input.to_string();
        self.pending = Some(generation);
        self.state = MarkdownState::Loading;
        self.invalidate();
        Ok(generation)
    }

    /// Applies a finished background parse; returns whether anything changed.
    pub fn poll_parse(&mut self) -> bool {
        let (Some(worker), Some(pending)) = (self.worker.as_mut(), self.pending) else {
            return false;
        };
        let Some(outcome) = worker.poll() else {
            return false;
        };
        if outcome.generation != pending {
            debug!(generation = outcome.generation, pending, "ignoring parse outcome");
            return false;
        }
        self.pending = None;
        match outcome.result {
            Ok(ast) => self.apply(&MarkdownDocument::from_parts(outcome.source, ast)),
            Err(err) => self.fail(err),
        }
        true
    }

    fn apply(&mut self, doc: &MarkdownDocument) {
        self.document = Some(doc.render(&self.options.render));
        self.state = MarkdownState::Success;
        self.invalidate();
    }

    fn fail(&mut self, err: ParseError) {
        warn!(%err, "markdown view showing parse error");
        self.document = None;
        self.state = MarkdownState::Error(err);
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.cached_width = None;
        self.lines.clear();
        self.clear_selection();
    }

    pub fn set_highlighter(&mut self, highlighter: Option<Arc<dyn CodeHighlighter + Send + Sync>>) {
        self.highlighter = highlighter;
        self.cached_width = None;
    }

    pub fn set_image_transformer(&mut self, images: Arc<dyn ImageTransformer + Send + Sync>) {
        self.images = images;
        self.cached_width = None;
    }

    /// Updates viewport size for `area`, minus scrollbar and padding.
    pub fn set_viewport(&mut self, area: Rect) {
        let (_, inner, _) = self.areas(area);
        self.viewport.set_viewport(inner.width, inner.height);
    }

    pub fn scroll_y_by(&mut self, delta: i32) {
        self.viewport.scroll_y_by(delta);
    }

    pub fn scroll_x_by(&mut self, delta: i32) {
        self.viewport.scroll_x_by(delta);
    }

    /// Keys and mouse wheel; clicks and drags need an area, see
    /// [`Self::handle_event_action_in_area`].
    pub fn handle_event_action(&mut self, event: InputEvent) -> ViewAction {
        match event {
            InputEvent::Mouse(m) => match m.kind {
                MouseEventKind::ScrollUp => {
                    self.viewport.scroll_y_by(-self.options.wheel_lines);
                    ViewAction::Redraw
                }
                MouseEventKind::ScrollDown => {
                    self.viewport.scroll_y_by(self.options.wheel_lines);
                    ViewAction::Redraw
                }
                _ => ViewAction::None,
            },
            InputEvent::Key(key) => {
                if self.options.enable_selection && self.options.selection.is_clear(&key) {
                    self.clear_selection();
                    return ViewAction::Redraw;
                }
                if self.options.enable_selection && self.options.selection.is_copy(&key) {
                    return self
                        .selected_text()
                        .map(ViewAction::CopyRequested)
                        .unwrap_or(ViewAction::None);
                }
                let Some(action) = self.options.scroll.action_for(&key) else {
                    return ViewAction::None;
                };
                self.options.scroll.apply(&mut self.viewport, action);
                ViewAction::Redraw
            }
        }
    }

    pub fn handle_event_action_in_area(&mut self, area: Rect, event: InputEvent) -> ViewAction {
        match event {
            InputEvent::Key(_) => self.handle_event_action(event),
            InputEvent::Mouse(m) => self.handle_mouse_event(area, m),
        }
    }

    /// Wheel scrolling, link clicks and drag selection.
    pub fn handle_mouse_event(&mut self, area: Rect, event: MouseEvent) -> ViewAction {
        if area.width == 0 || area.height == 0 {
            return ViewAction::None;
        }
        self.set_viewport(area);
        if matches!(
            event.kind,
            MouseEventKind::ScrollUp | MouseEventKind::ScrollDown
        ) {
            return self.handle_event_action(InputEvent::Mouse(event));
        }

        let (_, inner, _) = self.areas(area);
        if inner.width == 0 || inner.height == 0 {
            return ViewAction::None;
        }
        self.ensure_layout(inner.width);

        let right = inner.x + inner.width - 1;
        let bottom = inner.y + inner.height - 1;
        let inside = (inner.x..=right).contains(&event.x) && (inner.y..=bottom).contains(&event.y);
        let (x, y) = match event.kind {
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Up(MouseButton::Left) => {
                if self.selection_anchor.is_none() {
                    return ViewAction::None;
                }
                (event.x.clamp(inner.x, right), event.y.clamp(inner.y, bottom))
            }
            _ if inside => (event.x, event.y),
            _ => return ViewAction::None,
        };

        let line = self
            .viewport
            .y
            .saturating_add(u32::from(y - inner.y))
            .min(self.lines.len().saturating_sub(1) as u32) as usize;
        let col = self.content_col(line, u32::from(x - inner.x));

        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(annotation) = self.lines.get(line).and_then(|l| l.link_at(col)) {
                    annotation.activate();
                    return ViewAction::LinkActivated(annotation.destination.clone());
                }
                if !self.options.enable_selection {
                    return ViewAction::None;
                }
                self.selection_anchor = Some((line, col));
                self.selection = Some(((line, col), (line, col)));
                ViewAction::Redraw
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let Some(anchor) = self.selection_anchor else {
                    return ViewAction::None;
                };
                self.selection = Some((anchor, (line, col)));
                ViewAction::Redraw
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let Some(anchor) = self.selection_anchor.take() else {
                    return ViewAction::None;
                };
                self.selection = Some((anchor, (line, col)));
                ViewAction::Redraw
            }
            _ => ViewAction::None,
        }
    }

    /// Screen column to content column: only scrollable lines are offset by the x scroll.
    fn content_col(&self, line: usize, screen_col: u32) -> u32 {
        match self.lines.get(line) {
            Some(l) if l.scrollable => self.viewport.x.saturating_add(screen_col),
            _ => screen_col,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selection_anchor = None;
        self.selection = None;
    }

    pub fn selected_text(&mut self) -> Option<String> {
        let (a, b) = self.selection?;
        let ((start_line, start_col), (end_line, end_col)) = normalize_sel_inclusive(a, b);
        self.ensure_layout(self.cached_width.unwrap_or(80));

        let mut out = String::new();
        for idx in start_line..=end_line {
            let line = self.lines.get(idx)?;
            if idx > start_line {
                out.push('\n');
            }
            let (from, to) = sel_cols(idx, start_line, start_col, end_line, end_col);
            if let Some((bs, be)) = render::cols_to_byte_range(&line.spans, from, to) {
                out.push_str(&render::slice_spans_by_bytes(&line.spans, bs, be));
            }
        }
        Some(out)
    }

    pub fn render_ref(&mut self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let (content, inner, scrollbar_x) = self.areas(area);
        self.viewport.set_viewport(inner.width, inner.height);
        self.ensure_layout(inner.width);

        let body = self.options.render.typography.body;
        let selection = self
            .selection
            .filter(|_| self.options.enable_selection)
            .map(|(a, b)| normalize_sel_inclusive(a, b));

        for row in 0..content.height {
            let y = content.y + row;
            buf.set_style(Rect::new(content.x, y, content.width, 1), body);
            let idx = (self.viewport.y as usize).saturating_add(usize::from(row));
            let Some(line) = self.lines.get(idx) else {
                continue;
            };
            let skip = if line.scrollable { self.viewport.x } else { 0 };

            let highlighted = selection.and_then(|((sl, sc), (el, ec))| {
                if idx < sl || idx > el {
                    return None;
                }
                let (from, to) = sel_cols(idx, sl, sc, el, ec);
                let (bs, be) = render::cols_to_byte_range(&line.spans, from, to)?;
                Some(render::highlight_byte_range(
                    &line.spans,
                    bs,
                    be,
                    Modifier::REVERSED,
                ))
            });
            let spans = highlighted.as_deref().unwrap_or(&line.spans);
            render::paint_spans(buf, inner.x, y, skip, inner.width, spans, body);
        }

        if let Some(x) = scrollbar_x {
            render::render_scrollbar(
                Rect::new(x, area.y, 1, area.height),
                buf,
                &self.viewport,
                self.options.render.typography.muted,
            );
        }
    }

    /// Laid-out lines for `width`, padding excluded.
    pub fn lines_for_width(&mut self, width: u16) -> Vec<Line<'static>> {
        let width = width
            .saturating_sub(self.options.padding_left)
            .saturating_sub(self.options.padding_right);
        self.ensure_layout(width);
        self.lines.iter().map(|l| Line::from(l.spans.clone())).collect()
    }

    /// Rendered lines at the last laid-out width (80 columns if none yet).
    pub fn rendered_lines(&mut self) -> &[RenderedLine] {
        self.ensure_layout(self.cached_width.unwrap_or(80));
        &self.lines
    }

    pub fn as_text(&mut self) -> Text<'static> {
        self.ensure_layout(self.cached_width.unwrap_or(80));
        lines_to_text(&self.lines)
    }

    fn ensure_layout(&mut self, width: u16) {
        if self.cached_width == Some(width) {
            return;
        }
        self.cached_width = Some(width);
        let t = &self.options.render.typography;
        self.lines = match (&self.state, &self.document) {
            (MarkdownState::Error(err), _) => {
                vec![status_line(format!("could not render markdown: {err}"), t.error)]
            }
            (_, Some(doc)) => {
                let ctx = LayoutContext {
                    highlighter: self
                        .highlighter
                        .as_deref()
                        .map(|h| h as &dyn CodeHighlighter),
                    images: self.images.as_ref(),
                    ..LayoutContext::from_options(&self.options.render)
                };
                doc.layout(width, t, &ctx)
            }
            (MarkdownState::Loading, None) => vec![status_line("loading…".to_string(), t.muted)],
            (MarkdownState::Success, None) => Vec::new(),
        };
        let content_w = self
            .lines
            .iter()
            .filter(|l| l.scrollable)
            .map(RenderedLine::width)
            .max()
            .unwrap_or(0);
        self.viewport
            .set_content(content_w, self.lines.len() as u32);
    }

    /// `(content area, inner area, scrollbar column)`.
    fn areas(&self, area: Rect) -> (Rect, Rect, Option<u16>) {
        let (content, scrollbar_x) = if self.options.show_scrollbar && area.width >= 2 {
            (
                Rect::new(area.x, area.y, area.width - 1, area.height),
                Some(area.x + area.width - 1),
            )
        } else {
            (area, None)
        };
        let inner = inset_h(content, self.options.padding_left, self.options.padding_right);
        (content, inner, scrollbar_x)
    }
}

fn status_line(text: String, style: ratatui::style::Style) -> RenderedLine {
    RenderedLine {
        spans: vec![Span::styled(text.clone(), style)],
        plain: text,
        links: Vec::new(),
        scrollable: false,
        image: None,
    }
}

fn sel_cols(idx: usize, start_line: usize, start_col: u32, end_line: usize, end_col: u32) -> (u32, u32) {
    if start_line == end_line {
        (start_col, end_col)
    } else if idx == start_line {
        (start_col, u32::MAX)
    } else if idx == end_line {
        (0, end_col)
    } else {
        (0, u32::MAX)
    }
}

fn normalize_sel_inclusive(a: Pos, b: Pos) -> (Pos, Pos) {
    let (start, end) = if a <= b { (a, b) } else { (b, a) };
    (start, (end.0, end.1.saturating_add(1)))
}

fn inset_h(area: Rect, left: u16, right: u16) -> Rect {
    let left = left.min(area.width);
    let right = right.min(area.width.saturating_sub(left));
    Rect::new(
        area.x.saturating_add(left),
        area.y,
        area.width.saturating_sub(left).saturating_sub(right),
        area.height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotated::LinkListener;
    use crate::parser::Flavour;
    use pretty_assertions::assert_eq;
    use ratatui_markdown_core::input::KeyEvent;
    use ratatui_markdown_core::input::KeyModifiers;
    use std::sync::Mutex;
    use std::time::Duration;
    use std::time::Instant;

    fn row(buf: &Buffer, y: u16) -> String {
        (0..buf.area.width)
            .map(|x| buf.cell((x, y)).map(|c| c.symbol().to_string()).unwrap_or_default())
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn click(x: u16, y: u16) -> InputEvent {
        InputEvent::Mouse(MouseEvent {
            x,
            y,
            kind: MouseEventKind::Down(MouseButton::Left),
            modifiers: KeyModifiers::default(),
        })
    }

    fn plain(view: &mut MarkdownView) -> Vec<String> {
        view.rendered_lines().iter().map(|l| l.plain.clone()).collect()
    }

    #[test]
    fn renders_into_buffer() {
        let mut view = MarkdownView::new();
        view.set_markdown("# Title\n\n- item one\n- item two\n");
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        view.render_ref(area, &mut buf);
        assert_eq!(row(&buf, 0), "Title");
        assert_eq!(row(&buf, 2), "• item one");
        assert_eq!(row(&buf, 3), "• item two");
    }

    #[test]
    fn clicking_a_link_activates_it() {
        let clicked = Arc::new(Mutex::new(Vec::<String>::new()));
        let sink = clicked.clone();
        let listener: LinkListener = Arc::new(move |dest: &str| {
            if let Ok(mut v) = sink.lock() {
                v.push(dest.to_string());
            }
        });
        let mut view = MarkdownView::with_options(MarkdownViewOptions {
            show_scrollbar: false,
            render: MarkdownOptions {
                link_listener: Some(listener),
                ..MarkdownOptions::default()
            },
            ..MarkdownViewOptions::default()
        });
        view.set_markdown("see [docs](https://docs.rs) now");
        let area = Rect::new(0, 0, 40, 3);
        assert_eq!(
            view.handle_event_action_in_area(area, click(5, 0)),
            ViewAction::LinkActivated("https://docs.rs".into())
        );
        assert_eq!(*clicked.lock().unwrap(), vec!["https://docs.rs".to_string()]);
        assert_eq!(
            view.handle_event_action_in_area(area, click(1, 0)),
            ViewAction::Redraw
        );
    }

    #[test]
    fn parse_errors_render_a_distinct_line() {
        let mut view = MarkdownView::with_options(MarkdownViewOptions {
            render: MarkdownOptions {
                flavour: Flavour {
                    max_input_len: Some(3),
                    ..Flavour::default()
                },
                ..MarkdownOptions::default()
            },
            ..MarkdownViewOptions::default()
        });
        view.set_markdown("far too long");
        assert!(matches!(view.state(), MarkdownState::Error(ParseError::TooLarge { .. })));
        let lines = plain(&mut view);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("could not render markdown"));
    }

    #[test]
    fn async_parse_lands_on_poll() {
        let mut view = MarkdownView::new();
        view.set_markdown_async("first").unwrap();
        view.set_markdown_async("**second**").unwrap();
        assert_eq!(view.state(), &MarkdownState::Loading);
        let deadline = Instant::now() + Duration::from_secs(5);
        while !view.poll_parse() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(view.state(), &MarkdownState::Success);
        assert_eq!(plain(&mut view), vec!["second"]);
    }

    #[test]
    fn tables_scroll_while_prose_stays() {
        let mut view = MarkdownView::with_options(MarkdownViewOptions {
            show_scrollbar: false,
            ..MarkdownViewOptions::default()
        });
        view.set_markdown("intro\n\n| a | b | c |\n|---|---|---|\n| 1 | 2 | 3 |\n");
        let area = Rect::new(0, 0, 20, 6);
        let mut buf = Buffer::empty(area);
        view.render_ref(area, &mut buf);
        assert!(row(&buf, 2).starts_with(" a"));

        view.handle_event_action(InputEvent::Key(KeyEvent::char('l')));
        assert_eq!(view.viewport.x, 4);
        let mut buf = Buffer::empty(area);
        view.render_ref(area, &mut buf);
        assert_eq!(row(&buf, 0), "intro");
        assert!(!row(&buf, 2).starts_with(" a"));
        assert!(view.rendered_lines()[2].scrollable);
        assert!(!view.rendered_lines()[0].scrollable);
    }

    #[test]
    fn drag_selection_copies_text() {
        let mut view = MarkdownView::with_options(MarkdownViewOptions {
            show_scrollbar: false,
            ..MarkdownViewOptions::default()
        });
        view.set_markdown("hello world");
        let area = Rect::new(0, 0, 20, 2);
        view.handle_event_action_in_area(area, click(0, 0));
        view.handle_event_action_in_area(
            area,
            InputEvent::Mouse(MouseEvent {
                x: 4,
                y: 0,
                kind: MouseEventKind::Up(MouseButton::Left),
                modifiers: KeyModifiers::default(),
            }),
        );
        assert_eq!(
            view.handle_event_action(InputEvent::Key(KeyEvent::char('y'))),
            ViewAction::CopyRequested("hello".into())
        );
    }
}
