//! Rich text produced by the inline builder: styled runs, link annotations and inline objects.
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use ratatui::style::Modifier;
use ratatui::style::Style;
use ratatui::text::Line;
use ratatui::text::Span;

/// Placeholder character standing in for an inline object (image) inside run text.
pub const OBJECT_REPLACEMENT: char = '\u{fffc}';

pub(crate) const IMAGE_TAG_PREFIX: &str = "markdown.image:";

/// Called with the destination when a link is activated.
pub type LinkListener = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Clone)]
pub struct LinkAnnotation {
    pub destination: String,
    pub listener: Option<LinkListener>,
}

impl LinkAnnotation {
    pub fn new(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Option<LinkListener>) -> Self {
        self.listener = listener;
        self
    }

    /// Invokes the listener, if any.
    pub fn activate(&self) {
        if let Some(listener) = &self.listener {
            listener(&self.destination);
        }
    }
}

impl PartialEq for LinkAnnotation {
    fn eq(&self, other: &Self) -> bool {
        self.destination == other.destination
            && match (&self.listener, &other.listener) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
    }
}

impl fmt::Debug for LinkAnnotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkAnnotation")
            .field("destination", &self.destination)
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

/// Which inline constructs were active when a run was emitted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InlineMarks {
    pub emphasis: bool,
    pub strong: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub link: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InlineObjectKind {
    Image,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineObject {
    pub kind: InlineObjectKind,
    pub destination: String,
    pub alt: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub text: String,
    pub style: Style,
    pub marks: InlineMarks,
    pub link: Option<LinkAnnotation>,
    /// Tag into [`AnnotatedText::objects`] when this run is an object placeholder.
    pub object: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnnotatedText {
    pub runs: Vec<Run>,
    pub objects: BTreeMap<String, InlineObject>,
}

impl AnnotatedText {
    pub fn plain(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    /// Link annotations with their byte ranges in [`AnnotatedText::plain`].
    pub fn links(&self) -> Vec<(Range<usize>, &LinkAnnotation)> {
        let mut out: Vec<(Range<usize>, &LinkAnnotation)> = Vec::new();
        let mut offset = 0;
        for run in &self.runs {
            let end = offset + run.text.len();
            if let Some(link) = &run.link {
                match out.last_mut() {
                    Some((range, prev)) if range.end == offset && *prev == link => {
                        range.end = end;
                    }
                    _ => out.push((offset..end, link)),
                }
            }
            offset = end;
        }
        out
    }

    /// Display text of a run; object placeholders show the image alt text.
    pub fn display_text<'a>(&'a self, run: &'a Run) -> std::borrow::Cow<'a, str> {
        match run.object.as_ref().and_then(|tag| self.objects.get(tag)) {
            Some(object) => format!("🖼 {}", object.alt).into(),
            None => run.text.as_str().into(),
        }
    }

    /// Everything on one line; line breaks become spaces.
    pub fn to_line(&self) -> Line<'static> {
        let spans: Vec<Span<'static>> = self
            .runs
            .iter()
            .map(|r| Span::styled(self.display_text(r).replace('\n', " "), r.style))
            .collect();
        Line::from(spans)
    }

    /// One line per `\n`-separated segment.
    pub fn to_lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![Vec::new()];
        for run in &self.runs {
            let text = self.display_text(run);
            for (i, part) in text.split('\n').enumerate() {
                if i > 0 {
                    lines.push(Vec::new());
                }
                if !part.is_empty()
                    && let Some(line) = lines.last_mut()
                {
                    line.push(Span::styled(part.to_string(), run.style));
                }
            }
        }
        lines.into_iter().map(Line::from).collect()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum InlineStyle {
    Italic,
    Bold,
    Strikethrough,
    Code,
    Link(LinkAnnotation),
}

/// Accumulates runs under a stack of active inline styles.
///
/// Every push must be matched by a pop before the enclosing node is done; [`Self::with_style`]
/// does both around a closure. Push and pop totals are exposed for checking that.
pub struct AnnotatedTextBuilder {
    base: Style,
    link_style: Style,
    code_style: Style,
    stack: Vec<InlineStyle>,
    text: AnnotatedText,
    pushes: usize,
    pops: usize,
}

impl AnnotatedTextBuilder {
    pub fn new(base: Style, link_style: Style, code_style: Style) -> Self {
        Self {
            base,
            link_style,
            code_style,
            stack: Vec::new(),
            text: AnnotatedText::default(),
            pushes: 0,
            pops: 0,
        }
    }

    pub fn push_style(&mut self, style: InlineStyle) {
        self.pushes += 1;
        self.stack.push(style);
    }

    pub fn pop_style(&mut self) -> Option<InlineStyle> {
        let popped = self.stack.pop();
        if popped.is_some() {
            self.pops += 1;
        }
        popped
    }

    pub fn with_style<R>(&mut self, style: InlineStyle, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_style(style);
        let out = f(self);
        self.pop_style();
        out
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// `(pushes, pops)` so far.
    pub fn balance(&self) -> (usize, usize) {
        (self.pushes, self.pops)
    }

    pub fn is_empty(&self) -> bool {
        self.text.runs.is_empty()
    }

    pub fn append(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let (style, marks, link) = self.current();
        if let Some(last) = self.text.runs.last_mut()
            && last.object.is_none()
            && last.style == style
            && last.marks == marks
            && last.link == link
        {
            last.text.push_str(text);
            return;
        }
        self.text.runs.push(Run {
            text: text.to_string(),
            style,
            marks,
            link,
            object: None,
        });
    }

    pub fn append_object(&mut self, tag: String, object: InlineObject) {
        let (style, marks, link) = self.current();
        self.text.runs.push(Run {
            text: OBJECT_REPLACEMENT.to_string(),
            style,
            marks,
            link,
            object: Some(tag.clone()),
        });
        self.text.objects.insert(tag, object);
    }

    pub fn finish(self) -> AnnotatedText {
        self.text
    }

    fn current(&self) -> (Style, InlineMarks, Option<LinkAnnotation>) {
        let mut style = self.base;
        let mut marks = InlineMarks::default();
        let mut link = None;
        for s in &self.stack {
            match s {
                InlineStyle::Italic => {
                    style = style.add_modifier(Modifier::ITALIC);
                    marks.emphasis = true;
                }
                InlineStyle::Bold => {
                    style = style.add_modifier(Modifier::BOLD);
                    marks.strong = true;
                }
                InlineStyle::Strikethrough => {
                    style = style.add_modifier(Modifier::CROSSED_OUT);
                    marks.strikethrough = true;
                }
                InlineStyle::Code => {
                    style = style.patch(self.code_style);
                    marks.code = true;
                }
                InlineStyle::Link(annotation) => {
                    style = style.patch(self.link_style);
                    marks.link = true;
                    link = Some(annotation.clone());
                }
            }
        }
        (style, marks, link)
    }
}
