//! Markdown parsing behind a collaborator trait, with a pulldown-cmark backed default.
//!
//! pulldown-cmark reports a flat event stream and hides most syntax characters. The adapter
//! here turns that stream into an [`Ast`] that keeps them: list markers, task checkboxes,
//! link brackets, code span backticks and table separator lines all become token nodes with
//! their own source ranges.
use std::ops::Range;
use std::sync::LazyLock;
use std::time::Instant;

use pulldown_cmark::BrokenLink;
use pulldown_cmark::CodeBlockKind;
use pulldown_cmark::CowStr;
use pulldown_cmark::Event;
use pulldown_cmark::HeadingLevel;
use pulldown_cmark::LinkType;
use pulldown_cmark::Options;
use pulldown_cmark::Parser;
use pulldown_cmark::Tag;
use pulldown_cmark::TagEnd;
use regex_lite::Regex;
use tracing::debug;
use url::Url;

use crate::ast::Ast;
use crate::ast::NodeId;
use crate::ast::NodeKind;
use crate::entities::decode;
use crate::error::ParseError;

/// Parses markdown source into an [`Ast`].
pub trait MarkdownParser: Send + Sync {
    fn parse(&self, source: &str, flavour: &Flavour) -> Result<Ast, ParseError>;
}

/// Which GFM extensions the parser recognizes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Flavour {
    pub tables: bool,
    pub strikethrough: bool,
    pub task_lists: bool,
    /// Bare `http://`, `https://` and `www.` URLs in text become links.
    pub autolinks: bool,
    pub smart_punctuation: bool,
    /// Inputs longer than this many bytes are rejected with [`ParseError::TooLarge`].
    pub max_input_len: Option<usize>,
}

impl Default for Flavour {
    fn default() -> Self {
        Self {
            tables: true,
            strikethrough: true,
            task_lists: true,
            autolinks: true,
            smart_punctuation: false,
            max_input_len: None,
        }
    }
}

impl Flavour {
    /// Plain CommonMark: every extension switched off.
    pub fn commonmark() -> Self {
        Self {
            tables: false,
            strikethrough: false,
            task_lists: false,
            autolinks: false,
            smart_punctuation: false,
            max_input_len: None,
        }
    }

    fn options(&self) -> Options {
        let mut options = Options::empty();
        if self.tables {
            options.insert(Options::ENABLE_TABLES);
        }
        if self.strikethrough {
            options.insert(Options::ENABLE_STRIKETHROUGH);
        }
        if self.task_lists {
            options.insert(Options::ENABLE_TASKLISTS);
        }
        if self.smart_punctuation {
            options.insert(Options::ENABLE_SMART_PUNCTUATION);
        }
        options
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PulldownParser;

impl MarkdownParser for PulldownParser {
    fn parse(&self, source: &str, flavour: &Flavour) -> Result<Ast, ParseError> {
        if let Some(max) = flavour.max_input_len
            && source.len() > max
        {
            return Err(ParseError::TooLarge {
                len: source.len(),
                max,
            });
        }
        let started = Instant::now();
        let ast = build_ast(source, flavour)?;
        debug!(
            len = source.len(),
            nodes = ast.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "parsed markdown"
        );
        Ok(ast)
    }
}

/// Destination for a bare URL: `www.` hosts get an `http://` scheme.
pub(crate) fn bare_url_destination(text: &str) -> String {
    if text.starts_with("www.") {
        format!("http://{text}")
    } else {
        text.to_string()
    }
}

static BARE_URL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?:https?://|www\.)[^\s<>]+").ok());

const DELIMITERS: &[char] = &['[', ']', '(', ')', '<', '>', '!', ':', '"', '\'', '`'];

struct Definition {
    label: String,
    destination: String,
    title: Option<String>,
    span: Range<usize>,
}

fn build_ast<'s>(source: &'s str, flavour: &Flavour) -> Result<Ast, ParseError> {
    // Every bracketed reference becomes a link event; resolution happens against our own table.
    let broken = |_link: BrokenLink<'s>| -> Option<(CowStr<'s>, CowStr<'s>)> {
        Some((CowStr::Borrowed(""), CowStr::Borrowed("")))
    };
    let parser = Parser::new_with_broken_link_callback(source, flavour.options(), Some(broken));

    let mut definitions: Vec<Definition> = parser
        .reference_definitions()
        .iter()
        .map(|(label, def)| Definition {
            label: label_from_span(source, &def.span).unwrap_or_else(|| label.to_string()),
            destination: def.dest.to_string(),
            title: def.title.as_ref().map(|t| t.to_string()),
            span: def.span.clone(),
        })
        .collect();

    let mut builder = TreeBuilder::new(source, flavour);
    for (event, range) in parser.into_offset_iter() {
        builder.event(event, range)?;
    }
    let unreported = unreported_definitions(source, &builder.ast, &definitions);
    if !unreported.is_empty() {
        debug!(count = unreported.len(), "recovered repeated link definitions");
    }
    definitions.extend(unreported);
    definitions.sort_by_key(|d| d.span.start);
    builder.finish(definitions)
}

// Group 1: the definition. Group 2: label. Groups 3/4: destination. Groups 5/6/7: title.
static DEFINITION_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)^[ \t>]*(\[((?:[^\[\]\\\n]|\\.)+)\]:[ \t]*(?:<([^<>\n]*)>|([^\s<]\S*))(?:[ \t]+(?:"([^"\n]*)"|'([^'\n]*)'|\(([^()\n]*)\)))?)[ \t]*\r?$"#,
    )
    .ok()
});

/// Single-line definitions that pulldown-cmark consumes without reporting, such as a repeated
/// label. Only lines outside every leaf block and every reported definition qualify.
fn unreported_definitions(source: &str, ast: &Ast, known: &[Definition]) -> Vec<Definition> {
    let Some(re) = DEFINITION_LINE.as_ref() else {
        return Vec::new();
    };
    let covered: Vec<Range<usize>> = ast
        .descendants(ast.root())
        .filter(|id| {
            !matches!(
                ast.kind(*id),
                NodeKind::Document
                    | NodeKind::BlockQuote
                    | NodeKind::OrderedList { .. }
                    | NodeKind::UnorderedList
                    | NodeKind::ListItem
                    | NodeKind::Group(_)
            )
        })
        .map(|id| ast.range(id))
        .chain(known.iter().map(|d| d.span.clone()))
        .collect();
    re.captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(1)?;
            if covered.iter().any(|r| r.contains(&whole.start())) {
                return None;
            }
            let destination = caps.get(3).or_else(|| caps.get(4)).map_or("", |m| m.as_str());
            let title = caps
                .get(5)
                .or_else(|| caps.get(6))
                .or_else(|| caps.get(7))
                .map(|m| decode(m.as_str(), true, true));
            Some(Definition {
                label: caps.get(2)?.as_str().to_string(),
                destination: decode(destination, true, true),
                title,
                span: whole.range(),
            })
        })
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RefKind {
    Inline,
    Full,
    Collapsed,
    Shortcut,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Role {
    Node,
    /// Paragraph opened around inline content sitting directly in a tight list item.
    ImplicitParagraph,
    LinkText { link: NodeId, kind: RefKind },
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    id: NodeId,
    role: Role,
}

struct TreeBuilder<'a> {
    source: &'a str,
    flavour: &'a Flavour,
    ast: Ast,
    stack: Vec<Frame>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str, flavour: &'a Flavour) -> Self {
        Self {
            source,
            flavour,
            ast: Ast::new(NodeKind::Document, 0..source.len()),
            stack: Vec::new(),
        }
    }

    fn top(&self) -> NodeId {
        self.stack
            .last()
            .map(|f| f.id)
            .unwrap_or_else(|| self.ast.root())
    }

    fn open(&mut self, kind: NodeKind, range: Range<usize>, role: Role) -> NodeId {
        let id = self.ast.push(self.top(), kind, range);
        self.stack.push(Frame { id, role });
        id
    }

    fn leaf(&mut self, kind: NodeKind, range: Range<usize>) -> NodeId {
        self.ast.push(self.top(), kind, range)
    }

    fn close_implicit(&mut self) {
        while self
            .stack
            .last()
            .is_some_and(|f| f.role == Role::ImplicitParagraph)
        {
            self.stack.pop();
        }
    }

    fn ensure_inline_parent(&mut self, at: usize) {
        if matches!(self.ast.kind(self.top()), NodeKind::ListItem) {
            self.open(NodeKind::Paragraph, at..at, Role::ImplicitParagraph);
        }
    }

    fn in_link(&self) -> bool {
        self.stack.iter().any(|f| {
            matches!(
                self.ast.kind(f.id),
                NodeKind::InlineLink { .. }
                    | NodeKind::FullReferenceLink { .. }
                    | NodeKind::ShortReferenceLink { .. }
                    | NodeKind::Autolink { .. }
                    | NodeKind::Image { .. }
            )
        })
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) -> Result<(), ParseError> {
        match event {
            Event::Start(tag) => self.start(tag, range),
            Event::End(tag) => self.end(tag, range)?,
            Event::Text(text) => self.text(&text, range),
            Event::Code(_) => {
                self.ensure_inline_parent(range.start);
                self.code_span(range);
            }
            Event::Html(_) => {
                if matches!(self.ast.kind(self.top()), NodeKind::HtmlBlock) {
                    self.leaf(NodeKind::Text, range);
                } else {
                    self.ensure_inline_parent(range.start);
                    self.leaf(NodeKind::InlineHtml, range);
                }
            }
            Event::InlineHtml(_) => {
                self.ensure_inline_parent(range.start);
                self.leaf(NodeKind::InlineHtml, range);
            }
            Event::SoftBreak => {
                self.ensure_inline_parent(range.start);
                self.leaf(NodeKind::SoftBreak, range);
            }
            Event::HardBreak => {
                self.ensure_inline_parent(range.start);
                self.leaf(NodeKind::HardBreak, range);
            }
            Event::Rule => {
                self.close_implicit();
                self.leaf(NodeKind::HorizontalRule, range);
            }
            Event::TaskListMarker(_) => self.checkbox(range),
            Event::FootnoteReference(_) | Event::InlineMath(_) | Event::DisplayMath(_) => {
                self.ensure_inline_parent(range.start);
                self.leaf(NodeKind::Text, range);
            }
        }
        Ok(())
    }

    fn start(&mut self, tag: Tag<'_>, range: Range<usize>) {
        let kind = match tag {
            Tag::Paragraph => NodeKind::Paragraph,
            Tag::Heading { level, .. } => NodeKind::Heading {
                level: heading_level(level),
                setext: !self.is_atx(range.start),
            },
            Tag::BlockQuote(_) => NodeKind::BlockQuote,
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => NodeKind::CodeFence {
                info: info.to_string(),
            },
            Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::CodeBlock,
            Tag::HtmlBlock => NodeKind::HtmlBlock,
            Tag::List(Some(start)) => NodeKind::OrderedList { start },
            Tag::List(None) => NodeKind::UnorderedList,
            Tag::Item => NodeKind::ListItem,
            Tag::Table(_) => NodeKind::Table,
            Tag::TableHead => NodeKind::TableHeader,
            Tag::TableRow => NodeKind::TableRow,
            Tag::TableCell => NodeKind::TableCell,
            Tag::Emphasis => NodeKind::Emphasis,
            Tag::Strong => NodeKind::Strong,
            Tag::Strikethrough => NodeKind::Strikethrough,
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                self.start_link(link_type, &dest_url, &title, range);
                return;
            }
            Tag::Image {
                link_type,
                dest_url,
                title,
                ..
            } => NodeKind::Image {
                destination: image_destination(link_type, &dest_url),
                title: (!title.is_empty()).then(|| title.to_string()),
            },
            _ => NodeKind::Group("group".to_string()),
        };
        if kind.is_inline() {
            self.ensure_inline_parent(range.start);
        } else {
            self.close_implicit();
        }
        let is_item = matches!(kind, NodeKind::ListItem);
        let id = self.open(kind, range.clone(), Role::Node);
        if is_item {
            self.list_marker(id, range.start);
        }
    }

    fn start_link(&mut self, link_type: LinkType, dest: &str, title: &str, range: Range<usize>) {
        self.ensure_inline_parent(range.start);
        let title = (!title.is_empty()).then(|| title.to_string());
        let (kind, ref_kind) = match link_type {
            LinkType::Autolink | LinkType::Email => {
                self.open(
                    NodeKind::Autolink {
                        url: dest.to_string(),
                    },
                    range,
                    Role::Node,
                );
                return;
            }
            LinkType::Inline => (
                NodeKind::InlineLink {
                    destination: dest.to_string(),
                    title,
                },
                RefKind::Inline,
            ),
            LinkType::Reference | LinkType::ReferenceUnknown => (
                NodeKind::FullReferenceLink {
                    label: String::new(),
                },
                RefKind::Full,
            ),
            LinkType::Collapsed | LinkType::CollapsedUnknown => (
                NodeKind::ShortReferenceLink {
                    label: String::new(),
                },
                RefKind::Collapsed,
            ),
            _ => (
                NodeKind::ShortReferenceLink {
                    label: String::new(),
                },
                RefKind::Shortcut,
            ),
        };
        let link = self.open(kind, range.clone(), Role::Node);
        let bracket = range.start..(range.start + 1).min(range.end);
        self.open(
            NodeKind::LinkText,
            bracket.clone(),
            Role::LinkText {
                link,
                kind: ref_kind,
            },
        );
        if self.source.as_bytes().get(range.start) == Some(&b'[') {
            self.leaf(NodeKind::Delimiter('['), bracket);
        }
    }

    fn end(&mut self, tag: TagEnd, range: Range<usize>) -> Result<(), ParseError> {
        self.close_implicit();
        let Some(frame) = self.stack.pop() else {
            return Err(malformed(range.start, format!("unexpected end of {tag:?}")));
        };
        if let Role::LinkText { link, kind } = frame.role {
            if tag != TagEnd::Link {
                return Err(malformed(range.start, format!("{tag:?} closes a link")));
            }
            return self.finish_link(frame.id, link, kind);
        }
        if !closes(self.ast.kind(frame.id), &tag) {
            return Err(malformed(
                range.start,
                format!("{tag:?} closes {}", self.ast.kind(frame.id).tag()),
            ));
        }
        match tag {
            TagEnd::TableHead => self.table_separator(range),
            TagEnd::TableRow => {
                self.recover_extra_cells(frame.id, range);
                self.trim_padded_cells(frame.id);
            }
            _ => {}
        }
        Ok(())
    }

    fn finish_link(&mut self, text: NodeId, link: NodeId, kind: RefKind) -> Result<(), ParseError> {
        let source = self.source;
        let link_range = self.ast.range(link);
        let from = self
            .ast
            .children(text)
            .last()
            .map(|c| self.ast.range(*c).end)
            .unwrap_or(link_range.start + 1);
        let close = source
            .get(from..link_range.end)
            .and_then(|s| s.find(']'))
            .map(|i| from + i);
        let text_end = match close {
            Some(close) => {
                self.ast.push(text, NodeKind::Delimiter(']'), close..close + 1);
                close + 1
            }
            None => from,
        };
        self.ast.set_range(text, link_range.start..text_end);

        let inner = source.get(link_range.start + 1..text_end.saturating_sub(1));
        let label = match kind {
            RefKind::Inline => None,
            RefKind::Full => {
                if text_end < link_range.end {
                    self.ast
                        .push(link, NodeKind::LinkLabel, text_end..link_range.end);
                }
                source.get(text_end + 1..link_range.end.saturating_sub(1))
            }
            RefKind::Collapsed => {
                if text_end < link_range.end {
                    self.ast
                        .push(link, NodeKind::LinkLabel, text_end..link_range.end);
                }
                inner
            }
            RefKind::Shortcut => inner,
        };
        if let Some(found) = label
            && let NodeKind::FullReferenceLink { label } | NodeKind::ShortReferenceLink { label } =
                self.ast.kind_mut(link)
        {
            *label = found.to_string();
        }

        match self.stack.pop() {
            Some(frame) if frame.id == link => Ok(()),
            _ => Err(malformed(link_range.start, "link text outside its link".into())),
        }
    }

    fn text(&mut self, text: &str, range: Range<usize>) {
        if matches!(
            self.ast.kind(self.top()),
            NodeKind::CodeBlock | NodeKind::CodeFence { .. } | NodeKind::HtmlBlock
        ) {
            self.leaf(NodeKind::Text, range);
            return;
        }
        self.ensure_inline_parent(range.start);
        let range = self.include_escape(range);
        let source = self.source;
        let raw = source.get(range.clone()).unwrap_or("");
        if raw.is_empty() && text.is_empty() {
            return;
        }
        if !raw.is_empty() && raw.trim().is_empty() {
            self.leaf(NodeKind::Whitespace, range);
            return;
        }
        let mut chars = text.chars();
        if let (Some(ch), None) = (chars.next(), chars.next())
            && raw != text
            && !raw.starts_with(['&', '\\'])
        {
            // Smart punctuation: the display character is not in the source.
            self.leaf(NodeKind::Delimiter(ch), range);
            return;
        }
        let mut raw_chars = raw.chars();
        if let (Some(ch), None) = (raw_chars.next(), raw_chars.next())
            && DELIMITERS.contains(&ch)
        {
            self.leaf(NodeKind::Delimiter(ch), range);
            return;
        }
        if self.flavour.autolinks && !self.in_link() {
            self.push_text_with_urls(range);
        } else {
            self.leaf(NodeKind::Text, range);
        }
    }

    /// Widens a text range starting right after an escaping backslash so the backslash is part of
    /// the raw text the decoder sees.
    fn include_escape(&self, range: Range<usize>) -> Range<usize> {
        let bytes = self.source.as_bytes();
        let start = range.start;
        if start == 0 || start > bytes.len() || !bytes.get(start).is_some_and(u8::is_ascii_punctuation)
        {
            return range;
        }
        let backslashes = bytes[..start]
            .iter()
            .rev()
            .take_while(|b| **b == b'\\')
            .count();
        if backslashes % 2 == 0 {
            return range;
        }
        let floor = self
            .ast
            .children(self.top())
            .last()
            .map(|c| self.ast.range(*c).end)
            .unwrap_or(0);
        if start - 1 < floor {
            return range;
        }
        start - 1..range.end
    }

    fn push_text_with_urls(&mut self, range: Range<usize>) {
        let source = self.source;
        let Some(raw) = source.get(range.clone()) else {
            self.leaf(NodeKind::Text, range);
            return;
        };
        let mut cursor = range.start;
        if let Some(re) = BARE_URL.as_ref() {
            for m in re.find_iter(raw) {
                let start = range.start + m.start();
                if start < cursor || !at_word_boundary(source, start) {
                    continue;
                }
                let candidate = trim_url_tail(m.as_str());
                if candidate.is_empty() || !is_valid_url(candidate) {
                    continue;
                }
                if cursor < start {
                    self.leaf(NodeKind::Text, cursor..start);
                }
                let end = start + candidate.len();
                self.leaf(NodeKind::BareUrl, start..end);
                cursor = end;
            }
        }
        if cursor < range.end {
            self.leaf(NodeKind::Text, cursor..range.end);
        }
    }

    fn code_span(&mut self, range: Range<usize>) {
        let source = self.source;
        let span = self.leaf(NodeKind::CodeSpan, range.clone());
        let raw = source.get(range.clone()).unwrap_or("");
        let open = raw.bytes().take_while(|b| *b == b'`').count();
        let close = raw
            .bytes()
            .rev()
            .take_while(|b| *b == b'`')
            .count()
            .min(raw.len() - open);
        if open == 0 || close == 0 {
            self.ast.push(span, NodeKind::CodeText, range);
            return;
        }
        let mut inner = range.start + open..range.end - close;
        let body = source.get(inner.clone()).unwrap_or("");
        if body.len() >= 2
            && body.starts_with([' ', '\n'])
            && body.ends_with([' ', '\n'])
            && !body.trim().is_empty()
        {
            inner = inner.start + 1..inner.end - 1;
        }
        self.ast
            .push(span, NodeKind::Backtick, range.start..range.start + open);
        self.ast.push(span, NodeKind::CodeText, inner);
        self.ast
            .push(span, NodeKind::Backtick, range.end - close..range.end);
    }

    fn list_marker(&mut self, item: NodeId, start: usize) {
        let bytes = self.source.as_bytes();
        let mut i = start;
        while matches!(bytes.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }
        let begin = i;
        match bytes.get(i) {
            Some(b'-' | b'*' | b'+') => i += 1,
            Some(b) if b.is_ascii_digit() => {
                while bytes.get(i).is_some_and(u8::is_ascii_digit) && i - begin < 9 {
                    i += 1;
                }
                if !matches!(bytes.get(i), Some(b'.' | b')')) {
                    return;
                }
                i += 1;
            }
            _ => return,
        }
        self.ast.push(item, NodeKind::ListMarker, begin..i);
    }

    /// Task markers are hoisted to the owning item, right after its list marker.
    fn checkbox(&mut self, range: Range<usize>) {
        let item = self
            .stack
            .iter()
            .rev()
            .map(|f| f.id)
            .find(|id| matches!(self.ast.kind(*id), NodeKind::ListItem));
        let Some(item) = item else {
            self.leaf(NodeKind::Text, range);
            return;
        };
        let marker = self
            .ast
            .find_child(item, |k| matches!(k, NodeKind::ListMarker));
        let after = marker
            .map(|m| self.ast.range(m).end)
            .unwrap_or_else(|| self.ast.range(item).start);
        let bytes = self.source.as_bytes();
        let mut i = after;
        while matches!(bytes.get(i), Some(b' ' | b'\t')) {
            i += 1;
        }
        let range = if bytes.get(i) == Some(&b'[') && bytes.get(i + 2) == Some(&b']') {
            i..i + 3
        } else {
            range
        };
        let index = usize::from(marker.is_some());
        self.ast.insert_child(item, index, NodeKind::Checkbox, range);
    }

    /// Adds the `|---|` line under a table head.
    fn table_separator(&mut self, head: Range<usize>) {
        let table = self.top();
        if !matches!(self.ast.kind(table), NodeKind::Table) {
            return;
        }
        let source = self.source;
        let Some(nl) = source.get(head.start..).and_then(|s| s.find('\n')) else {
            return;
        };
        let mut start = head.start + nl + 1;
        let bytes = source.as_bytes();
        while matches!(bytes.get(start), Some(b' ' | b'\t' | b'>')) {
            start += 1;
        }
        let end = source
            .get(start..)
            .and_then(|s| s.find('\n'))
            .map(|i| start + i)
            .unwrap_or(source.len());
        let line = source.get(start..end).unwrap_or("").trim_end_matches('\r');
        if !line.contains('-') {
            return;
        }
        self.ast
            .push(table, NodeKind::TableSeparator, start..start + line.len());
    }

    /// Restores the cells pulldown-cmark drops from body rows longer than the header.
    fn recover_extra_cells(&mut self, row: NodeId, range: Range<usize>) {
        let table = self.top();
        let Some(header) = self
            .ast
            .find_child(table, |k| matches!(k, NodeKind::TableHeader))
        else {
            return;
        };
        let columns = self
            .ast
            .children(header)
            .iter()
            .filter(|c| matches!(self.ast.kind(**c), NodeKind::TableCell))
            .count();
        let source = self.source;
        let end = source
            .get(range.start..)
            .and_then(|s| s.find('\n'))
            .map(|i| range.start + i)
            .unwrap_or(source.len());
        let line = source.get(range.start..end).unwrap_or("").trim_end_matches('\r');
        for (i, cell) in split_row(line, range.start).into_iter().enumerate() {
            if i < columns {
                continue;
            }
            let id = self.ast.push(row, NodeKind::TableCell, cell.clone());
            if !cell.is_empty() {
                self.ast.push(id, NodeKind::Text, cell);
            }
        }
    }

    /// Drops the empty cells pulldown-cmark appends to rows shorter than the header.
    fn trim_padded_cells(&mut self, row: NodeId) {
        while let Some(last) = self.ast.children(row).last().copied() {
            let text = self.ast.text(self.source, last);
            let padded = self.ast.children(last).is_empty()
                && text.trim_matches(|c: char| c == '|' || c.is_whitespace()).is_empty();
            if !padded {
                break;
            }
            self.ast.detach_last_child(row);
        }
    }

    fn is_atx(&self, start: usize) -> bool {
        self.source
            .get(start..)
            .is_some_and(|s| s.trim_start_matches([' ', '\t']).starts_with('#'))
    }

    fn finish(mut self, definitions: Vec<Definition>) -> Result<Ast, ParseError> {
        self.close_implicit();
        if let Some(frame) = self.stack.last() {
            return Err(malformed(
                self.source.len(),
                format!("unclosed {}", self.ast.kind(frame.id).tag()),
            ));
        }
        for def in definitions {
            self.insert_definition(def);
        }
        self.ast.normalize();
        Ok(self.ast)
    }

    fn insert_definition(&mut self, def: Definition) {
        let mut container = self.ast.root();
        loop {
            let next = self.ast.children(container).iter().copied().find(|c| {
                matches!(
                    self.ast.kind(*c),
                    NodeKind::BlockQuote
                        | NodeKind::OrderedList { .. }
                        | NodeKind::UnorderedList
                        | NodeKind::ListItem
                ) && self.ast.range(*c).contains(&def.span.start)
            });
            match next {
                Some(next) => container = next,
                None => break,
            }
        }
        let index = self
            .ast
            .children(container)
            .iter()
            .take_while(|c| self.ast.range(**c).start < def.span.start)
            .count();
        self.ast.insert_child(
            container,
            index,
            NodeKind::LinkDefinition {
                label: def.label,
                destination: def.destination,
                title: def.title,
            },
            def.span,
        );
    }
}

/// Byte ranges of the trimmed cells of one table row line starting at `offset`.
///
/// Pipes preceded by a backslash are cell content.
fn split_row(line: &str, offset: usize) -> Vec<Range<usize>> {
    let bytes = line.as_bytes();
    let mut start = 0;
    while matches!(bytes.get(start), Some(b' ' | b'\t' | b'>')) {
        start += 1;
    }
    if bytes.get(start) == Some(&b'|') {
        start += 1;
    }
    let mut end = line.trim_end().len();
    if end > start && bytes[end - 1] == b'|' && (end < 2 || bytes[end - 2] != b'\\') {
        end -= 1;
    }

    let mut cells = Vec::new();
    let mut cell_start = start;
    let mut i = start;
    while i < end {
        match bytes[i] {
            b'\\' => i += 1,
            b'|' => {
                cells.push(trimmed(line, cell_start..i, offset));
                cell_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if cell_start < end || !cells.is_empty() {
        cells.push(trimmed(line, cell_start..end.max(cell_start), offset));
    }
    cells
}

fn trimmed(line: &str, range: Range<usize>, offset: usize) -> Range<usize> {
    let text = line.get(range.clone()).unwrap_or("");
    let start = range.start + (text.len() - text.trim_start().len());
    let end = range.start + text.trim_end().len();
    offset + start..offset + end.max(start)
}

fn malformed(offset: usize, reason: String) -> ParseError {
    ParseError::Malformed { offset, reason }
}

fn closes(kind: &NodeKind, tag: &TagEnd) -> bool {
    match tag {
        TagEnd::Paragraph => matches!(kind, NodeKind::Paragraph),
        TagEnd::Heading(_) => matches!(kind, NodeKind::Heading { .. }),
        TagEnd::BlockQuote(_) => matches!(kind, NodeKind::BlockQuote),
        TagEnd::CodeBlock => matches!(kind, NodeKind::CodeBlock | NodeKind::CodeFence { .. }),
        TagEnd::HtmlBlock => matches!(kind, NodeKind::HtmlBlock),
        TagEnd::List(true) => matches!(kind, NodeKind::OrderedList { .. }),
        TagEnd::List(false) => matches!(kind, NodeKind::UnorderedList),
        TagEnd::Item => matches!(kind, NodeKind::ListItem),
        TagEnd::Table => matches!(kind, NodeKind::Table),
        TagEnd::TableHead => matches!(kind, NodeKind::TableHeader),
        TagEnd::TableRow => matches!(kind, NodeKind::TableRow),
        TagEnd::TableCell => matches!(kind, NodeKind::TableCell),
        TagEnd::Emphasis => matches!(kind, NodeKind::Emphasis),
        TagEnd::Strong => matches!(kind, NodeKind::Strong),
        TagEnd::Strikethrough => matches!(kind, NodeKind::Strikethrough),
        TagEnd::Link => matches!(kind, NodeKind::Autolink { .. }),
        TagEnd::Image => matches!(kind, NodeKind::Image { .. }),
        _ => matches!(kind, NodeKind::Group(_)),
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn image_destination(link_type: LinkType, dest: &str) -> String {
    match link_type {
        LinkType::ReferenceUnknown | LinkType::CollapsedUnknown | LinkType::ShortcutUnknown => {
            String::new()
        }
        _ => dest.to_string(),
    }
}

/// Label of a `[label]: dest` definition exactly as written.
fn label_from_span(source: &str, span: &Range<usize>) -> Option<String> {
    let s = source.get(span.clone())?;
    let open = s.find('[')?;
    let bytes = s.as_bytes();
    let mut i = open + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b']' => return s.get(open + 1..i).map(str::to_string),
            _ => i += 1,
        }
    }
    None
}

fn at_word_boundary(source: &str, start: usize) -> bool {
    match source.get(..start).and_then(|s| s.chars().next_back()) {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, '*' | '_' | '~' | '(' | '"' | '\''),
    }
}

fn trim_url_tail(url: &str) -> &str {
    let mut s = url;
    loop {
        let before = s.len();
        s = s.trim_end_matches(['?', '!', '.', ',', ':', ';', '*', '_', '~', '\'', '"']);
        if s.ends_with(')') && s.matches(')').count() > s.matches('(').count() {
            s = &s[..s.len() - 1];
        }
        if s.len() == before {
            return s;
        }
    }
}

fn is_valid_url(candidate: &str) -> bool {
    Url::parse(&bare_url_destination(candidate))
        .ok()
        .and_then(|u| {
            u.host_str()
                .map(|h| h.contains('.') || h == "localhost")
        })
        .unwrap_or(false)
}
