//! The syntax tree the renderer walks.
//!
//! Nodes live in an arena owned by [`Ast`] and are addressed by [`NodeId`]. Every node records
//! the byte range of the source it was parsed from; the source text itself is never copied into
//! the tree, so text-bearing nodes are read back through [`Ast::text`].
//!
//! The tree is normally produced by [`crate::parser::PulldownParser`], but the builder methods
//! are public so other parsers (and tests) can assemble one directly.
use std::ops::Range;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of node types.
///
/// Token kinds (`ListMarker`, `Checkbox`, `Backtick`, `Delimiter`, `Whitespace`, breaks) exist so
/// syntax characters keep a place in the tree even when no higher-level construct consumes them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Document,

    Heading { level: u8, setext: bool },
    Paragraph,
    BlockQuote,
    OrderedList { start: u64 },
    UnorderedList,
    ListItem,
    ListMarker,
    Checkbox,
    /// Indented code block.
    CodeBlock,
    CodeFence { info: String },
    HtmlBlock,
    HorizontalRule,
    LinkDefinition {
        label: String,
        destination: String,
        title: Option<String>,
    },
    Table,
    TableHeader,
    TableSeparator,
    TableRow,
    TableCell,

    Text,
    Whitespace,
    SoftBreak,
    HardBreak,
    Emphasis,
    Strong,
    Strikethrough,
    CodeSpan,
    CodeText,
    Backtick,
    InlineLink {
        destination: String,
        title: Option<String>,
    },
    FullReferenceLink { label: String },
    ShortReferenceLink { label: String },
    Autolink { url: String },
    BareUrl,
    LinkText,
    LinkLabel,
    Image {
        destination: String,
        title: Option<String>,
    },
    InlineHtml,
    Delimiter(char),

    /// Container the renderer has no dedicated handling for; the name is the parser's tag.
    Group(String),
}

impl NodeKind {
    /// Stable tag name, used as the key for custom component lookup.
    pub fn tag(&self) -> &str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Heading {
                level,
                setext: false,
            } => match level {
                1 => "atx_1",
                2 => "atx_2",
                3 => "atx_3",
                4 => "atx_4",
                5 => "atx_5",
                _ => "atx_6",
            },
            NodeKind::Heading { level, setext: true } => {
                if *level <= 1 {
                    "setext_1"
                } else {
                    "setext_2"
                }
            }
            NodeKind::Paragraph => "paragraph",
            NodeKind::BlockQuote => "blockquote",
            NodeKind::OrderedList { .. } => "ordered_list",
            NodeKind::UnorderedList => "unordered_list",
            NodeKind::ListItem => "list_item",
            NodeKind::ListMarker => "list_marker",
            NodeKind::Checkbox => "checkbox",
            NodeKind::CodeBlock => "code_block",
            NodeKind::CodeFence { .. } => "code_fence",
            NodeKind::HtmlBlock => "html_block",
            NodeKind::HorizontalRule => "horizontal_rule",
            NodeKind::LinkDefinition { .. } => "link_definition",
            NodeKind::Table => "table",
            NodeKind::TableHeader => "table_header",
            NodeKind::TableSeparator => "table_separator",
            NodeKind::TableRow => "table_row",
            NodeKind::TableCell => "table_cell",
            NodeKind::Text => "text",
            NodeKind::Whitespace => "whitespace",
            NodeKind::SoftBreak => "eol",
            NodeKind::HardBreak => "hard_line_break",
            NodeKind::Emphasis => "emph",
            NodeKind::Strong => "strong",
            NodeKind::Strikethrough => "strikethrough",
            NodeKind::CodeSpan => "code_span",
            NodeKind::CodeText => "code_text",
            NodeKind::Backtick => "backtick",
            NodeKind::InlineLink { .. } => "inline_link",
            NodeKind::FullReferenceLink { .. } => "full_reference_link",
            NodeKind::ShortReferenceLink { .. } => "short_reference_link",
            NodeKind::Autolink { .. } => "autolink",
            NodeKind::BareUrl => "gfm_autolink",
            NodeKind::LinkText => "link_text",
            NodeKind::LinkLabel => "link_label",
            NodeKind::Image { .. } => "image",
            NodeKind::InlineHtml => "html_tag",
            NodeKind::Delimiter(_) => "delimiter",
            NodeKind::Group(name) => name,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeKind::Text
                | NodeKind::Whitespace
                | NodeKind::SoftBreak
                | NodeKind::HardBreak
                | NodeKind::Emphasis
                | NodeKind::Strong
                | NodeKind::Strikethrough
                | NodeKind::CodeSpan
                | NodeKind::CodeText
                | NodeKind::Backtick
                | NodeKind::InlineLink { .. }
                | NodeKind::FullReferenceLink { .. }
                | NodeKind::ShortReferenceLink { .. }
                | NodeKind::Autolink { .. }
                | NodeKind::BareUrl
                | NodeKind::LinkText
                | NodeKind::LinkLabel
                | NodeKind::Image { .. }
                | NodeKind::InlineHtml
                | NodeKind::Delimiter(_)
        )
    }

    pub fn is_list(&self) -> bool {
        matches!(self, NodeKind::OrderedList { .. } | NodeKind::UnorderedList)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub range: Range<usize>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Arena-backed syntax tree. The root is always the first node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new(root: NodeKind, range: Range<usize>) -> Self {
        Self {
            nodes: vec![Node {
                kind: root,
                range,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root_children().is_empty()
    }

    /// Appends a new last child under `parent`.
    pub fn push(&mut self, parent: NodeId, kind: NodeKind, range: Range<usize>) -> NodeId {
        let len = self.nodes[parent.index()].children.len();
        self.insert_child(parent, len, kind, range)
    }

    /// Inserts a new child under `parent` at `index` (clamped to the child count).
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        kind: NodeKind,
        range: Range<usize>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            range,
            parent: Some(parent),
            children: Vec::new(),
        });
        let children = &mut self.nodes[parent.index()].children;
        let index = index.min(children.len());
        children.insert(index, id);
        id
    }

    pub fn set_range(&mut self, id: NodeId, range: Range<usize>) {
        self.nodes[id.index()].range = range;
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.index()].kind
    }

    /// Unlinks the last child of `parent`. The node stays in the arena but is unreachable.
    pub(crate) fn detach_last_child(&mut self, parent: NodeId) -> Option<NodeId> {
        let child = self.nodes[parent.index()].children.pop()?;
        self.nodes[child.index()].parent = None;
        Some(child)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn range(&self, id: NodeId) -> Range<usize> {
        self.nodes[id.index()].range.clone()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn root_children(&self) -> &[NodeId] {
        self.children(self.root())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn parent_kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.parent(id).map(|p| self.kind(p))
    }

    /// Raw source text covered by `id`. Out-of-range or non-boundary offsets yield `""`.
    pub fn text<'s>(&self, source: &'s str, id: NodeId) -> &'s str {
        source.get(self.range(id)).unwrap_or("")
    }

    pub fn find_child(&self, id: NodeId, pred: impl Fn(&NodeKind) -> bool) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|c| pred(self.kind(*c)))
    }

    /// Pre-order walk of `id` and everything below it.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            ast: self,
            stack: vec![id],
        }
    }

    /// Grows every parent range to cover its children and sorts children by start offset.
    ///
    /// Children always have a larger id than their parent, so a single reverse sweep suffices.
    pub(crate) fn normalize(&mut self) {
        for idx in (1..self.nodes.len()).rev() {
            let range = self.nodes[idx].range.clone();
            if let Some(parent) = self.nodes[idx].parent {
                let p = &mut self.nodes[parent.index()].range;
                if range.start < p.start {
                    p.start = range.start;
                }
                if range.end > p.end {
                    p.end = range.end;
                }
            }
        }
        for idx in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[idx].children);
            children.sort_by_key(|c| self.nodes[c.index()].range.start);
            self.nodes[idx].children = children;
        }
    }

    /// Checks that child ranges nest inside their parent and children are in source order.
    ///
    /// Returns the first offending node.
    pub fn validate(&self) -> Result<(), NodeId> {
        for (idx, node) in self.nodes.iter().enumerate() {
            let mut last_start = node.range.start;
            for child in &node.children {
                let r = &self.nodes[child.index()].range;
                if r.start < node.range.start || r.end > node.range.end || r.start < last_start {
                    return Err(*child);
                }
                last_start = r.start;
            }
            if node.range.start > node.range.end {
                return Err(NodeId(idx as u32));
            }
        }
        Ok(())
    }
}

pub struct Descendants<'a> {
    ast: &'a Ast,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.ast.children(id).iter().rev().copied());
        Some(id)
    }
}
