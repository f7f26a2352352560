//! The component dispatch table: one render function per block category.
//!
//! Every entry is optional. Clearing an entry (or a node with no category at all) routes the
//! node to [`MarkdownComponents::custom`] with its [`NodeKind::tag`]; when that declines too, the
//! block renderer recurses into the node's children.
//!
//! ```rust
//! use std::sync::Arc;
//! use ratatui_markdown::components::ComponentModel;
//! use ratatui_markdown::components::MarkdownComponents;
//! use ratatui_markdown::element::Element;
//!
//! // Render every horizontal rule as two blank rows instead of a divider.
//! let components = MarkdownComponents {
//!     horizontal_rule: Some(Arc::new(|_: &ComponentModel<'_>| Some(Element::Spacer(2)))),
//!     ..MarkdownComponents::default()
//! };
//! # let _ = components;
//! ```
use std::fmt;
use std::sync::Arc;

use ratatui_markdown_core::theme::Typography;

use crate::ast::Ast;
use crate::ast::NodeId;
use crate::ast::NodeKind;
use crate::block::BlockRenderer;
use crate::element::Element;
use crate::element::ImageElement;
use crate::inline::resolve_url;
use crate::list::render_list;
use crate::table::render_table;

/// Everything a component sees while rendering one node.
pub struct ComponentModel<'a> {
    /// The full markdown source.
    pub content: &'a str,
    pub ast: &'a Ast,
    pub node: NodeId,
    pub typography: &'a Typography,
    /// For rendering nested blocks or inline text.
    pub renderer: &'a BlockRenderer<'a>,
}

impl<'a> ComponentModel<'a> {
    pub fn kind(&self) -> &'a NodeKind {
        self.ast.kind(self.node)
    }

    /// Raw source of the node.
    pub fn text(&self) -> &'a str {
        self.ast.text(self.content, self.node)
    }
}

pub type ComponentFn = Arc<dyn Fn(&ComponentModel<'_>) -> Option<Element> + Send + Sync>;

/// Receives the node's tag name; `None` means "not mine".
pub type CustomComponentFn =
    Arc<dyn Fn(&str, &ComponentModel<'_>) -> Option<Element> + Send + Sync>;

#[derive(Clone)]
pub struct MarkdownComponents {
    /// ATX headings, levels 1-6.
    pub heading: Option<ComponentFn>,
    /// Setext headings, levels 1-2.
    pub setext_heading: Option<ComponentFn>,
    pub paragraph: Option<ComponentFn>,
    pub block_quote: Option<ComponentFn>,
    pub ordered_list: Option<ComponentFn>,
    pub unordered_list: Option<ComponentFn>,
    /// Indented code blocks.
    pub code_block: Option<ComponentFn>,
    pub code_fence: Option<ComponentFn>,
    /// A paragraph holding nothing but one image.
    pub image: Option<ComponentFn>,
    pub link_definition: Option<ComponentFn>,
    pub horizontal_rule: Option<ComponentFn>,
    pub table: Option<ComponentFn>,
    pub html_block: Option<ComponentFn>,
    pub custom: Option<CustomComponentFn>,
}

impl Default for MarkdownComponents {
    fn default() -> Self {
        Self {
            heading: Some(Arc::new(heading)),
            setext_heading: Some(Arc::new(heading)),
            paragraph: Some(Arc::new(paragraph)),
            block_quote: Some(Arc::new(block_quote)),
            ordered_list: Some(Arc::new(list)),
            unordered_list: Some(Arc::new(list)),
            code_block: Some(Arc::new(code_block)),
            code_fence: Some(Arc::new(code_block)),
            image: Some(Arc::new(image)),
            link_definition: Some(Arc::new(link_definition)),
            horizontal_rule: Some(Arc::new(|_: &ComponentModel<'_>| Some(Element::Divider))),
            table: Some(Arc::new(table)),
            html_block: Some(Arc::new(html_block)),
            custom: None,
        }
    }
}

impl fmt::Debug for MarkdownComponents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownComponents")
            .field("custom", &self.custom.is_some())
            .finish_non_exhaustive()
    }
}

pub fn heading(model: &ComponentModel<'_>) -> Option<Element> {
    let NodeKind::Heading { level, .. } = model.kind() else {
        return None;
    };
    let text = model
        .renderer
        .inline_text(model.node, model.typography.heading(*level));
    (!text.is_empty()).then(|| Element::Heading {
        level: *level,
        text,
    })
}

pub fn paragraph(model: &ComponentModel<'_>) -> Option<Element> {
    let t = model.typography;
    let base = if model.renderer.in_block_quote(model.node) {
        t.body.patch(t.quote)
    } else {
        t.body
    };
    let text = model.renderer.inline_text(model.node, base);
    (!text.is_empty()).then_some(Element::Paragraph(text))
}

pub fn block_quote(model: &ComponentModel<'_>) -> Option<Element> {
    Some(Element::BlockQuote(
        model.renderer.render_children(model.node, false),
    ))
}

pub fn list(model: &ComponentModel<'_>) -> Option<Element> {
    let depth = model.renderer.list_depth();
    Some(Element::List(render_list(model.renderer, model.node, depth)))
}

pub fn code_block(model: &ComponentModel<'_>) -> Option<Element> {
    let (language, fenced) = match model.kind() {
        NodeKind::CodeFence { info } => (
            info.split_whitespace().next().map(str::to_string),
            true,
        ),
        _ => (None, false),
    };
    let mut code = String::new();
    for &child in model.ast.children(model.node) {
        code.push_str(model.ast.text(model.content, child));
    }
    let code = code.strip_suffix('\n').unwrap_or(&code);
    let lines = if code.is_empty() {
        Vec::new()
    } else {
        code.split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect()
    };
    Some(Element::CodeBlock {
        language,
        lines,
        fenced,
    })
}

pub fn image(model: &ComponentModel<'_>) -> Option<Element> {
    let ast = model.ast;
    let id = ast.find_child(model.node, |k| matches!(k, NodeKind::Image { .. }))?;
    let NodeKind::Image { destination, .. } = ast.kind(id) else {
        return None;
    };
    if destination.is_empty() {
        return None;
    }
    let alt = model.renderer.inline_text(id, model.typography.body).plain();
    Some(Element::Image(ImageElement {
        destination: resolve_url(model.renderer.options().base_url.as_deref(), destination),
        alt,
    }))
}

pub fn link_definition(model: &ComponentModel<'_>) -> Option<Element> {
    let NodeKind::LinkDefinition {
        label, destination, ..
    } = model.kind()
    else {
        return None;
    };
    Some(Element::LinkDefinition {
        label: label.clone(),
        destination: destination.clone(),
    })
}

pub fn table(model: &ComponentModel<'_>) -> Option<Element> {
    Some(Element::Table(render_table(model.renderer, model.node)))
}

pub fn html_block(model: &ComponentModel<'_>) -> Option<Element> {
    let mut html = String::new();
    for &child in model.ast.children(model.node) {
        html.push_str(model.ast.text(model.content, child));
    }
    let html = html.trim_end();
    (!html.is_empty()).then(|| Element::Html(html.to_string()))
}
