//! Block rendering: walks the tree and dispatches each block node to its component.
use std::cell::Cell;
use std::cell::RefCell;

use ratatui::style::Style;
use tracing::trace;

use crate::annotated::AnnotatedText;
use crate::ast::Ast;
use crate::ast::NodeId;
use crate::ast::NodeKind;
use crate::components::ComponentFn;
use crate::components::ComponentModel;
use crate::element::Element;
use crate::inline;
use crate::inline::InlineSettings;
use crate::references::ReferenceLinks;
use crate::render::MarkdownOptions;

/// State for one render pass over a parsed document.
///
/// The reference table is collected from the whole tree when the renderer is created, so
/// references resolve no matter where their definition sits. It is owned by the pass and
/// dropped (or handed out with [`Self::into_references`]) when the pass ends.
pub struct BlockRenderer<'a> {
    source: &'a str,
    ast: &'a Ast,
    options: &'a MarkdownOptions,
    references: RefCell<ReferenceLinks>,
    list_depth: Cell<usize>,
}

impl<'a> BlockRenderer<'a> {
    pub fn new(source: &'a str, ast: &'a Ast, options: &'a MarkdownOptions) -> Self {
        Self {
            source,
            ast,
            options,
            references: RefCell::new(ReferenceLinks::collect(ast)),
            list_depth: Cell::new(0),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    pub fn ast(&self) -> &'a Ast {
        self.ast
    }

    pub fn options(&self) -> &'a MarkdownOptions {
        self.options
    }

    /// The table as it stands, including autolinks registered so far.
    pub fn references(&self) -> ReferenceLinks {
        self.references.borrow().clone()
    }

    pub fn into_references(self) -> ReferenceLinks {
        self.references.into_inner()
    }

    /// Nesting depth of the list currently being rendered; 0 outside lists.
    pub fn list_depth(&self) -> usize {
        self.list_depth.get()
    }

    /// Runs `f` one list level deeper.
    pub(crate) fn nested_list<R>(&self, f: impl FnOnce() -> R) -> R {
        let depth = self.list_depth.get();
        self.list_depth.set(depth + 1);
        let out = f();
        self.list_depth.set(depth);
        out
    }

    pub fn in_block_quote(&self, node: NodeId) -> bool {
        let mut cur = self.ast.parent(node);
        while let Some(id) = cur {
            if matches!(self.ast.kind(id), NodeKind::BlockQuote) {
                return true;
            }
            cur = self.ast.parent(id);
        }
        false
    }

    /// Renders the whole document.
    pub fn render_document(&self) -> Vec<Element> {
        self.render_children(self.ast.root(), true)
    }

    /// Renders the children of `parent`, with spacers between siblings when `include_spacing`.
    pub fn render_children(&self, parent: NodeId, include_spacing: bool) -> Vec<Element> {
        let skip_link_definitions = !self.options.show_link_definitions;
        let mut out = Vec::new();
        for &child in self.ast.children(parent) {
            let before = out.len();
            let rendered = self.render(child, include_spacing, skip_link_definitions, &mut out);
            if rendered && include_spacing && before > 0 && self.options.block_spacing > 0 {
                out.insert(before, Element::Spacer(self.options.block_spacing));
            }
        }
        out
    }

    /// Renders one block node into `out`; returns whether anything was emitted.
    pub fn render(
        &self,
        node: NodeId,
        include_spacing: bool,
        skip_link_definitions: bool,
        out: &mut Vec<Element>,
    ) -> bool {
        let kind = self.ast.kind(node);
        if skip_link_definitions && matches!(kind, NodeKind::LinkDefinition { .. }) {
            return false;
        }
        let model = ComponentModel {
            content: self.source,
            ast: self.ast,
            node,
            typography: &self.options.typography,
            renderer: self,
        };
        if let Some(component) = self.component_for(node) {
            return match component(&model) {
                Some(element) => {
                    out.push(element);
                    true
                }
                None => false,
            };
        }
        let tag = kind.tag();
        if let Some(custom) = &self.options.components.custom
            && let Some(element) = custom(tag, &model)
        {
            out.push(element);
            return true;
        }
        trace!(tag, "no component, rendering children");
        let children = self.render_children(node, include_spacing);
        let rendered = !children.is_empty();
        out.extend(children);
        rendered
    }

    fn component_for(&self, node: NodeId) -> Option<&'a ComponentFn> {
        let c = &self.options.components;
        let entry = match self.ast.kind(node) {
            NodeKind::Heading { setext: false, .. } => &c.heading,
            NodeKind::Heading { setext: true, .. } => &c.setext_heading,
            NodeKind::Paragraph if self.is_image_paragraph(node) => &c.image,
            NodeKind::Paragraph => &c.paragraph,
            NodeKind::BlockQuote => &c.block_quote,
            NodeKind::OrderedList { .. } => &c.ordered_list,
            NodeKind::UnorderedList => &c.unordered_list,
            NodeKind::CodeBlock => &c.code_block,
            NodeKind::CodeFence { .. } => &c.code_fence,
            NodeKind::LinkDefinition { .. } => &c.link_definition,
            NodeKind::HorizontalRule => &c.horizontal_rule,
            NodeKind::Table => &c.table,
            NodeKind::HtmlBlock => &c.html_block,
            _ => return None,
        };
        entry.as_ref()
    }

    /// A paragraph whose only content is a single image.
    pub fn is_image_paragraph(&self, node: NodeId) -> bool {
        let mut content = self.ast.children(node).iter().filter(|&&c| {
            !matches!(
                self.ast.kind(c),
                NodeKind::Whitespace | NodeKind::SoftBreak | NodeKind::HardBreak
            )
        });
        matches!(
            (content.next().map(|&c| self.ast.kind(c)), content.next()),
            (Some(NodeKind::Image { .. }), None)
        )
    }

    /// Inline text of `node`'s children over `base_style`.
    pub fn inline_text(&self, node: NodeId, base_style: Style) -> AnnotatedText {
        self.inline_text_with(node, base_style, self.options.eol_as_newline)
    }

    pub fn inline_text_with(
        &self,
        node: NodeId,
        base_style: Style,
        eol_as_newline: bool,
    ) -> AnnotatedText {
        let t = &self.options.typography;
        let settings = InlineSettings {
            base_style,
            link_style: t.link,
            code_style: t.code,
            intercept: self.options.inline_intercept.clone(),
            references: &self.references,
            listener: self.options.link_listener.clone(),
            eol_as_newline,
            process_entities: self.options.process_entities,
            process_escapes: self.options.process_escapes,
            base_url: self.options.base_url.as_deref(),
        };
        inline::build(self.source, self.ast, node, &settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::MarkdownComponents;
    use crate::parser::Flavour;
    use crate::parser::MarkdownParser;
    use crate::parser::PulldownParser;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn render(source: &str, options: &MarkdownOptions) -> Vec<Element> {
        let ast = PulldownParser
            .parse(source, &Flavour::default())
            .unwrap();
        BlockRenderer::new(source, &ast, options).render_document()
    }

    fn shape(elements: &[Element]) -> Vec<&'static str> {
        elements
            .iter()
            .map(|e| match e {
                Element::Heading { .. } => "heading",
                Element::Paragraph(_) => "paragraph",
                Element::BlockQuote(_) => "quote",
                Element::CodeBlock { .. } => "code",
                Element::List(_) => "list",
                Element::Table(_) => "table",
                Element::Image(_) => "image",
                Element::Divider => "divider",
                Element::Spacer(_) => "spacer",
                Element::LinkDefinition { .. } => "definition",
                Element::Column(_) => "column",
                Element::Html(_) => "html",
            })
            .collect()
    }

    #[test]
    fn spacers_between_top_level_blocks() {
        let elements = render("# T\n\npara\n\n---\n", &MarkdownOptions::default());
        assert_eq!(
            shape(&elements),
            vec!["heading", "spacer", "paragraph", "spacer", "divider"]
        );
    }

    #[test]
    fn nested_quotes_keep_structure_without_spacers() {
        let elements = render("> a\n>\n> > b\n>\n> c\n", &MarkdownOptions::default());
        let [Element::BlockQuote(outer)] = elements.as_slice() else {
            panic!("expected one quote, got {elements:?}");
        };
        assert_eq!(shape(outer), vec!["paragraph", "quote", "paragraph"]);
        let Element::BlockQuote(inner) = &outer[1] else {
            unreachable!();
        };
        assert_eq!(inner[0].plain_blocks(), vec!["b"]);
    }

    #[test]
    fn link_definitions_hidden_unless_enabled() {
        let source = "[a]: https://a.io\n\ntext\n";
        assert_eq!(shape(&render(source, &MarkdownOptions::default())), vec!["paragraph"]);
        let shown = MarkdownOptions {
            show_link_definitions: true,
            ..MarkdownOptions::default()
        };
        let elements = render(source, &shown);
        assert_eq!(shape(&elements), vec!["definition", "spacer", "paragraph"]);
        assert_eq!(
            elements[0],
            Element::LinkDefinition {
                label: "a".into(),
                destination: "https://a.io".into()
            }
        );
    }

    #[test]
    fn image_paragraph_becomes_image_element() {
        let elements = render(
            "![alt text](pic.png)\n\nsee ![x](y.png)\n",
            &MarkdownOptions::default(),
        );
        assert_eq!(shape(&elements), vec!["image", "spacer", "paragraph"]);
        let Element::Image(image) = &elements[0] else {
            unreachable!();
        };
        assert_eq!(image.alt, "alt text");
        assert_eq!(image.destination, "pic.png");
    }

    #[test]
    fn code_blocks_keep_lines_and_language() {
        let elements = render(
            "```rust extra\nfn a() {}\n\nlet b;\n```\n\n    indented\n",
            &MarkdownOptions::default(),
        );
        assert_eq!(
            elements[0],
            Element::CodeBlock {
                language: Some("rust".into()),
                lines: vec!["fn a() {}".into(), String::new(), "let b;".into()],
                fenced: true,
            }
        );
        let Element::CodeBlock { lines, fenced, .. } = &elements[2] else {
            panic!("expected code, got {:?}", elements[2]);
        };
        assert!(!fenced);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].trim(), "indented");
    }

    #[test]
    fn cleared_entry_falls_back_to_custom_then_children() {
        let options = MarkdownOptions {
            components: MarkdownComponents {
                block_quote: None,
                custom: Some(Arc::new(|tag: &str, _: &ComponentModel<'_>| {
                    (tag == "horizontal_rule").then_some(Element::Spacer(7))
                })),
                horizontal_rule: None,
                ..MarkdownComponents::default()
            },
            ..MarkdownOptions::default()
        };
        let elements = render("> inside\n\n***\n", &options);
        assert_eq!(shape(&elements), vec!["paragraph", "spacer", "spacer"]);
        assert_eq!(elements[2], Element::Spacer(7));
    }

    #[test]
    fn references_table_includes_autolinks_after_pass() {
        let source = "go to https://rust-lang.org\n";
        let ast = PulldownParser.parse(source, &Flavour::default()).unwrap();
        let options = MarkdownOptions::default();
        let renderer = BlockRenderer::new(source, &ast, &options);
        renderer.render_document();
        assert_eq!(
            renderer.into_references().lookup("https://rust-lang.org"),
            Some("https://rust-lang.org")
        );
    }
}
