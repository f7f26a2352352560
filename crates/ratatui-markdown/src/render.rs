//! Top-level entry points: options, parsed documents, and the one-call `render_markdown`.
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use ratatui::text::Text;
use ratatui_markdown_core::theme::Typography;
use tracing::debug;
use tracing::warn;

use crate::annotated::LinkListener;
use crate::ast::Ast;
use crate::block::BlockRenderer;
use crate::components::MarkdownComponents;
use crate::element::Element;
use crate::error::ParseError;
use crate::inline::InlineIntercept;
use crate::layout::LayoutContext;
use crate::layout::RenderedLine;
use crate::layout::layout_elements;
use crate::layout::lines_to_text;
use crate::list::ListMarkerFn;
use crate::list::default_list_marker;
use crate::parser::Flavour;
use crate::parser::MarkdownParser;
use crate::parser::PulldownParser;
use crate::references::ReferenceLinks;

/// Render configuration.
///
/// Options that affect parsing (`flavour`, `parser`) need a re-parse when changed; everything
/// else applies on the next render pass.
#[derive(Clone)]
pub struct MarkdownOptions {
    pub flavour: Flavour,
    pub parser: Arc<dyn MarkdownParser>,
    pub typography: Typography,
    pub components: MarkdownComponents,
    pub process_entities: bool,
    pub process_escapes: bool,
    /// Soft line breaks become real line breaks instead of spaces.
    pub eol_as_newline: bool,
    /// Blank rows between top-level blocks.
    pub block_spacing: u16,
    /// Columns added per list nesting level.
    pub list_indent: u16,
    pub table_cell_width: u16,
    pub show_link_definitions: bool,
    pub list_marker: ListMarkerFn,
    /// Relative link and image destinations are resolved against this.
    pub base_url: Option<String>,
    pub code_block_indent: u16,
    pub blockquote_prefix: String,
    pub link_listener: Option<LinkListener>,
    pub inline_intercept: Option<InlineIntercept>,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            flavour: Flavour::default(),
            parser: Arc::new(PulldownParser),
            typography: Typography::default(),
            components: MarkdownComponents::default(),
            process_entities: true,
            process_escapes: true,
            eol_as_newline: false,
            block_spacing: 1,
            list_indent: 2,
            table_cell_width: 16,
            show_link_definitions: false,
            list_marker: Arc::new(default_list_marker),
            base_url: None,
            code_block_indent: 4,
            blockquote_prefix: "│ ".to_string(),
            link_listener: None,
            inline_intercept: None,
        }
    }
}

impl fmt::Debug for MarkdownOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkdownOptions")
            .field("flavour", &self.flavour)
            .field("typography", &self.typography)
            .field("components", &self.components)
            .field("process_entities", &self.process_entities)
            .field("process_escapes", &self.process_escapes)
            .field("eol_as_newline", &self.eol_as_newline)
            .field("block_spacing", &self.block_spacing)
            .field("list_indent", &self.list_indent)
            .field("table_cell_width", &self.table_cell_width)
            .field("show_link_definitions", &self.show_link_definitions)
            .field("base_url", &self.base_url)
            .field("code_block_indent", &self.code_block_indent)
            .field("blockquote_prefix", &self.blockquote_prefix)
            .finish_non_exhaustive()
    }
}

/// Parsed markdown, ready to be rendered any number of times.
#[derive(Clone, Debug)]
pub struct MarkdownDocument {
    source: String,
    ast: Ast,
}

impl MarkdownDocument {
    pub fn parse(source: impl Into<String>, options: &MarkdownOptions) -> Result<Self, ParseError> {
        let source = source.into();
        let ast = options
            .parser
            .parse(&source, &options.flavour)
            .inspect_err(|err| warn!(%err, len = source.len(), "markdown parse failed"))?;
        Ok(Self { source, ast })
    }

    /// Wraps a tree produced elsewhere, e.g. by the background worker.
    pub fn from_parts(source: String, ast: Ast) -> Self {
        Self { source, ast }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    /// One render pass: fresh reference table, element tree out.
    pub fn render(&self, options: &MarkdownOptions) -> RenderedDocument {
        let started = Instant::now();
        let renderer = BlockRenderer::new(&self.source, &self.ast, options);
        let elements = renderer.render_document();
        let references = renderer.into_references();
        debug!(
            elements = elements.len(),
            references = references.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "rendered markdown"
        );
        RenderedDocument {
            elements,
            references,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RenderedDocument {
    pub elements: Vec<Element>,
    /// The pass's reference table, autolinks included.
    pub references: ReferenceLinks,
}

impl RenderedDocument {
    pub fn layout(
        &self,
        width: u16,
        typography: &Typography,
        ctx: &LayoutContext<'_>,
    ) -> Vec<RenderedLine> {
        layout_elements(&self.elements, width, typography, ctx)
    }

    pub fn to_text(&self, width: u16, options: &MarkdownOptions) -> Text<'static> {
        let lines = self.layout(width, &options.typography, &LayoutContext::from_options(options));
        lines_to_text(&lines)
    }

    pub fn plain_lines(&self, width: u16, options: &MarkdownOptions) -> Vec<String> {
        self.layout(width, &options.typography, &LayoutContext::from_options(options))
            .into_iter()
            .map(|l| l.plain)
            .collect()
    }
}

/// Parses and renders `source` in one go.
pub fn render_markdown(
    source: &str,
    options: &MarkdownOptions,
) -> Result<RenderedDocument, ParseError> {
    Ok(MarkdownDocument::parse(source, options)?.render(options))
}
