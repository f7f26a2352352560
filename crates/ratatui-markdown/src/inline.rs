//! Inline rich-text building: walks an inline subtree and produces [`AnnotatedText`].
use std::cell::RefCell;
use std::sync::Arc;

use ratatui::style::Style;
use tracing::trace;
use url::Url;

use crate::annotated::AnnotatedText;
use crate::annotated::AnnotatedTextBuilder;
use crate::annotated::IMAGE_TAG_PREFIX;
use crate::annotated::InlineObject;
use crate::annotated::InlineObjectKind;
use crate::annotated::InlineStyle;
use crate::annotated::LinkAnnotation;
use crate::annotated::LinkListener;
use crate::ast::Ast;
use crate::ast::NodeId;
use crate::ast::NodeKind;
use crate::entities::decode_cow;
use crate::parser::bare_url_destination;
use crate::references::ReferenceLinks;

/// What an intercept hook can see besides the node it is offered.
pub struct InlineContext<'a> {
    pub source: &'a str,
    pub ast: &'a Ast,
}

/// Returning `true` claims the node: default handling is skipped for it.
pub type InlineIntercept =
    Arc<dyn Fn(&InlineContext<'_>, NodeId, &mut AnnotatedTextBuilder) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct InlineSettings<'a> {
    pub base_style: Style,
    pub link_style: Style,
    pub code_style: Style,
    pub intercept: Option<InlineIntercept>,
    /// Autolinks register themselves here while building.
    pub references: &'a RefCell<ReferenceLinks>,
    pub listener: Option<LinkListener>,
    pub eol_as_newline: bool,
    pub process_entities: bool,
    pub process_escapes: bool,
    /// Relative link and image destinations are joined onto this.
    pub base_url: Option<&'a str>,
}

impl<'a> InlineSettings<'a> {
    pub fn new(references: &'a RefCell<ReferenceLinks>) -> Self {
        Self {
            base_style: Style::default(),
            link_style: Style::default(),
            code_style: Style::default(),
            intercept: None,
            references,
            listener: None,
            eol_as_newline: false,
            process_entities: true,
            process_escapes: true,
            base_url: None,
        }
    }
}

/// Builds the children of `root` into a single annotated text.
pub fn build(source: &str, ast: &Ast, root: NodeId, settings: &InlineSettings<'_>) -> AnnotatedText {
    let walker = walk(source, ast, root, settings);
    let (pushes, pops) = walker.out.balance();
    trace!(
        empty = walker.out.is_empty(),
        pushes,
        pops,
        images = walker.images,
        "built inline text"
    );
    walker.out.finish()
}

fn walk<'a>(
    source: &'a str,
    ast: &'a Ast,
    root: NodeId,
    settings: &'a InlineSettings<'a>,
) -> Walker<'a> {
    let mut walker = Walker {
        source,
        ast,
        settings,
        out: AnnotatedTextBuilder::new(
            settings.base_style,
            settings.link_style,
            settings.code_style,
        ),
        images: 0,
    };
    walker.children(root);
    walker
}

struct Walker<'a> {
    source: &'a str,
    ast: &'a Ast,
    settings: &'a InlineSettings<'a>,
    out: AnnotatedTextBuilder,
    images: usize,
}

impl<'a> Walker<'a> {
    fn scoped(&mut self, style: InlineStyle, f: impl FnOnce(&mut Self)) {
        self.out.push_style(style);
        f(self);
        self.out.pop_style();
    }

    fn children(&mut self, parent: NodeId) {
        let ast = self.ast;
        self.nodes(ast.children(parent));
    }

    fn nodes(&mut self, ids: &[NodeId]) {
        let ctx = InlineContext {
            source: self.source,
            ast: self.ast,
        };
        let mut skip_soft_break = false;
        for &id in ids {
            if let Some(intercept) = &self.settings.intercept
                && intercept(&ctx, id, &mut self.out)
            {
                skip_soft_break = false;
                continue;
            }
            let kind = ctx.ast.kind(id);
            if std::mem::take(&mut skip_soft_break) && matches!(kind, NodeKind::SoftBreak) {
                continue;
            }
            self.node(id);
            skip_soft_break = matches!(kind, NodeKind::HardBreak);
        }
    }

    fn node(&mut self, id: NodeId) {
        let ast = self.ast;
        let settings = self.settings;
        match ast.kind(id) {
            NodeKind::Paragraph => self.children(id),
            NodeKind::Image { destination, .. } => {
                if destination.is_empty() {
                    return;
                }
                let tag = format!("{IMAGE_TAG_PREFIX}{}", self.images);
                self.images += 1;
                let object = InlineObject {
                    kind: InlineObjectKind::Image,
                    destination: resolve_url(settings.base_url, destination),
                    alt: alt_text(self.source, ast, id, settings),
                };
                self.out.append_object(tag, object);
            }
            NodeKind::Emphasis => self.scoped(InlineStyle::Italic, |w| w.children(id)),
            NodeKind::Strong => self.scoped(InlineStyle::Bold, |w| w.children(id)),
            NodeKind::Strikethrough => self.scoped(InlineStyle::Strikethrough, |w| w.children(id)),
            NodeKind::CodeSpan => self.scoped(InlineStyle::Code, |w| {
                w.out.append(" ");
                for &child in ast.children(id) {
                    match ast.kind(child) {
                        NodeKind::Backtick => {}
                        NodeKind::CodeText => w.out.append(&code_text(ast.text(w.source, child))),
                        _ => w.node(child),
                    }
                }
                w.out.append(" ");
            }),
            NodeKind::Autolink { url } => {
                let destination = if url.contains(':') {
                    url.clone()
                } else {
                    format!("mailto:{url}")
                };
                settings
                    .references
                    .borrow_mut()
                    .store(url.clone(), Some(destination.clone()));
                self.link_run(destination, url);
            }
            NodeKind::BareUrl => {
                let text = ast.text(self.source, id);
                let destination = bare_url_destination(text);
                settings
                    .references
                    .borrow_mut()
                    .store(text, Some(destination.clone()));
                self.link_run(destination, text);
            }
            NodeKind::InlineLink { destination, .. } => {
                if destination.trim().is_empty() {
                    self.link_text(id);
                } else {
                    let destination = resolve_url(settings.base_url, destination);
                    self.link(id, destination);
                }
            }
            NodeKind::FullReferenceLink { label } | NodeKind::ShortReferenceLink { label } => {
                let found = settings
                    .references
                    .borrow()
                    .lookup(label)
                    .map(|d| resolve_url(settings.base_url, d));
                match found {
                    Some(destination) if !label.is_empty() => self.link(id, destination),
                    _ => self.out.append(ast.text(self.source, id)),
                }
            }
            NodeKind::Text => {
                let raw = ast.text(self.source, id);
                let text = decode_cow(raw, settings.process_entities, settings.process_escapes);
                // Nothing emitted yet, e.g. after a skipped image.
                if self.out.is_empty() {
                    self.out.append(text.trim_start());
                } else {
                    self.out.append(&text);
                }
            }
            NodeKind::Delimiter(c) => {
                let mut buf = [0u8; 4];
                self.out.append(c.encode_utf8(&mut buf));
            }
            NodeKind::Backtick | NodeKind::CodeText => self.out.append(ast.text(self.source, id)),
            NodeKind::HardBreak => self.out.append("\n"),
            NodeKind::SoftBreak => {
                self.out
                    .append(if settings.eol_as_newline { "\n" } else { " " });
            }
            NodeKind::Whitespace => {
                if !self.out.is_empty() {
                    self.out.append(" ");
                }
            }
            NodeKind::InlineHtml
            | NodeKind::LinkLabel
            | NodeKind::ListMarker
            | NodeKind::Checkbox
            | NodeKind::LinkDefinition { .. } => {}
            _ => self.children(id),
        }
    }

    fn link(&mut self, id: NodeId, destination: String) {
        let annotation =
            LinkAnnotation::new(destination).with_listener(self.settings.listener.clone());
        self.scoped(InlineStyle::Link(annotation), |w| w.link_text(id));
    }

    fn link_run(&mut self, destination: String, text: &str) {
        let annotation =
            LinkAnnotation::new(destination).with_listener(self.settings.listener.clone());
        self.scoped(InlineStyle::Link(annotation), |w| w.out.append(text));
    }

    /// Content of a link's `LinkText` child without the surrounding brackets.
    fn link_text(&mut self, link: NodeId) {
        let ast = self.ast;
        let Some(text) = ast.find_child(link, |k| matches!(k, NodeKind::LinkText)) else {
            self.children(link);
            return;
        };
        let kids = ast.children(text);
        let start = usize::from(matches!(
            kids.first().map(|k| ast.kind(*k)),
            Some(NodeKind::Delimiter('['))
        ));
        let mut end = kids.len();
        if end > start && matches!(ast.kind(kids[end - 1]), NodeKind::Delimiter(']')) {
            end -= 1;
        }
        self.nodes(&kids[start..end]);
    }
}

fn code_text(raw: &str) -> String {
    raw.replace("\r\n", " ").replace('\n', " ")
}

fn alt_text(source: &str, ast: &Ast, image: NodeId, settings: &InlineSettings<'_>) -> String {
    let mut out = String::new();
    for id in ast.descendants(image).skip(1) {
        match ast.kind(id) {
            NodeKind::Text => out.push_str(&decode_cow(
                ast.text(source, id),
                settings.process_entities,
                settings.process_escapes,
            )),
            NodeKind::CodeText | NodeKind::BareUrl => out.push_str(ast.text(source, id)),
            NodeKind::Delimiter(c) => out.push(*c),
            NodeKind::Whitespace | NodeKind::SoftBreak | NodeKind::HardBreak => out.push(' '),
            _ => {}
        }
    }
    out
}

/// Joins a relative destination onto `base_url`; absolute destinations and anchors pass through.
pub(crate) fn resolve_url(base_url: Option<&str>, dest: &str) -> String {
    let dest = dest.trim();
    if dest.is_empty() || is_absolute_url(dest) {
        return dest.to_string();
    }
    let Some(base) = base_url.map(str::trim).filter(|s| !s.is_empty()) else {
        return dest.to_string();
    };
    if let Ok(base) = Url::parse(base) {
        return base
            .join(dest)
            .map(|u| u.to_string())
            .unwrap_or_else(|_| dest.to_string());
    }
    let base = base.trim_end_matches(['/', '\\']);
    let dest = dest.trim_start_matches("./").trim_start_matches('/');
    format!("{base}/{dest}")
}

fn is_absolute_url(dest: &str) -> bool {
    dest.starts_with('#')
        || dest.starts_with('/')
        || Url::parse(dest).is_ok_and(|u| !u.cannot_be_a_base() || u.scheme() == "mailto")
}
