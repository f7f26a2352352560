//! The rendered visual tree: what block rendering produces and layout consumes.
use crate::annotated::AnnotatedText;

#[derive(Clone, Debug, PartialEq)]
pub enum Element {
    Heading {
        level: u8,
        text: AnnotatedText,
    },
    Paragraph(AnnotatedText),
    /// Children are laid out behind a quote bar; nested quotes nest structurally.
    BlockQuote(Vec<Element>),
    CodeBlock {
        language: Option<String>,
        lines: Vec<String>,
        fenced: bool,
    },
    List(ListElement),
    Table(TableElement),
    Image(ImageElement),
    Divider,
    /// Blank rows between sibling blocks.
    Spacer(u16),
    LinkDefinition {
        label: String,
        destination: String,
    },
    /// Custom grouping; children are laid out one after another.
    Column(Vec<Element>),
    Html(String),
}

impl Element {
    /// Plain text of this element and its children, one entry per paragraph-like block.
    pub fn plain_blocks(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_plain(&mut out);
        out
    }

    fn collect_plain(&self, out: &mut Vec<String>) {
        match self {
            Element::Heading { text, .. } | Element::Paragraph(text) => out.push(text.plain()),
            Element::BlockQuote(children) | Element::Column(children) => {
                children.iter().for_each(|c| c.collect_plain(out));
            }
            Element::CodeBlock { lines, .. } => out.push(lines.join("\n")),
            Element::List(list) => {
                for item in &list.items {
                    item.content.iter().for_each(|c| c.collect_plain(out));
                }
            }
            Element::Table(table) => {
                for row in std::iter::once(&table.header).chain(table.rows.iter()) {
                    out.push(
                        row.iter()
                            .map(AnnotatedText::plain)
                            .collect::<Vec<_>>()
                            .join(" | "),
                    );
                }
            }
            Element::Image(image) => out.push(image.alt.clone()),
            Element::LinkDefinition { label, destination } => {
                out.push(format!("[{label}]: {destination}"));
            }
            Element::Html(html) => out.push(html.clone()),
            Element::Divider | Element::Spacer(_) => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListElement {
    pub ordered: bool,
    /// 0 for a top-level list.
    pub depth: usize,
    /// Leading columns before the marker, `depth * list_indent`.
    pub indent: u16,
    pub items: Vec<ListItemElement>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ListItemElement {
    pub marker: Marker,
    pub content: Vec<Element>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Marker {
    Text(String),
    /// Task list item; replaces the bullet or numeral.
    Checkbox { checked: bool },
}

impl Marker {
    pub fn display(&self) -> &str {
        match self {
            Marker::Text(text) => text,
            Marker::Checkbox { checked: true } => "[✓] ",
            Marker::Checkbox { checked: false } => "[ ] ",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TableElement {
    /// Number of header cells.
    pub columns: usize,
    pub cell_width: u16,
    pub header: Vec<AnnotatedText>,
    /// Cells as present in the source; rows may be shorter than `columns`.
    pub rows: Vec<Vec<AnnotatedText>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageElement {
    pub destination: String,
    pub alt: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotated::AnnotatedTextBuilder;
    use pretty_assertions::assert_eq;
    use ratatui::style::Style;

    fn text(s: &str) -> AnnotatedText {
        let mut b = AnnotatedTextBuilder::new(Style::default(), Style::default(), Style::default());
        b.append(s);
        b.finish()
    }

    #[test]
    fn plain_blocks_walks_nested_content() {
        let tree = Element::BlockQuote(vec![
            Element::Paragraph(text("outer")),
            Element::List(ListElement {
                ordered: false,
                depth: 0,
                indent: 0,
                items: vec![ListItemElement {
                    marker: Marker::Checkbox { checked: true },
                    content: vec![Element::Paragraph(text("task"))],
                }],
            }),
            Element::Divider,
        ]);
        assert_eq!(tree.plain_blocks(), vec!["outer", "task"]);
    }

    #[test]
    fn checkbox_markers_never_show_bullets() {
        assert_eq!(Marker::Checkbox { checked: true }.display(), "[✓] ");
        assert_eq!(Marker::Checkbox { checked: false }.display(), "[ ] ");
        assert_eq!(Marker::Text("1. ".into()).display(), "1. ");
    }
}
