//! List rendering: markers, task checkboxes, and item content through the block renderer.
use std::sync::Arc;

use crate::ast::NodeId;
use crate::ast::NodeKind;
use crate::block::BlockRenderer;
use crate::element::ListElement;
use crate::element::ListItemElement;
use crate::element::Marker;

/// What the marker function is told about the item it labels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkerContext<'a> {
    /// 0-based position of the item in its list.
    pub index: usize,
    /// 0 for a top-level list.
    pub depth: usize,
    /// The marker as written, e.g. `-`, `*`, `1.` or `3)`.
    pub raw: &'a str,
    pub ordered: bool,
}

pub type ListMarkerFn = Arc<dyn Fn(MarkerContext<'_>) -> String + Send + Sync>;

/// `"• "` for bullets; ordered items repeat the numeral from the source, `"1. "`.
pub fn default_list_marker(ctx: MarkerContext<'_>) -> String {
    if ctx.ordered {
        format!("{} ", ctx.raw)
    } else {
        "• ".to_string()
    }
}

pub fn render_list(renderer: &BlockRenderer<'_>, node: NodeId, depth: usize) -> ListElement {
    let ast = renderer.ast();
    let source = renderer.source();
    let options = renderer.options();
    let ordered = matches!(ast.kind(node), NodeKind::OrderedList { .. });

    let mut items = Vec::new();
    for (index, &item) in ast
        .children(node)
        .iter()
        .filter(|&&c| matches!(ast.kind(c), NodeKind::ListItem))
        .enumerate()
    {
        let children = ast.children(item);
        let mut rest = children;
        let mut raw = "";
        if let Some((&first, tail)) = rest.split_first()
            && matches!(ast.kind(first), NodeKind::ListMarker)
        {
            raw = ast.text(source, first).trim();
            rest = tail;
        }
        let marker = match rest.split_first() {
            Some((&checkbox, tail)) if matches!(ast.kind(checkbox), NodeKind::Checkbox) => {
                rest = tail;
                let token = ast.text(source, checkbox);
                Marker::Checkbox {
                    checked: token.contains(['x', 'X']),
                }
            }
            _ => Marker::Text((options.list_marker)(MarkerContext {
                index,
                depth,
                raw,
                ordered,
            })),
        };

        let content = renderer.nested_list(|| {
            let mut content = Vec::new();
            for &child in rest {
                renderer.render(child, false, !options.show_link_definitions, &mut content);
            }
            content
        });
        items.push(ListItemElement { marker, content });
    }

    ListElement {
        ordered,
        depth,
        indent: u16::try_from(depth)
            .unwrap_or(u16::MAX)
            .saturating_mul(options.list_indent),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Element;
    use crate::parser::Flavour;
    use crate::parser::MarkdownParser;
    use crate::parser::PulldownParser;
    use crate::render::MarkdownOptions;
    use pretty_assertions::assert_eq;

    fn first_list(source: &str, options: &MarkdownOptions) -> ListElement {
        let ast = PulldownParser.parse(source, &Flavour::default()).unwrap();
        let elements = BlockRenderer::new(source, &ast, options).render_document();
        match elements.into_iter().next() {
            Some(Element::List(list)) => list,
            other => panic!("expected a list, got {other:?}"),
        }
    }

    fn markers(list: &ListElement) -> Vec<Marker> {
        list.items.iter().map(|i| i.marker.clone()).collect()
    }

    #[test]
    fn ordered_markers_use_source_numerals() {
        let list = first_list("1. a\n1. b\n1. c\n", &MarkdownOptions::default());
        assert!(list.ordered);
        assert_eq!(
            markers(&list),
            vec![
                Marker::Text("1. ".into()),
                Marker::Text("1. ".into()),
                Marker::Text("1. ".into()),
            ]
        );
    }

    #[test]
    fn task_items_get_checkboxes_not_bullets() {
        let list = first_list("- [x] done\n- [ ] todo\n", &MarkdownOptions::default());
        assert_eq!(
            markers(&list),
            vec![
                Marker::Checkbox { checked: true },
                Marker::Checkbox { checked: false },
            ]
        );
        assert_eq!(list.items[0].content[0].plain_blocks(), vec!["done"]);
        assert_eq!(list.items[1].content[0].plain_blocks(), vec!["todo"]);
    }

    #[test]
    fn uppercase_x_checks() {
        let list = first_list("- [X] yes\n", &MarkdownOptions::default());
        assert_eq!(markers(&list), vec![Marker::Checkbox { checked: true }]);
    }

    #[test]
    fn nested_lists_compound_indent() {
        let options = MarkdownOptions {
            list_indent: 3,
            ..MarkdownOptions::default()
        };
        let list = first_list("- a\n  - b\n    - c\n", &options);
        assert_eq!((list.depth, list.indent), (0, 0));
        let Some(Element::List(nested)) = list.items[0].content.get(1) else {
            panic!("expected nested list in {:?}", list.items[0].content);
        };
        assert_eq!((nested.depth, nested.indent), (1, 3));
        let Some(Element::List(deeper)) = nested.items[0].content.get(1) else {
            panic!("expected nested list in {:?}", nested.items[0].content);
        };
        assert_eq!((deeper.depth, deeper.indent), (2, 6));
    }

    #[test]
    fn item_content_has_no_spacers() {
        let list = first_list("- para one\n\n  para two\n", &MarkdownOptions::default());
        let content = &list.items[0].content;
        assert_eq!(content.len(), 2);
        assert!(content.iter().all(|e| matches!(e, Element::Paragraph(_))));
    }

    #[test]
    fn custom_marker_function_sees_context() {
        let options = MarkdownOptions {
            list_marker: Arc::new(|ctx: MarkerContext<'_>| {
                format!("{}:{}:{} ", ctx.depth, ctx.index, ctx.raw)
            }),
            ..MarkdownOptions::default()
        };
        let list = first_list("* a\n* b\n", &options);
        assert_eq!(
            markers(&list),
            vec![Marker::Text("0:0:* ".into()), Marker::Text("0:1:* ".into())]
        );
    }
}
