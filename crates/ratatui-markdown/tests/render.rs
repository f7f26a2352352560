use std::sync::Arc;

use pretty_assertions::assert_eq;
use ratatui_markdown::Element;
use ratatui_markdown::MarkdownOptions;
use ratatui_markdown::PulldownParser;
use ratatui_markdown::RenderedDocument;
use ratatui_markdown::element::Marker;
use ratatui_markdown::entities::decode;
use ratatui_markdown::references::ReferenceLinks;
use ratatui_markdown::render_markdown;
use ratatui_markdown::worker::ParseWorker;

fn render(source: &str) -> RenderedDocument {
    render_markdown(source, &MarkdownOptions::default()).unwrap()
}

/// Elements without the spacers between them.
fn blocks(source: &str) -> Vec<Element> {
    render(source)
        .elements
        .into_iter()
        .filter(|e| !matches!(e, Element::Spacer(_)))
        .collect()
}

fn paragraph_text(element: &Element) -> String {
    match element {
        Element::Paragraph(text) => text.plain(),
        other => panic!("expected a paragraph, got {other:?}"),
    }
}

#[test]
fn decoder_flags_are_independent() {
    assert_eq!(decode("&amp;", true, true), "&");
    assert_eq!(decode("\\*", true, false), "\\*");
    assert_eq!(decode("\\*", false, true), "*");
    assert_eq!(decode("&amp; \\*", false, true), "&amp; *");
    assert_eq!(decode("&unknown;", true, true), "&unknown;");
}

#[test]
fn reference_table_semantics() {
    let mut refs = ReferenceLinks::new();
    refs.store("a", Some("1".into()));
    refs.store("a", Some("2".into()));
    refs.store("n", None);
    assert_eq!(refs.find("a"), "2");
    assert_eq!(refs.find("n"), "n");
    assert_eq!(refs.find("missing"), "missing");
}

#[test]
fn heading_and_paragraph_end_to_end() {
    let doc = render("# Heading\n\nSome **bold** and *italic* text with a [link](http://x.com).");
    let Element::Heading { level, text } = &doc.elements[0] else {
        panic!("expected a heading, got {:?}", doc.elements[0]);
    };
    assert_eq!((*level, text.plain()), (1, "Heading".to_string()));
    assert_eq!(doc.elements[1], Element::Spacer(1));

    let Element::Paragraph(text) = &doc.elements[2] else {
        panic!("expected a paragraph, got {:?}", doc.elements[2]);
    };
    let runs: Vec<&str> = text.runs.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(
        runs,
        ["Some ", "bold", " and ", "italic", " text with a ", "link", "."]
    );
    assert!(text.runs[1].marks.strong);
    assert!(!text.runs[2].marks.strong && !text.runs[2].marks.emphasis);
    assert!(text.runs[3].marks.emphasis);
    assert_eq!(text.runs[4].link, None);
    assert_eq!(
        text.runs[5].link.as_ref().map(|l| l.destination.as_str()),
        Some("http://x.com")
    );
}

#[test]
fn rendering_is_idempotent() {
    let source = "a [b][c] https://d.io ![e](f.png)\n\n[c]: http://c\n";
    assert_eq!(render(source), render(source));
}

#[test]
fn ordered_markers_use_source_numerals() {
    let elements = blocks("1. a\n1. b\n1. c\n");
    let [Element::List(list)] = elements.as_slice() else {
        panic!("expected one list");
    };
    assert!(list.ordered);
    let markers: Vec<&Marker> = list.items.iter().map(|i| &i.marker).collect();
    let one = Marker::Text("1. ".into());
    assert_eq!(markers, vec![&one, &one, &one]);
}

#[test]
fn task_lists_render_checkboxes() {
    let elements = blocks("- [x] done\n- [ ] todo\n");
    let [Element::List(list)] = elements.as_slice() else {
        panic!("expected one list");
    };
    assert_eq!(list.items[0].marker, Marker::Checkbox { checked: true });
    assert_eq!(list.items[1].marker, Marker::Checkbox { checked: false });
    assert_eq!(paragraph_text(&list.items[0].content[0]), "done");
    assert_eq!(paragraph_text(&list.items[1].content[0]), "todo");

    let options = MarkdownOptions::default();
    let lines = render("- [x] done\n- [ ] todo\n").plain_lines(40, &options);
    assert_eq!(lines, vec!["[✓] done", "[ ] todo"]);
}

#[test]
fn short_table_rows_show_only_their_cells() {
    let elements = blocks("| a | b |\n|---|---|\n| only |\n");
    let [Element::Table(table)] = elements.as_slice() else {
        panic!("expected one table");
    };
    let visible = table.rows[0].iter().filter(|c| !c.is_empty()).count();
    assert_eq!(visible, 1);

    let options = MarkdownOptions::default();
    let lines = render("| a | b |\n|---|---|\n| only |\n").plain_lines(80, &options);
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains('│'));
    assert!(!lines[2].contains('│'));
    assert!(lines[2].starts_with(" only"));
}

#[test]
fn nested_quotes_nest_structurally() {
    let elements = blocks("> a\n>\n> > b\n");
    let [Element::BlockQuote(outer)] = elements.as_slice() else {
        panic!("expected one quote, got {elements:?}");
    };
    assert_eq!(paragraph_text(&outer[0]), "a");
    let Element::BlockQuote(inner) = &outer[1] else {
        panic!("expected a nested quote, got {:?}", outer[1]);
    };
    assert_eq!(paragraph_text(&inner[0]), "b");

    let options = MarkdownOptions::default();
    let lines = render("> a\n>\n> > b\n").plain_lines(40, &options);
    assert_eq!(lines, vec!["│ a", "│ │ b"]);
}

#[test]
fn references_resolve_forward_and_exactly() {
    let doc = render("[x][Site] and [y][site]\n\n[site]: https://s.io\n");
    let text = &doc.elements[0];
    assert_eq!(paragraph_text(text), "[x][Site] and y");
    let Element::Paragraph(text) = text else {
        unreachable!();
    };
    let links = text.links();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].1.destination, "https://s.io");
}

#[test]
fn repeated_definitions_resolve_to_the_last() {
    let doc = render("[x][foo]\n\n[foo]: https://a\n[foo]: https://b\n");
    let Element::Paragraph(text) = &doc.elements[0] else {
        panic!("expected a paragraph, got {:?}", doc.elements[0]);
    };
    let links = text.links();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].1.destination, "https://b");
}

#[test]
fn bare_urls_become_links() {
    let doc = render("visit https://example.com today");
    let Element::Paragraph(text) = &doc.elements[0] else {
        panic!("expected a paragraph");
    };
    let links = text.links();
    assert_eq!(links.len(), 1);
    assert_eq!(&text.plain()[links[0].0.clone()], "https://example.com");
    assert_eq!(
        doc.references.lookup("https://example.com"),
        Some("https://example.com")
    );
}

#[test]
fn tables_scroll_as_a_unit() {
    let options = MarkdownOptions::default();
    let doc = render("text\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
    let lines = doc.layout(
        20,
        &options.typography,
        &ratatui_markdown::layout::LayoutContext::from_options(&options),
    );
    assert!(!lines[0].scrollable);
    assert!(lines[2..].iter().all(|l| l.scrollable));
}

#[test]
fn worker_delivers_only_the_newest_parse() {
    let options = MarkdownOptions::default();
    let mut worker = ParseWorker::spawn(Arc::new(PulldownParser)).unwrap();
    for source in ["one", "two", "# three"] {
        worker.submit(source, &options.flavour).unwrap();
    }
    let outcome = worker.wait().unwrap();
    assert_eq!(outcome.generation, worker.latest_generation());
    assert_eq!(outcome.source, "# three");
    let ast = outcome.result.unwrap();
    let doc = ratatui_markdown::MarkdownDocument::from_parts(outcome.source, ast).render(&options);
    assert!(matches!(doc.elements[0], Element::Heading { level: 1, .. }));
}
