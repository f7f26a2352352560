use crate::annotated::AnnotatedText;
use crate::ast::NodeId;
use crate::ast::NodeKind;
use crate::block::BlockRenderer;
use crate::element::TableElement;

/// Builds a table from its header and rows.
///
/// The separator row is structure only and never becomes content. Rows keep exactly the cells
/// present in the source; short rows are not padded and long rows are not cut. Cell text is
/// built on one line, line endings become spaces.
pub fn render_table(renderer: &BlockRenderer<'_>, node: NodeId) -> TableElement {
    let ast = renderer.ast();
    let t = &renderer.options().typography;

    let cells = |row: NodeId, style| -> Vec<AnnotatedText> {
        ast.children(row)
            .iter()
            .filter(|&&c| matches!(ast.kind(c), NodeKind::TableCell))
            .map(|&c| renderer.inline_text_with(c, style, false))
            .collect()
    };

    let mut header = Vec::new();
    let mut rows = Vec::new();
    for &child in ast.children(node) {
        match ast.kind(child) {
            NodeKind::TableHeader => header = cells(child, t.table_header),
            NodeKind::TableRow => rows.push(cells(child, t.table_body)),
            _ => {}
        }
    }

    TableElement {
        columns: header.len(),
        cell_width: renderer.options().table_cell_width,
        header,
        rows,
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

    fn first_table(source: &str) -> TableElement {
        let ast = PulldownParser.parse(source, &Flavour::default()).unwrap();
        let options = MarkdownOptions::default();
        let elements = BlockRenderer::new(source, &ast, &options).render_document();
        match elements.into_iter().next() {
            Some(Element::Table(table)) => table,
            other => panic!("expected a table, got {other:?}"),
        }
    }

    fn plain_rows(table: &TableElement) -> Vec<Vec<String>> {
        table
            .rows
            .iter()
            .map(|r| r.iter().map(AnnotatedText::plain).collect())
            .collect()
    }

    #[test]
    fn header_and_rows() {
        let table = first_table("| a | b |\n|---|:-:|\n| 1 | **2** |\n");
        assert_eq!(table.columns, 2);
        assert_eq!(
            table.header.iter().map(AnnotatedText::plain).collect::<Vec<_>>(),
            vec!["a", "b"]
        );
        assert_eq!(plain_rows(&table), vec![vec!["1", "2"]]);
        assert!(table.rows[0][1].runs[0].marks.strong);
    }

    #[test]
    fn short_rows_are_not_padded() {
        let table = first_table("| a | b |\n|---|---|\n| only |\n");
        let row = &table.rows[0];
        let visible = row.iter().filter(|c| !c.is_empty()).count();
        assert_eq!(visible, 1);
        assert_eq!(row[0].plain(), "only");
    }

    #[test]
    fn long_rows_keep_every_cell() {
        let table = first_table("| a | b |\n|---|---|\n| 1 | 2 | 3 |\n| x | y |  z\\|w  |\n");
        assert_eq!(table.columns, 2);
        assert_eq!(
            plain_rows(&table),
            vec![vec!["1", "2", "3"], vec!["x", "y", "z|w"]]
        );
    }

    #[test]
    fn separator_is_not_content() {
        let table = first_table("| a |\n|---|\n| x |\n| y |\n");
        assert_eq!(plain_rows(&table), vec![vec!["x"], vec!["y"]]);
    }
}
