use ratatui::style::Style;
use ratatui::text::Span;

/// Syntax highlighting collaborator for code blocks.
///
/// Implementations return one `Vec<Span>` per input line. Returning fewer lines than requested is
/// allowed; missing lines are rendered unhighlighted.
pub trait CodeHighlighter {
    fn highlight_lines(&self, language: Option<&str>, lines: &[&str]) -> Vec<Vec<Span<'static>>>;

    fn highlight_text(&self, language: Option<&str>, text: &str) -> Vec<Vec<Span<'static>>> {
        let lines: Vec<&str> = text.split('\n').collect();
        self.highlight_lines(language, &lines)
    }
}

/// Leaves code as-is, with a default style.
pub struct NoHighlight;

impl CodeHighlighter for NoHighlight {
    fn highlight_lines(&self, _language: Option<&str>, lines: &[&str]) -> Vec<Vec<Span<'static>>> {
        lines
            .iter()
            .map(|l| vec![Span::styled((*l).to_string(), Style::default())])
            .collect()
    }
}
