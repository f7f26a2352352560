use ratatui::style::Modifier;
use ratatui::style::Style;

/// Styles for every block and inline category the markdown renderer emits.
///
/// A render pass only ever reads this. Heading styles are indexed by level (1-6); levels outside
/// that range clamp to the nearest valid one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Typography {
    pub headings: [Style; 6],
    pub body: Style,
    pub code: Style,
    pub code_block: Style,
    pub quote: Style,
    pub link: Style,
    pub table_header: Style,
    pub table_body: Style,
    pub checkbox: Style,
    pub muted: Style,
    pub accent: Style,
    pub error: Style,
}

impl Default for Typography {
    fn default() -> Self {
        use ratatui::style::Stylize;

        let heading = Style::default().add_modifier(Modifier::BOLD);
        Self {
            headings: [
                heading.add_modifier(Modifier::UNDERLINED),
                heading,
                heading,
                heading,
                heading,
                heading.add_modifier(Modifier::ITALIC),
            ],
            body: Style::default(),
            code: Style::default().cyan(),
            code_block: Style::default().cyan(),
            quote: Style::default().dark_gray(),
            link: Style::default().cyan().add_modifier(Modifier::UNDERLINED),
            table_header: Style::default().add_modifier(Modifier::BOLD),
            table_body: Style::default(),
            checkbox: Style::default().cyan(),
            muted: Style::default().dark_gray(),
            accent: Style::default().cyan(),
            error: Style::default().red(),
        }
    }
}

impl Typography {
    pub fn heading(&self, level: u8) -> Style {
        let idx = usize::from(level.clamp(1, 6)) - 1;
        self.headings[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels_clamp() {
        let t = Typography::default();
        assert_eq!(t.heading(0), t.headings[0]);
        assert_eq!(t.heading(9), t.headings[5]);
        assert!(t.heading(1).add_modifier.contains(Modifier::UNDERLINED));
    }
}
