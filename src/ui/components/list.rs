use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

use crate::ui::theme::{Theme, ARROW};

/// Vertical list with a wrapping cursor
pub struct SelectableList<T> {
    pub items: Vec<T>,
    selected: usize,
    state: ListState,
}

impl<T> SelectableList<T> {
    pub fn new(items: Vec<T>) -> Self {
        let mut state = ListState::default();
        if !items.is_empty() {
            state.select(Some(0));
        }
        Self {
            items,
            selected: 0,
            state,
        }
    }

    pub fn previous(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = self
            .selected
            .checked_sub(1)
            .unwrap_or(self.items.len() - 1);
        self.state.select(Some(self.selected));
    }

    pub fn next(&mut self) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + 1) % self.items.len();
        self.state.select(Some(self.selected));
    }

    pub fn get_selected(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Render with `render_item` producing the spans for each entry
    pub fn render<F>(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        title: &str,
        theme: &Theme,
        render_item: F,
    ) where
        F: Fn(&T, bool) -> Vec<Span<'static>>,
    {
        let items: Vec<ListItem> = self
            .items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let is_selected = i == self.selected;
                let mut spans = if is_selected {
                    vec![Span::styled(format!("{} ", ARROW), theme.selected())]
                } else {
                    vec![Span::raw("  ")]
                };
                spans.extend(render_item(item, is_selected));
                ListItem::new(Line::from(spans))
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border())
                .title(title.to_string()),
        );

        frame.render_stateful_widget(list, area, &mut self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_wraps() {
        let mut list = SelectableList::new(vec!["Search", "Exit", "Log out"]);
        assert_eq!(list.get_selected(), Some(&"Search"));

        list.previous();
        assert_eq!(list.get_selected(), Some(&"Log out"));

        list.next();
        list.next();
        assert_eq!(list.get_selected(), Some(&"Exit"));
    }

    #[test]
    fn test_empty_list() {
        let mut list: SelectableList<&str> = SelectableList::new(vec![]);
        list.next();
        list.previous();
        assert_eq!(list.get_selected(), None);
        assert_eq!(list.len(), 0);
    }
}
