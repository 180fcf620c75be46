//! Selection and scroll bookkeeping for a list of items.

pub struct ScrollableList<T> {
    items: Vec<T>,
    selected: usize,
    scroll_offset: usize,
}

impl<T> ScrollableList<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
            scroll_offset: 0,
        }
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn clear(&mut self) {
        self.set_items(Vec::new());
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
    }

    pub fn select_down(&mut self, n: usize) {
        if self.items.is_empty() {
            return;
        }
        self.selected = (self.selected + n).min(self.items.len() - 1);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_offset = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.items.len().saturating_sub(1);
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_item(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    /// (index, &item) pairs that fit in `capacity` slots.
    /// Call ensure_visible first to update scroll_offset.
    pub fn visible_items(&self, capacity: usize) -> Vec<(usize, &T)> {
        if capacity == 0 || self.items.is_empty() {
            return Vec::new();
        }
        let end = (self.scroll_offset + capacity).min(self.items.len());
        (self.scroll_offset..end).map(|i| (i, &self.items[i])).collect()
    }

    pub fn ensure_visible(&mut self, capacity: usize) {
        if capacity == 0 {
            return;
        }
        if self.selected < self.scroll_offset {
            self.scroll_offset = self.selected;
        } else if self.selected >= self.scroll_offset + capacity {
            self.scroll_offset = self.selected + 1 - capacity;
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> Default for ScrollableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_is_clamped() {
        let mut list = ScrollableList::new();
        list.select_down(1);
        assert_eq!(list.selected(), 0);

        list.set_items(vec!["a", "b", "c"]);
        list.select_down(10);
        assert_eq!(list.selected_item(), Some(&"c"));
        list.select_up(10);
        assert_eq!(list.selected_item(), Some(&"a"));
    }

    #[test]
    fn test_scroll_follows_selection() {
        let mut list = ScrollableList::new();
        list.set_items((0..10).collect::<Vec<_>>());
        list.select_last();
        list.ensure_visible(3);
        let visible: Vec<usize> = list.visible_items(3).into_iter().map(|(i, _)| i).collect();
        assert_eq!(visible, [7, 8, 9]);

        list.select_first();
        list.ensure_visible(3);
        assert_eq!(list.visible_items(3)[0].0, 0);
    }

    #[test]
    fn test_set_items_resets_position() {
        let mut list = ScrollableList::new();
        list.set_items(vec![1, 2, 3]);
        list.select_last();
        list.set_items(vec![4]);
        assert_eq!(list.selected(), 0);
        assert_eq!(list.selected_item(), Some(&4));
    }
}
