//! Shared cursor movement for the list panes.

/// A pane with a cursor over `len()` rows.
///
/// Every movement clamps the cursor to the current row count, so a pane that
/// shrank after a snapshot switch never points past its end.
pub trait Navigable {
    fn cursor(&self) -> usize;
    fn cursor_mut(&mut self) -> &mut usize;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clamp_cursor(&mut self) {
        let last = self.len().saturating_sub(1);
        if self.cursor() > last {
            *self.cursor_mut() = last;
        }
    }

    fn select_up(&mut self) {
        *self.cursor_mut() = self.cursor().saturating_sub(1);
        self.clamp_cursor();
    }

    fn select_down(&mut self) {
        *self.cursor_mut() = self.cursor().saturating_add(1);
        self.clamp_cursor();
    }

    fn page_up(&mut self, n: usize) {
        *self.cursor_mut() = self.cursor().saturating_sub(n);
        self.clamp_cursor();
    }

    fn page_down(&mut self, n: usize) {
        *self.cursor_mut() = self.cursor().saturating_add(n);
        self.clamp_cursor();
    }

    fn home(&mut self) {
        *self.cursor_mut() = 0;
    }

    fn end(&mut self) {
        *self.cursor_mut() = usize::MAX;
        self.clamp_cursor();
    }
}
