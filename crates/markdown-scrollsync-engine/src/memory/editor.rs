use std::cell::RefCell;
use std::rc::Rc;

use super::{Listeners, notify_all};
use crate::notify::Notifier;
use crate::surface::{LineEditor, ListenerId, SurfaceError};

#[derive(Debug)]
struct EditorState {
    lines: Vec<String>,
    cursor: usize,
    top: usize,
    viewport_rows: usize,
    listeners: Listeners,
    cursor_requests: usize,
}

impl EditorState {
    fn last_line(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }

    fn max_top(&self) -> usize {
        self.lines.len().saturating_sub(self.viewport_rows)
    }

    /// Scroll just enough to keep the cursor on screen
    fn reveal_cursor(&mut self) {
        if self.cursor < self.top {
            self.top = self.cursor;
        } else if self.viewport_rows > 0 && self.cursor >= self.top + self.viewport_rows {
            self.top = self.cursor + 1 - self.viewport_rows;
        }
        self.top = self.top.min(self.max_top());
    }
}

/// Plain-text editor buffer with a line cursor, measured in lines
#[derive(Debug, Clone)]
pub struct MemoryEditor {
    state: Rc<RefCell<EditorState>>,
}

impl MemoryEditor {
    pub fn new(text: &str, viewport_rows: usize) -> Self {
        Self {
            state: Rc::new(RefCell::new(EditorState {
                lines: text.lines().map(str::to_string).collect(),
                cursor: 0,
                top: 0,
                viewport_rows,
                listeners: Listeners::default(),
                cursor_requests: 0,
            })),
        }
    }

    pub fn text(&self) -> String {
        self.state.borrow().lines.join("\n")
    }

    pub fn set_viewport_rows(&self, rows: usize) {
        let mut state = self.state.borrow_mut();
        state.viewport_rows = rows;
        state.reveal_cursor();
    }

    /// User cursor movement; notifies listeners when the cursor line changes
    pub fn move_cursor_by(&self, delta: isize) {
        let target = self.cursor().saturating_add_signed(delta);
        self.place_cursor(target, false);
    }

    pub fn move_cursor_to(&self, line: usize) {
        self.place_cursor(line, false);
    }

    pub fn cursor(&self) -> usize {
        self.state.borrow().cursor
    }

    pub fn top_line(&self) -> usize {
        self.state.borrow().top
    }

    /// How many times the cursor was set programmatically
    pub fn cursor_requests(&self) -> usize {
        self.state.borrow().cursor_requests
    }

    pub fn listener_count(&self) -> usize {
        self.state.borrow().listeners.len()
    }

    /// `(line number, text, is cursor line)` for every line in the viewport
    pub fn visible_lines(&self) -> Vec<(usize, String, bool)> {
        let state = self.state.borrow();
        state
            .lines
            .iter()
            .enumerate()
            .skip(state.top)
            .take(state.viewport_rows)
            .map(|(i, line)| (i, line.clone(), i == state.cursor))
            .collect()
    }

    fn place_cursor(&self, line: usize, align_top: bool) {
        let notifiers = {
            let mut state = self.state.borrow_mut();
            let line = line.min(state.last_line());
            if line == state.cursor && !align_top {
                return;
            }
            state.cursor = line;
            if align_top {
                state.top = line.min(state.max_top());
            } else {
                state.reveal_cursor();
            }
            state.listeners.snapshot()
        };
        notify_all(notifiers);
    }
}

impl LineEditor for MemoryEditor {
    fn line_count(&self) -> usize {
        self.state.borrow().lines.len()
    }

    fn cursor_line(&self) -> usize {
        self.cursor()
    }

    /// Jump: the target line is brought to the top of the viewport
    fn set_cursor_line(&mut self, line: usize) {
        self.state.borrow_mut().cursor_requests += 1;
        self.place_cursor(line, true);
    }

    fn scroll_info(&self) -> Result<(f64, f64, f64), SurfaceError> {
        let state = self.state.borrow();
        Ok((
            state.top as f64,
            state.lines.len() as f64,
            state.viewport_rows as f64,
        ))
    }

    fn scroll_to(&mut self, top: f64) {
        let notifiers = {
            let mut state = self.state.borrow_mut();
            let top = (top.max(0.0).round() as usize).min(state.max_top());
            if top == state.top {
                return;
            }
            state.top = top;
            state.listeners.snapshot()
        };
        notify_all(notifiers);
    }

    fn on_change(&mut self, notifier: Notifier) -> ListenerId {
        self.state.borrow_mut().listeners.add(notifier)
    }

    fn off(&mut self, id: ListenerId) {
        self.state.borrow_mut().listeners.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::{Inbox, SurfaceRole};

    fn editor() -> MemoryEditor {
        let text = (0..100).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n");
        MemoryEditor::new(&text, 10)
    }

    #[test]
    fn test_cursor_movement_scrolls_minimally() {
        let editor = editor();

        editor.move_cursor_by(12);
        assert_eq!((editor.cursor(), editor.top_line()), (12, 3));

        editor.move_cursor_by(-10);
        assert_eq!((editor.cursor(), editor.top_line()), (2, 2));

        editor.move_cursor_by(-50);
        assert_eq!(editor.cursor(), 0);
    }

    #[test]
    fn test_jump_aligns_target_to_top_and_notifies() {
        let mut editor = editor();
        let inbox = Inbox::shared();
        let id = editor.on_change(Notifier::new(&inbox, SurfaceRole::Source));

        editor.set_cursor_line(40);
        assert_eq!((editor.cursor(), editor.top_line()), (40, 40));
        assert_eq!(inbox.borrow_mut().take(), vec![SurfaceRole::Source]);

        editor.set_cursor_line(99);
        assert_eq!(editor.top_line(), 90);
        assert_eq!(editor.cursor_requests(), 2);

        editor.off(id);
        assert_eq!(editor.listener_count(), 0);
    }

    #[test]
    fn test_visible_lines_mark_cursor() {
        let editor = editor();
        editor.move_cursor_to(1);

        let visible = editor.visible_lines();

        assert_eq!(visible.len(), 10);
        assert_eq!(visible[1], (1, "line 1".to_string(), true));
        assert!(!visible[0].2);
    }
}
