//! Host-side dialog behavior: escape and outside-click dismissal, the close
//! button, and background scroll suppression.

use crossterm::event::{Event, KeyCode, KeyEventKind, MouseEventKind};

use crate::dispatch::EventFlow;
use crate::geometry::Rect;

use super::core::{ModalId, SharedModals};

/// Host hook toggled by the registry: `suppress` when the first dialog
/// opens, `restore` when the last one closes.
pub trait BackgroundScroll: Send + Sync {
    fn suppress(&self);
    fn restore(&self);
}

#[derive(Debug, Default)]
pub struct NullScroll;

impl BackgroundScroll for NullScroll {
    fn suppress(&self) {}
    fn restore(&self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    Escape,
    OutsideClick,
    CloseButton,
}

/// Routes terminal input to the top-most dialog.
#[derive(Debug)]
pub struct ModalSurface {
    registry: SharedModals,
    rect: Option<Rect>,
    last_dismissal: Option<(ModalId, DismissReason)>,
}

impl ModalSurface {
    pub fn new(registry: SharedModals) -> Self {
        Self {
            registry,
            rect: None,
            last_dismissal: None,
        }
    }

    /// Screen area of the top-most dialog as last drawn. Cleared when that
    /// dialog is dismissed, until the host draws the next one.
    pub fn set_rect(&mut self, rect: Rect) {
        self.rect = Some(rect);
    }

    pub fn last_dismissal(&self) -> Option<(ModalId, DismissReason)> {
        self.last_dismissal
    }

    /// Close the top-most dialog through the same path as escape and
    /// outside clicks. Returns whether it closed.
    pub fn close_button(&mut self) -> bool {
        self.dismiss_top(DismissReason::CloseButton)
    }

    /// Escape and pointer presses outside the dialog dismiss the top-most
    /// closable dialog. Any other input passes through, as does everything
    /// while no dialog is open.
    pub fn handle_event(&mut self, event: &Event) -> EventFlow {
        if self.registry.is_empty() {
            return EventFlow::Continue;
        }

        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press && key.code == KeyCode::Esc => {
                self.dismiss_top(DismissReason::Escape);
                EventFlow::Consumed
            }
            Event::Mouse(mouse) if matches!(mouse.kind, MouseEventKind::Down(_)) => {
                let outside = self
                    .rect
                    .is_some_and(|rect| !rect.contains(mouse.column, mouse.row));
                if outside {
                    self.dismiss_top(DismissReason::OutsideClick);
                    EventFlow::Consumed
                } else {
                    EventFlow::Continue
                }
            }
            _ => EventFlow::Continue,
        }
    }

    fn dismiss_top(&mut self, reason: DismissReason) -> bool {
        let Some(top) = self.registry.top() else {
            return false;
        };
        if !self.registry.dismiss(top.id) {
            return false;
        }
        self.last_dismissal = Some((top.id, reason));
        self.rect = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FormValues, SubmitResult};
    use crate::registry::{ModalRegistry, ModalRequest};
    use crate::schema::Schema;
    use crossterm::event::{KeyEvent, KeyModifiers, MouseButton, MouseEvent};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingScroll {
        suppressed: AtomicUsize,
        restored: AtomicUsize,
    }

    impl BackgroundScroll for CountingScroll {
        fn suppress(&self) {
            self.suppressed.fetch_add(1, Ordering::SeqCst);
        }

        fn restore(&self) {
            self.restored.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn request() -> ModalRequest {
        let schema = Arc::new(Schema::builder().build().unwrap());
        ModalRequest::new(schema, |_: &FormValues| -> SubmitResult { Ok(()) })
    }

    fn escape() -> Event {
        Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE))
    }

    fn click(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn scroll_is_suppressed_once_and_restored_once() {
        let scroll = Arc::new(CountingScroll::default());
        let registry = ModalRegistry::default().with_scroll(scroll.clone()).shared();

        let first = registry.open(request());
        let second = registry.open(request());
        assert_eq!(scroll.suppressed.load(Ordering::SeqCst), 1);

        registry.close(first);
        assert_eq!(scroll.restored.load(Ordering::SeqCst), 0);
        registry.close(second);
        assert_eq!(scroll.restored.load(Ordering::SeqCst), 1);

        registry.open(request());
        assert_eq!(scroll.suppressed.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn escape_dismisses_only_the_top_dialog() {
        let registry = ModalRegistry::default().shared();
        let bottom = registry.open(request());
        let top = registry.open(request());
        let mut surface = ModalSurface::new(registry.clone());

        assert_eq!(surface.handle_event(&escape()), EventFlow::Consumed);
        assert_eq!(registry.ids(), vec![bottom]);
        assert_eq!(surface.last_dismissal(), Some((top, DismissReason::Escape)));
    }

    #[test]
    fn outside_clicks_dismiss_and_inside_clicks_pass_through() {
        let registry = ModalRegistry::default().shared();
        let id = registry.open(request());
        let mut surface = ModalSurface::new(registry.clone());
        surface.set_rect(Rect::new(10, 5, 20, 10));

        assert_eq!(surface.handle_event(&click(15, 8)), EventFlow::Continue);
        assert!(registry.contains(id));

        assert_eq!(surface.handle_event(&click(2, 2)), EventFlow::Consumed);
        assert!(!registry.contains(id));
        assert_eq!(surface.last_dismissal(), Some((id, DismissReason::OutsideClick)));
    }

    #[test]
    fn dismissal_forgets_the_closed_dialog_area() {
        let registry = ModalRegistry::default().shared();
        let bottom = registry.open(request());
        registry.open(request());
        let mut surface = ModalSurface::new(registry.clone());
        surface.set_rect(Rect::new(10, 5, 20, 10));

        assert_eq!(surface.handle_event(&escape()), EventFlow::Consumed);
        assert_eq!(surface.handle_event(&click(2, 2)), EventFlow::Continue);
        assert_eq!(registry.ids(), vec![bottom]);

        surface.set_rect(Rect::new(0, 0, 4, 4));
        assert_eq!(surface.handle_event(&click(9, 9)), EventFlow::Consumed);
        assert!(registry.is_empty());
    }

    #[test]
    fn locked_dialogs_ignore_user_dismissal() {
        let registry = ModalRegistry::default().shared();
        let id = registry.open(request().closable(false));
        let mut surface = ModalSurface::new(registry.clone());
        surface.set_rect(Rect::new(0, 0, 4, 4));

        surface.handle_event(&escape());
        surface.handle_event(&click(9, 9));
        assert!(!surface.close_button());
        assert!(registry.contains(id));
        assert_eq!(surface.last_dismissal(), None);

        registry.close(id);
        assert_eq!(surface.handle_event(&escape()), EventFlow::Continue);
    }

    #[test]
    fn close_button_uses_the_dismiss_path() {
        let registry = ModalRegistry::default().shared();
        let id = registry.open(request());
        let mut surface = ModalSurface::new(registry.clone());
        assert!(surface.close_button());
        assert!(!registry.contains(id));
        assert_eq!(registry.pending_closes(), 1);
    }
}
