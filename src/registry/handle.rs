use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::form::{FormInstance, FormValues, SubmitError, SubmitResult};
use crate::schema::Schema;

use super::core::{Dimensions, ModalId, ModalRequest, SharedModals};

/// Display options for dialogs opened through a [`ModalFormHandle`].
#[derive(Debug, Clone)]
pub struct ModalOptions {
    pub title: Option<String>,
    pub description: Option<String>,
    pub dimensions: Option<Dimensions>,
    /// Allow user dismissal. [`ModalFormHandle::close`] works either way.
    pub closable: bool,
    /// Open as soon as the handle is created.
    pub open: bool,
}

impl Default for ModalOptions {
    fn default() -> Self {
        Self {
            title: None,
            description: None,
            dimensions: None,
            closable: true,
            open: false,
        }
    }
}

type SharedSubmit = Arc<dyn Fn(&FormValues) -> SubmitResult + Send + Sync>;
type SharedClose = Arc<dyn Fn() + Send + Sync>;

/// One call-site's dialog: remembers at most one outstanding request and
/// ignores repeated opens until that request's close callback has run.
#[derive(Clone)]
pub struct ModalFormHandle {
    registry: SharedModals,
    schema: Arc<Schema>,
    options: ModalOptions,
    on_submit: SharedSubmit,
    on_close: Option<SharedClose>,
    current: Arc<Mutex<Option<ModalId>>>,
}

impl fmt::Debug for ModalFormHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalFormHandle")
            .field("options", &self.options)
            .field("current", &self.id())
            .finish_non_exhaustive()
    }
}

impl ModalFormHandle {
    pub fn new<F>(registry: SharedModals, schema: Arc<Schema>, options: ModalOptions, on_submit: F) -> Self
    where
        F: Fn(&FormValues) -> SubmitResult + Send + Sync + 'static,
    {
        let handle = Self {
            registry,
            schema,
            options,
            on_submit: Arc::new(on_submit),
            on_close: None,
            current: Arc::new(Mutex::new(None)),
        };
        if handle.options.open {
            handle.open();
        }
        handle
    }

    /// Run `callback` after each dialog of this handle has closed.
    pub fn on_close(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(callback));
        self
    }

    fn slot(&self) -> MutexGuard<'_, Option<ModalId>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open the dialog unless one is already outstanding. Returns the new id,
    /// or `None` when this call was ignored.
    pub fn open(&self) -> Option<ModalId> {
        let mut slot = self.slot();
        if slot.is_some() {
            return None;
        }

        let submit = self.on_submit.clone();
        let current = self.current.clone();
        let user_close = self.on_close.clone();
        let mut request = ModalRequest::new(self.schema.clone(), move |values: &FormValues| submit(values))
            .closable(self.options.closable)
            .on_close(move || {
                *current.lock().unwrap_or_else(PoisonError::into_inner) = None;
                if let Some(callback) = user_close {
                    callback();
                }
            });
        if let Some(title) = &self.options.title {
            request = request.title(title.clone());
        }
        if let Some(description) = &self.options.description {
            request = request.description(description.clone());
        }
        if let Some(dimensions) = self.options.dimensions {
            request = request.dimensions(dimensions);
        }

        let id = self.registry.open(request);
        *slot = Some(id);
        Some(id)
    }

    /// Close the outstanding dialog, if any. The remembered id is cleared by
    /// the close callback, after the transition.
    pub fn close(&self) -> bool {
        match self.id() {
            Some(id) => self.registry.close(id),
            None => false,
        }
    }

    pub fn id(&self) -> Option<ModalId> {
        *self.slot()
    }

    /// Whether a request is outstanding, including one still closing.
    pub fn is_outstanding(&self) -> bool {
        self.id().is_some()
    }

    pub fn with_form<R>(&self, f: impl FnOnce(&mut FormInstance) -> R) -> Option<R> {
        let id = self.id()?;
        self.registry.with_form(id, f)
    }

    pub fn submit(&self) -> Result<bool, SubmitError> {
        match self.id() {
            Some(id) => self.registry.submit(id),
            None => Ok(false),
        }
    }
}
