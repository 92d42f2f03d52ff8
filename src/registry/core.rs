use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::dispatch::{FormView, RendererTable};
use crate::form::{FormConfig, FormInstance, FormObservers, FormValues, SubmitError, SubmitHandler, SubmitResult};
use crate::logging::{LogLevel, MODAL_TARGET, current_ms, emit, json_kv};
use crate::metrics::with_metrics;
use crate::schema::Schema;

use super::audit::{ModalAudit, ModalAuditEventBuilder, ModalAuditStage, NullModalAudit};
use super::surface::{BackgroundScroll, NullScroll};

/// Delay between removal and the close callback when none is configured.
pub const DEFAULT_TRANSITION: Duration = Duration::from_millis(50);

/// Opaque dialog token. Issued from the wall clock in milliseconds and
/// strictly increasing within one registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ModalId(u64);

impl ModalId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ModalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "modal-{}", self.0)
    }
}

/// Requested size of a dialog in terminal cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub width: Option<u16>,
    pub height: Option<u16>,
    pub min_height: Option<u16>,
}

impl Dimensions {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            min_height: None,
        }
    }

    pub fn min_height(mut self, rows: u16) -> Self {
        self.min_height = Some(rows);
        self
    }
}

pub type CloseCallback = Box<dyn FnOnce() + Send>;

/// Everything needed to show one form dialog.
pub struct ModalRequest {
    schema: Arc<Schema>,
    on_submit: SubmitHandler,
    on_close: Option<CloseCallback>,
    observers: FormObservers,
    title: Option<String>,
    description: Option<String>,
    dimensions: Option<Dimensions>,
    closable: bool,
}

impl fmt::Debug for ModalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModalRequest")
            .field("fields", &self.schema.len())
            .field("title", &self.title)
            .field("closable", &self.closable)
            .finish_non_exhaustive()
    }
}

impl ModalRequest {
    pub fn new<F>(schema: Arc<Schema>, on_submit: F) -> Self
    where
        F: FnMut(&FormValues) -> SubmitResult + Send + 'static,
    {
        Self::from_handler(schema, Box::new(on_submit))
    }

    pub fn from_handler(schema: Arc<Schema>, on_submit: SubmitHandler) -> Self {
        Self {
            schema,
            on_submit,
            on_close: None,
            observers: FormObservers::default(),
            title: None,
            description: None,
            dimensions: None,
            closable: true,
        }
    }

    pub fn on_close(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(callback));
        self
    }

    pub fn observers(mut self, observers: FormObservers) -> Self {
        self.observers = observers;
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = Some(dimensions);
        self
    }

    /// Whether the user may dismiss the dialog (escape, outside click, close
    /// button). Programmatic close is always allowed.
    pub fn closable(mut self, closable: bool) -> Self {
        self.closable = closable;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalPhase {
    Open,
    Closing,
    Closed,
}

/// Registry settings.
#[derive(Debug, Clone)]
pub struct ModalConfig {
    /// Time between removal and the close callback, so exit transitions can
    /// still observe the dialog.
    pub transition_duration: Duration,
    /// Configuration handed to every dialog's form. Its logger and metrics
    /// are also used by the registry.
    pub form: FormConfig,
}

impl Default for ModalConfig {
    fn default() -> Self {
        Self {
            transition_duration: DEFAULT_TRANSITION,
            form: FormConfig::default(),
        }
    }
}

/// Presentation data of one open dialog, in stacking order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub id: ModalId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub dimensions: Option<Dimensions>,
    pub closable: bool,
}

struct ModalEntry {
    view: ModalView,
    // `None` while checked out by `with_form`.
    form: Option<FormInstance>,
    on_close: Option<CloseCallback>,
}

struct PendingClose {
    id: ModalId,
    // `None` when the deadline lies beyond what `Instant` can represent;
    // only `flush_pending` runs those.
    due: Option<Instant>,
    callback: Option<CloseCallback>,
}

#[derive(Default)]
struct RegistryState {
    entries: Vec<ModalEntry>,
    pending: Vec<PendingClose>,
    last_id: u64,
}

impl RegistryState {
    fn next_id(&mut self) -> ModalId {
        let now = u64::try_from(current_ms()).unwrap_or(u64::MAX);
        self.last_id = now.max(self.last_id.saturating_add(1));
        ModalId(self.last_id)
    }

    fn position(&self, id: ModalId) -> Option<usize> {
        self.entries.iter().position(|entry| entry.view.id == id)
    }
}

/// Registry of open form dialogs.
///
/// Shared by explicit reference (usually `Arc<ModalRegistry>`). Every method
/// takes `&self`; callbacks run with the internal lock released, so they may
/// call back into the registry.
pub struct ModalRegistry {
    config: ModalConfig,
    state: Mutex<RegistryState>,
    audit: Arc<dyn ModalAudit>,
    scroll: Arc<dyn BackgroundScroll>,
}

pub type SharedModals = Arc<ModalRegistry>;

impl fmt::Debug for ModalRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("ModalRegistry")
            .field("config", &self.config)
            .field("open", &state.entries.len())
            .field("pending", &state.pending.len())
            .finish()
    }
}

impl Default for ModalRegistry {
    fn default() -> Self {
        Self::new(ModalConfig::default())
    }
}

impl ModalRegistry {
    pub fn new(config: ModalConfig) -> Self {
        Self {
            config,
            state: Mutex::new(RegistryState::default()),
            audit: Arc::new(NullModalAudit),
            scroll: Arc::new(NullScroll),
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn ModalAudit>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_scroll(mut self, scroll: Arc<dyn BackgroundScroll>) -> Self {
        self.scroll = scroll;
        self
    }

    pub fn shared(self) -> SharedModals {
        Arc::new(self)
    }

    pub fn config(&self) -> &ModalConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log(&self, level: LogLevel, message: &str, id: ModalId) {
        emit(
            self.config.form.logger.as_ref(),
            level,
            MODAL_TARGET,
            message,
            [json_kv("id", id.get())],
        );
    }

    /// Bind a fresh form to `request` and add it on top of the stack.
    pub fn open(&self, request: ModalRequest) -> ModalId {
        let ModalRequest {
            schema,
            on_submit,
            on_close,
            observers,
            title,
            description,
            dimensions,
            closable,
        } = request;

        let form = FormInstance::from_handler(schema, self.config.form.clone(), on_submit)
            .with_observers(observers);

        let id = self.lock().next_id();
        self.audit.record(
            ModalAuditEventBuilder::new(ModalAuditStage::Requested, id)
                .detail("fields", form.schema().len())
                .finish(),
        );

        let now_open = {
            let mut state = self.lock();
            state.entries.push(ModalEntry {
                view: ModalView {
                    id,
                    title,
                    description,
                    dimensions,
                    closable,
                },
                form: Some(form),
                on_close,
            });
            state.entries.len()
        };

        if now_open == 1 {
            self.scroll.suppress();
        }
        self.audit.record(
            ModalAuditEventBuilder::new(ModalAuditStage::Opened, id)
                .detail("open", now_open)
                .finish(),
        );
        with_metrics(self.config.form.metrics.as_ref(), |m| m.record_modal_opened());
        self.log(LogLevel::Debug, "modal_opened", id);
        id
    }

    /// Remove `id` now and run its close callback after the configured
    /// transition. Unknown ids are ignored. Returns whether anything closed.
    pub fn close(&self, id: ModalId) -> bool {
        self.close_with_transition(id, self.config.transition_duration)
    }

    /// [`ModalRegistry::close`] with an explicit transition for this call.
    pub fn close_with_transition(&self, id: ModalId, transition: Duration) -> bool {
        let due = Instant::now().checked_add(transition);
        let remaining = {
            let mut state = self.lock();
            let Some(index) = state.position(id) else {
                return false;
            };
            let entry = state.entries.remove(index);
            state.pending.push(PendingClose {
                id,
                due,
                callback: entry.on_close,
            });
            state.entries.len()
        };

        if remaining == 0 {
            self.scroll.restore();
        }
        self.audit.record(
            ModalAuditEventBuilder::new(ModalAuditStage::Closing, id)
                .detail(
                    "transition_ms",
                    u64::try_from(transition.as_millis()).unwrap_or(u64::MAX),
                )
                .finish(),
        );
        with_metrics(self.config.form.metrics.as_ref(), |m| m.record_modal_closed());
        self.log(LogLevel::Debug, "modal_closed", id);
        true
    }

    /// User-initiated close. Refused when the dialog is not closable.
    pub fn dismiss(&self, id: ModalId) -> bool {
        let closable = self
            .lock()
            .entries
            .iter()
            .any(|entry| entry.view.id == id && entry.view.closable);
        closable && self.close(id)
    }

    /// Run every close callback due at `now`. Returns how many ran.
    pub fn tick(&self, now: Instant) -> usize {
        let due = {
            let mut state = self.lock();
            let (due, waiting): (Vec<_>, Vec<_>) =
                state.pending.drain(..).partition(|pending| pending.due.is_some_and(|due| due <= now));
            state.pending = waiting;
            due
        };
        self.run_callbacks(due)
    }

    /// Run every scheduled close callback regardless of its deadline.
    pub fn flush_pending(&self) -> usize {
        let due: Vec<_> = self.lock().pending.drain(..).collect();
        self.run_callbacks(due)
    }

    fn run_callbacks(&self, due: Vec<PendingClose>) -> usize {
        let count = due.len();
        for pending in due {
            if let Some(callback) = pending.callback {
                callback();
            }
            self.audit
                .record(ModalAuditEventBuilder::new(ModalAuditStage::Closed, pending.id).finish());
            self.log(LogLevel::Trace, "close_callback_ran", pending.id);
        }
        if count > 0 {
            with_metrics(self.config.form.metrics.as_ref(), |m| {
                m.record_close_callbacks(count)
            });
        }
        count
    }

    pub fn pending_closes(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.lock().pending.iter().filter_map(|pending| pending.due).min()
    }

    /// Open ids in stacking order, bottom first.
    pub fn ids(&self) -> Vec<ModalId> {
        self.lock().entries.iter().map(|entry| entry.view.id).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn contains(&self, id: ModalId) -> bool {
        self.lock().position(id).is_some()
    }

    /// Open dialogs, bottom first.
    pub fn snapshot(&self) -> Vec<ModalView> {
        self.lock()
            .entries
            .iter()
            .map(|entry| entry.view.clone())
            .collect()
    }

    pub fn top(&self) -> Option<ModalView> {
        self.lock().entries.last().map(|entry| entry.view.clone())
    }

    /// Where `id` sits in its lifecycle. Ids that are neither open nor
    /// waiting on their callback report `Closed`.
    pub fn phase(&self, id: ModalId) -> ModalPhase {
        let state = self.lock();
        if state.position(id).is_some() {
            ModalPhase::Open
        } else if state.pending.iter().any(|pending| pending.id == id) {
            ModalPhase::Closing
        } else {
            ModalPhase::Closed
        }
    }

    /// Run `f` against the form of dialog `id`.
    ///
    /// The form is taken out of the registry for the duration of the call,
    /// so `f` may open or close dialogs. Returns `None` for unknown ids or
    /// when the form is already checked out. If the dialog was closed while
    /// `f` ran, the form is dropped afterwards.
    pub fn with_form<R>(&self, id: ModalId, f: impl FnOnce(&mut FormInstance) -> R) -> Option<R> {
        let mut form = {
            let mut state = self.lock();
            let index = state.position(id)?;
            state.entries[index].form.take()?
        };

        let result = f(&mut form);

        let mut state = self.lock();
        if let Some(index) = state.position(id) {
            state.entries[index].form = Some(form);
        }
        Some(result)
    }

    /// Submit the form of dialog `id`. Unknown ids submit nothing.
    pub fn submit(&self, id: ModalId) -> Result<bool, SubmitError> {
        self.with_form(id, FormInstance::submit).unwrap_or(Ok(false))
    }

    /// Render the form of dialog `id` with its title and description.
    pub fn render<O>(&self, id: ModalId, table: &RendererTable<O>) -> Option<FormView<O>> {
        let view = self
            .lock()
            .entries
            .iter()
            .find(|entry| entry.view.id == id)
            .map(|entry| entry.view.clone())?;
        self.with_form(id, |form| {
            table
                .render_form(form)
                .titled(view.title.clone(), view.description.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::text_renderers;
    use crate::logging::{Logger, MemorySink};
    use crate::metrics::FormMetrics;
    use crate::registry::audit::BufferedModalAudit;
    use crate::schema::FieldDescriptor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::builder()
                .field("name", FieldDescriptor::text("Name").required())
                .build()
                .unwrap(),
        )
    }

    fn request() -> ModalRequest {
        ModalRequest::new(schema(), |_: &FormValues| -> SubmitResult { Ok(()) })
    }

    fn later() -> Instant {
        Instant::now() + Duration::from_secs(5)
    }

    #[test]
    fn close_removes_now_and_calls_back_once_after_transition() {
        let registry = ModalRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let id = registry.open(request().on_close(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(registry.contains(id));

        assert!(registry.close(id));
        assert!(!registry.contains(id));
        assert_eq!(registry.phase(id), ModalPhase::Closing);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(registry.tick(Instant::now()), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert_eq!(registry.tick(later()), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.tick(later()), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.phase(id), ModalPhase::Closed);
    }

    #[test]
    fn closing_an_unknown_or_closed_id_is_a_no_op() {
        let registry = ModalRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let id = registry.open(request().on_close(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!registry.close(ModalId::from_raw(1)));
        assert!(registry.close(id));
        assert!(!registry.close(id));
        assert_eq!(registry.flush_pending(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_opens_are_independent() {
        let registry = ModalRegistry::default();
        let first = registry.open(request().title("First"));
        let second = registry.open(request().title("Second"));
        assert_ne!(first, second);
        assert!(second > first);

        registry
            .with_form(second, |form| form.set_field_value("name", "Ada"))
            .unwrap()
            .unwrap();
        registry.close(first);

        assert_eq!(registry.ids(), vec![second]);
        let value = registry
            .with_form(second, |form| form.value("name").cloned())
            .flatten();
        assert_eq!(value, Some("Ada".into()));
        assert_eq!(registry.top().map(|view| view.title), Some(Some("Second".into())));
    }

    #[test]
    fn unrepresentable_transition_still_calls_back_once() {
        let registry = ModalRegistry::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let id = registry.open(request().on_close(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(registry.close_with_transition(id, Duration::MAX));
        assert!(!registry.contains(id));
        assert_eq!(registry.phase(id), ModalPhase::Closing);
        assert_eq!(registry.next_deadline(), None);
        assert_eq!(registry.tick(later()), 0);

        assert_eq!(registry.flush_pending(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.flush_pending(), 0);

        let next = registry.open(request());
        assert!(registry.close(next));
    }

    #[test]
    fn zero_transition_is_due_immediately() {
        let registry = ModalRegistry::new(ModalConfig {
            transition_duration: Duration::ZERO,
            ..ModalConfig::default()
        });
        let id = registry.open(request());
        registry.close(id);
        assert!(registry.next_deadline().is_some());
        assert_eq!(registry.tick(Instant::now()), 1);
        assert_eq!(registry.pending_closes(), 0);
    }

    #[test]
    fn dismiss_respects_closable() {
        let registry = ModalRegistry::default();
        let locked = registry.open(request().closable(false));
        assert!(!registry.dismiss(locked));
        assert!(registry.contains(locked));
        assert!(registry.close(locked));
    }

    #[test]
    fn callbacks_may_reenter_the_registry() {
        let registry = ModalRegistry::default().shared();
        let inner = registry.clone();
        let id = registry.open(ModalRequest::new(schema(), move |_: &FormValues| -> SubmitResult {
            inner.open(ModalRequest::new(
                Arc::new(Schema::builder().build()?),
                |_: &FormValues| -> SubmitResult { Ok(()) },
            ));
            Ok(())
        }));

        assert_eq!(registry.submit(id).unwrap(), false);
        registry
            .with_form(id, |form| form.set_field_value("name", "Ada"))
            .unwrap()
            .unwrap();
        assert!(registry.submit(id).unwrap());
        assert_eq!(registry.len(), 2);

        let follow_up = registry.clone();
        let last = registry.ids()[1];
        registry.open(request().on_close(move || {
            follow_up.close(last);
        }));
        let top = registry.top().unwrap().id;
        registry.close(top);
        registry.flush_pending();
        assert_eq!(registry.ids(), vec![id]);
    }

    #[test]
    fn submit_errors_pass_through() {
        let registry = ModalRegistry::default();
        let id = registry.open(ModalRequest::new(schema(), |_: &FormValues| -> SubmitResult {
            Err("backend down".into())
        }));
        registry
            .with_form(id, |form| form.set_field_value("name", "Ada"))
            .unwrap()
            .unwrap();
        let err = registry.submit(id).unwrap_err();
        assert_eq!(err.to_string(), "backend down");
        assert!(registry.contains(id));
    }

    #[test]
    fn audit_metrics_and_logs_follow_the_lifecycle() {
        let audit = Arc::new(BufferedModalAudit::new());
        let sink = MemorySink::new();
        let metrics = FormMetrics::shared();
        let registry = ModalRegistry::new(ModalConfig {
            form: FormConfig {
                logger: Some(Logger::new(sink.clone())),
                metrics: Some(metrics.clone()),
                ..FormConfig::default()
            },
            ..ModalConfig::default()
        })
        .with_audit(audit.clone());

        let id = registry.open(request());
        registry.close(id);
        registry.flush_pending();

        assert_eq!(
            audit.stages_of(id),
            vec![
                ModalAuditStage::Requested,
                ModalAuditStage::Opened,
                ModalAuditStage::Closing,
                ModalAuditStage::Closed,
            ]
        );
        let snapshot = metrics.lock().unwrap().snapshot();
        assert_eq!(snapshot.modals_opened, 1);
        assert_eq!(snapshot.modals_closed, 1);
        assert_eq!(snapshot.close_callbacks, 1);

        let modal_messages: Vec<_> = sink
            .events()
            .into_iter()
            .filter(|event| event.target == MODAL_TARGET)
            .map(|event| event.message)
            .collect();
        assert_eq!(modal_messages, vec!["modal_opened", "modal_closed", "close_callback_ran"]);
    }

    #[test]
    fn render_includes_title_and_fields() {
        let registry = ModalRegistry::default();
        let id = registry.open(request().title("Profile").description("Tell us"));
        let view = registry.render(id, &text_renderers()).unwrap();
        assert_eq!(view.title.as_deref(), Some("Profile"));
        assert_eq!(view.description.as_deref(), Some("Tell us"));
        assert_eq!(view.fields.len(), 1);
        assert!(registry.render(ModalId::from_raw(7), &text_renderers()).is_none());
    }
}
