//! Schema-driven forms for terminal UIs.
//!
//! A [`Schema`] describes fields by tag; a [`FormInstance`] tracks values,
//! errors and touched flags against it; a [`RendererTable`] maps each tag
//! to the renderer that draws it; and a [`ModalRegistry`] keeps any number
//! of form dialogs open with deferred close callbacks.

pub mod context;
pub mod dispatch;
pub mod error;
pub mod form;
pub mod geometry;
pub mod logging;
pub mod metrics;
pub mod registry;
pub mod schema;

pub use context::{ContextError, ServiceContext, ensure_modal_registry};
pub use dispatch::{
    EventFlow, FieldFrame, FormView, FrameFooter, MultiSelectInput, RenderInput, RenderedField,
    Renderer, RendererTable, Resolution, TagsInput, display_width, render_text, select_option,
    text_renderers, toggle_option,
};
pub use error::{DispatchError, FormError, Result, SchemaError, ValueError};
pub use form::{
    FieldProps, FormConfig, FormErrors, FormInstance, FormObservers, FormState, FormValues,
    PropValue, SettleReport, SubmitError, SubmitHandler, SubmitResult, Touched,
};
pub use geometry::Rect;
pub use logging::{LogEvent, LogFields, LogLevel, Logger, LoggingError, LoggingResult};
pub use metrics::{FormMetrics, MetricSnapshot, SharedMetrics};
pub use registry::{
    BackgroundScroll, Dimensions, DismissReason, ModalConfig, ModalFormHandle, ModalId,
    ModalOptions, ModalPhase, ModalRegistry, ModalRequest, ModalSurface, ModalView, SharedModals,
};
pub use schema::{
    ChoiceOption, Constraints, Direction, FieldDescriptor, FieldTag, FieldValidator, FieldValue,
    RenderHints, Schema, SchemaBuilder, ValueShape,
};
