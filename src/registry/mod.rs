//! Modal registry: open form dialogs, deferred close callbacks, and the
//! host-side behavior around them.

pub mod audit;
mod core;
mod handle;
mod surface;

pub use audit::{
    BufferedModalAudit, ModalAudit, ModalAuditEvent, ModalAuditEventBuilder, ModalAuditStage,
    NullModalAudit,
};
pub use self::core::{
    CloseCallback, DEFAULT_TRANSITION, Dimensions, ModalConfig, ModalId, ModalPhase,
    ModalRegistry, ModalRequest, ModalView, SharedModals,
};
pub use handle::{ModalFormHandle, ModalOptions};
pub use surface::{BackgroundScroll, DismissReason, ModalSurface, NullScroll};
