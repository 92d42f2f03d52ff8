//! Tag-keyed renderer dispatch and the shared field frame.

mod composite;
mod core;
mod frame;
mod text;

pub use composite::{EventFlow, MultiSelectInput, TagsInput, select_option, toggle_option};
pub use self::core::{RenderInput, Renderer, RendererTable, Resolution};
pub use frame::{FieldFrame, FormView, FrameFooter, RenderedField};
pub use text::{FALLBACK_TEXT, display_width, fit_width, render_text, text_renderers};
