mod types;

pub use types::{DispatchError, FormError, Result, SchemaError, ValueError};
