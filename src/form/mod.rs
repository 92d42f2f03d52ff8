//! Form state engine: values, errors, touched flags, validation, submission.

mod core;
mod props;

pub use self::core::{
    FormConfig, FormErrors, FormInstance, FormObservers, FormState, FormValues, SettleReport,
    SubmitError, SubmitHandler, SubmitResult, Touched,
};
pub use props::{FieldProps, PropValue};
