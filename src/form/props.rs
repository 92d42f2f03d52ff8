use serde::Serialize;

use crate::error::Result;
use crate::schema::{FieldDescriptor, FieldTag, FieldValue};

use super::core::FormInstance;

/// Value as presented to a primitive input: numbers stay numeric,
/// everything else is stringified, and falsy values present as empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropValue {
    Number(f64),
    Text(String),
    Empty,
}

impl PropValue {
    pub fn from_value(value: &FieldValue) -> Self {
        match value {
            FieldValue::Number(n) => PropValue::Number(*n),
            FieldValue::Text(text) if !text.is_empty() => PropValue::Text(text.clone()),
            FieldValue::Bool(true) => PropValue::Text("true".to_string()),
            FieldValue::List(items) => PropValue::Text(items.join(",")),
            FieldValue::Text(_) | FieldValue::Bool(false) | FieldValue::Absent => PropValue::Empty,
        }
    }

    pub fn display(&self) -> String {
        match self {
            PropValue::Number(n) => n.to_string(),
            PropValue::Text(text) => text.clone(),
            PropValue::Empty => String::new(),
        }
    }
}

/// Renderer-facing view of one field, derived from descriptor and value.
///
/// Renderers report edits back with [`FieldProps::change`] and
/// [`FieldProps::blur`], which route to the form's shared handler pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldProps {
    pub name: String,
    pub id: String,
    pub value: PropValue,
    pub required: bool,
    pub disabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_complete: Option<String>,
    pub input_kind: &'static str,
}

impl FieldProps {
    pub(crate) fn derive(field: &str, descriptor: &FieldDescriptor, value: &FieldValue) -> Self {
        let auto_complete = match descriptor.tag {
            FieldTag::Text => descriptor.hints.auto_fill.clone(),
            _ => None,
        };
        Self {
            name: field.to_string(),
            id: field.to_string(),
            value: PropValue::from_value(value),
            required: descriptor.required,
            disabled: descriptor.hints.disabled,
            placeholder: descriptor.hints.placeholder.clone(),
            auto_complete,
            input_kind: descriptor.tag.input_kind(),
        }
    }

    pub fn change(&self, form: &mut FormInstance, value: impl Into<FieldValue>) -> Result<()> {
        form.handle_change(&self.name, value)
    }

    pub fn blur(&self, form: &mut FormInstance) -> Result<()> {
        form.handle_blur(&self.name)
    }
}
