use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, SchemaError, ValueError};
use crate::form::{FormState, FormValues};

use super::tag::{FieldTag, ValueShape};
use super::value::{Coercion, FieldValue};

/// One entry of a choice field. Accepts either a bare string (label and
/// value are the same) or a `{label, value}` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawOption")]
pub struct ChoiceOption {
    pub label: String,
    pub value: String,
}

impl ChoiceOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

impl From<&str> for ChoiceOption {
    fn from(value: &str) -> Self {
        Self::new(value, value)
    }
}

impl From<String> for ChoiceOption {
    fn from(value: String) -> Self {
        Self::new(value.clone(), value)
    }
}

impl From<(&str, &str)> for ChoiceOption {
    fn from((label, value): (&str, &str)) -> Self {
        Self::new(label, value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawOption {
    Plain(String),
    Pair { label: String, value: String },
}

impl From<RawOption> for ChoiceOption {
    fn from(raw: RawOption) -> Self {
        match raw {
            RawOption::Plain(value) => value.into(),
            RawOption::Pair { label, value } => Self::new(label, value),
        }
    }
}

/// Layout of a radio or checkbox group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Row,
    Column,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<ChoiceOption>>,
}

/// Presentation hints a renderer may honour. None of them affect state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub helper_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information: Option<String>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

type ValidatorFn = dyn Fn(&str, &FieldDescriptor, &FormState) -> Vec<String> + Send + Sync;

/// Per-field validation hook. Its messages are added after the built-in
/// required check.
#[derive(Clone)]
pub struct FieldValidator(Arc<ValidatorFn>);

impl FieldValidator {
    pub fn new<F>(check: F) -> Self
    where
        F: Fn(&str, &FieldDescriptor, &FormState) -> Vec<String> + Send + Sync + 'static,
    {
        Self(Arc::new(check))
    }

    pub fn run(&self, field: &str, descriptor: &FieldDescriptor, state: &FormState) -> Vec<String> {
        (self.0)(field, descriptor, state)
    }
}

impl fmt::Debug for FieldValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FieldValidator(..)")
    }
}

/// Static declaration of one field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    #[serde(alias = "component")]
    pub tag: FieldTag,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "initialValue", alias = "value", alias = "initial", default)]
    pub initial: FieldValue,
    #[serde(flatten)]
    pub constraints: Constraints,
    #[serde(flatten)]
    pub hints: RenderHints,
    #[serde(skip)]
    pub validator: Option<FieldValidator>,
}

impl FieldDescriptor {
    /// Descriptor with the tag's default initial value.
    pub fn new(tag: FieldTag, label: impl Into<String>) -> Self {
        let initial = match tag {
            FieldTag::Switch => FieldValue::Bool(false),
            FieldTag::MultiSelect | FieldTag::Tags | FieldTag::Checkbox => {
                FieldValue::List(Vec::new())
            }
            FieldTag::Number | FieldTag::Range | FieldTag::Custom(_) => FieldValue::Absent,
            _ => FieldValue::Text(String::new()),
        };
        Self {
            tag,
            label: label.into(),
            required: false,
            initial,
            constraints: Constraints::default(),
            hints: RenderHints::default(),
            validator: None,
        }
    }

    pub fn text(label: impl Into<String>) -> Self {
        Self::new(FieldTag::Text, label)
    }

    pub fn number(label: impl Into<String>) -> Self {
        Self::new(FieldTag::Number, label)
    }

    pub fn range(label: impl Into<String>, min: f64, max: f64) -> Self {
        Self::new(FieldTag::Range, label)
            .bounds(min, max)
            .initial(min)
    }

    pub fn switch(label: impl Into<String>) -> Self {
        Self::new(FieldTag::Switch, label)
    }

    /// Checkbox group holding a list of checked values.
    pub fn checkbox<I, O>(label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ChoiceOption>,
    {
        Self::new(FieldTag::Checkbox, label).options(options)
    }

    pub fn radio<I, O>(label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ChoiceOption>,
    {
        Self::new(FieldTag::Radio, label).options(options)
    }

    pub fn select<I, O>(label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ChoiceOption>,
    {
        Self::new(FieldTag::Select, label).options(options)
    }

    pub fn multi_select<I, O>(label: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ChoiceOption>,
    {
        Self::new(FieldTag::MultiSelect, label).options(options)
    }

    pub fn tags(label: impl Into<String>) -> Self {
        Self::new(FieldTag::Tags, label)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn initial(mut self, value: impl Into<FieldValue>) -> Self {
        self.initial = value.into();
        self
    }

    pub fn options<I, O>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = O>,
        O: Into<ChoiceOption>,
    {
        self.constraints.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn bounds(mut self, min: f64, max: f64) -> Self {
        self.constraints.min = Some(min);
        self.constraints.max = Some(max);
        self
    }

    pub fn step(mut self, step: f64) -> Self {
        self.constraints.step = Some(step);
        self
    }

    pub fn placeholder(mut self, text: impl Into<String>) -> Self {
        self.hints.placeholder = Some(text.into());
        self
    }

    pub fn helper_text(mut self, text: impl Into<String>) -> Self {
        self.hints.helper_text = Some(text.into());
        self
    }

    pub fn information(mut self, text: impl Into<String>) -> Self {
        self.hints.information = Some(text.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.hints.disabled = true;
        self
    }

    pub fn span(mut self, columns: u16) -> Self {
        self.hints.span = Some(columns);
        self
    }

    pub fn auto_fill(mut self, hint: impl Into<String>) -> Self {
        self.hints.auto_fill = Some(hint.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.hints.direction = Some(direction);
        self
    }

    pub fn validator<F>(mut self, check: F) -> Self
    where
        F: Fn(&str, &FieldDescriptor, &FormState) -> Vec<String> + Send + Sync + 'static,
    {
        self.validator = Some(FieldValidator::new(check));
        self
    }

    pub fn choices(&self) -> &[ChoiceOption] {
        self.constraints.options.as_deref().unwrap_or(&[])
    }

    /// Checkbox groups hold a list when declared with a list initial value
    /// and a single checked value otherwise.
    pub fn is_multiple(&self) -> bool {
        match self.tag {
            FieldTag::Checkbox => matches!(self.initial, FieldValue::List(_)),
            _ => self.tag.base_shape() == ValueShape::List,
        }
    }

    pub fn value_shape(&self) -> ValueShape {
        match self.tag {
            FieldTag::Checkbox if self.is_multiple() => ValueShape::List,
            FieldTag::Checkbox => ValueShape::Text,
            _ => self.tag.base_shape(),
        }
    }

    /// Name used in generated messages: the label, or the field name when
    /// no label was declared.
    pub fn display_label<'a>(&'a self, field: &'a str) -> &'a str {
        if self.label.is_empty() { field } else { &self.label }
    }

    /// Convert a runtime value into this field's canonical shape. Range
    /// values are clamped into their bounds.
    pub fn coerce(&self, field: &str, value: FieldValue) -> std::result::Result<FieldValue, ValueError> {
        let coerced = self.value_shape().coerce(value).map_err(|err| match err {
            Coercion::Shape(found) => ValueError::Shape {
                field: field.to_string(),
                tag: self.tag.to_string(),
                found,
            },
            Coercion::NotNumeric(input) => ValueError::NotNumeric {
                field: field.to_string(),
                input,
            },
            Coercion::NotBoolean(input) => ValueError::NotBoolean {
                field: field.to_string(),
                input,
            },
        })?;

        match (&self.tag, coerced) {
            (FieldTag::Range, FieldValue::Number(n)) => {
                let min = self.constraints.min.unwrap_or(f64::NEG_INFINITY);
                let max = self.constraints.max.unwrap_or(f64::INFINITY);
                Ok(FieldValue::Number(n.clamp(min, max)))
            }
            (_, other) => Ok(other),
        }
    }

    fn check(&self, field: &str) -> std::result::Result<(), SchemaError> {
        if self.tag.requires_options() && self.constraints.options.is_none() {
            return Err(SchemaError::MissingOptions {
                field: field.to_string(),
                tag: self.tag.to_string(),
            });
        }

        if !self.initial.fits(self.value_shape()) {
            return Err(SchemaError::InitialShape {
                field: field.to_string(),
                tag: self.tag.to_string(),
                found: self.initial.kind_name(),
            });
        }

        let numbers = [
            ("min", self.constraints.min),
            ("max", self.constraints.max),
            ("step", self.constraints.step),
            ("initial value", self.initial.as_number()),
        ];
        for (what, number) in numbers {
            if let Some(value) = number.filter(|n| !n.is_finite()) {
                return Err(SchemaError::NonFinite {
                    field: field.to_string(),
                    what,
                    value,
                });
            }
        }

        if self.tag == FieldTag::Range {
            let (Some(min), Some(max)) = (self.constraints.min, self.constraints.max) else {
                return Err(SchemaError::MissingBounds {
                    field: field.to_string(),
                });
            };
            if min > max {
                return Err(SchemaError::InvertedBounds {
                    field: field.to_string(),
                    min,
                    max,
                });
            }
            if let FieldValue::Number(value) = self.initial {
                if value < min || value > max {
                    return Err(SchemaError::InitialOutOfBounds {
                        field: field.to_string(),
                        value,
                        min,
                        max,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Ordered, immutable mapping from field name to descriptor.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: Vec<(String, FieldDescriptor)>,
    index: HashMap<String, usize>,
}

impl Schema {
    /// Bind a list of fields, rejecting malformed descriptors.
    pub fn new<I, S>(fields: I) -> std::result::Result<Self, SchemaError>
    where
        I: IntoIterator<Item = (S, FieldDescriptor)>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        let mut index = HashMap::new();
        for (name, descriptor) in fields {
            let name = name.into();
            if name.is_empty() {
                return Err(SchemaError::EmptyFieldName);
            }
            if index.contains_key(&name) {
                return Err(SchemaError::DuplicateField(name));
            }
            descriptor.check(&name)?;
            index.insert(name.clone(), entries.len());
            entries.push((name, descriptor));
        }
        Ok(Self {
            fields: entries,
            index,
        })
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Parse the schema literal from JSON. Key order is field order.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let object: serde_json::Map<String, Value> = serde_json::from_value(value)?;
        let mut fields = Vec::with_capacity(object.len());
        for (name, raw) in object {
            let descriptor: FieldDescriptor = serde_json::from_value(raw)?;
            fields.push((name, descriptor));
        }
        Ok(Self::new(fields)?)
    }

    pub fn get(&self, field: &str) -> Option<&FieldDescriptor> {
        self.index.get(field).map(|&idx| &self.fields[idx].1)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.index.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(name, d)| (name.as_str(), d))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Values seeded from every descriptor's initial value.
    pub fn initial_values(&self) -> FormValues {
        FormValues::from_entries(
            self.fields
                .iter()
                .map(|(name, d)| (name.clone(), d.initial.clone())),
        )
    }
}

#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<(String, FieldDescriptor)>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, descriptor: FieldDescriptor) -> Self {
        self.fields.push((name.into(), descriptor));
        self
    }

    pub fn build(self) -> std::result::Result<Schema, SchemaError> {
        Schema::new(self.fields)
    }
}
