use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use blake3::Hash;
use serde::Serialize;
use serde::ser::SerializeMap;
use serde_json::{Value, json};

use crate::error::{FormError, Result};
use crate::logging::{FORM_TARGET, LogLevel, Logger, emit, json_kv};
use crate::metrics::{SharedMetrics, with_metrics};
use crate::schema::{FieldDescriptor, FieldValue, Schema};

use super::props::FieldProps;

/// Field name → ordered error messages. A missing key means no errors.
pub type FormErrors = BTreeMap<String, Vec<String>>;
/// Field name → interaction flag. A missing key means untouched.
pub type Touched = BTreeMap<String, bool>;

/// Error returned by a caller's submit handler. The engine passes it
/// through untouched.
pub type SubmitError = Box<dyn std::error::Error + Send + Sync>;
pub type SubmitResult = std::result::Result<(), SubmitError>;
pub type SubmitHandler = Box<dyn FnMut(&FormValues) -> SubmitResult + Send>;

type ValuesObserver = Box<dyn FnMut(&FormValues) + Send>;
type ErrorsObserver = Box<dyn FnMut(&FormErrors) + Send>;
type TouchedObserver = Box<dyn FnMut(&Touched) + Send>;

/// Current value of every schema field, in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormValues {
    entries: Vec<(String, FieldValue)>,
}

impl FormValues {
    pub(crate) fn from_entries(entries: impl IntoIterator<Item = (String, FieldValue)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Replace an existing entry. Unknown fields are ignored so the key set
    /// never drifts from the schema.
    fn replace(&mut self, field: &str, value: FieldValue) -> bool {
        match self.entries.iter_mut().find(|(name, _)| name == field) {
            Some(slot) => {
                slot.1 = value;
                true
            }
            None => false,
        }
    }
}

impl Serialize for FormValues {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// The mutable part of a form: values, errors, touched flags, and the
/// caller-managed submitting flag.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    values: FormValues,
    errors: FormErrors,
    touched: Touched,
    submitting: bool,
}

impl FormState {
    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn field_errors(&self, field: &str) -> Option<&[String]> {
        self.errors.get(field).map(Vec::as_slice)
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn touched(&self) -> &Touched {
        &self.touched
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.touched.get(field).copied().unwrap_or(false)
    }

    pub fn submitting(&self) -> bool {
        self.submitting
    }
}

/// Knobs shared by every form instance built with it.
#[derive(Clone)]
pub struct FormConfig {
    /// Re-run validation during [`FormInstance::settle`] whenever values changed.
    pub validate_on_change: bool,
    /// Optional structured logger.
    pub logger: Option<Logger>,
    /// Optional counters.
    pub metrics: Option<SharedMetrics>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            validate_on_change: true,
            logger: None,
            metrics: None,
        }
    }
}

impl fmt::Debug for FormConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormConfig")
            .field("validate_on_change", &self.validate_on_change)
            .field("logger", &self.logger.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Callbacks notified by [`FormInstance::settle`] when a map changed.
#[derive(Default)]
pub struct FormObservers {
    on_change: Option<ValuesObserver>,
    on_error: Option<ErrorsObserver>,
    on_blur: Option<TouchedObserver>,
}

impl FormObservers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_change(mut self, observer: impl FnMut(&FormValues) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(observer));
        self
    }

    pub fn on_error(mut self, observer: impl FnMut(&FormErrors) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(observer));
        self
    }

    pub fn on_blur(mut self, observer: impl FnMut(&Touched) + Send + 'static) -> Self {
        self.on_blur = Some(Box::new(observer));
        self
    }
}

/// What a settle pass found changed since the previous pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SettleReport {
    pub values_changed: bool,
    pub validated: bool,
    pub errors_changed: bool,
    pub touched_changed: bool,
}

impl SettleReport {
    pub fn changed(&self) -> bool {
        self.values_changed || self.errors_changed || self.touched_changed
    }
}

#[derive(Default)]
struct Fingerprints {
    values: Option<Hash>,
    errors: Option<Hash>,
    touched: Option<Hash>,
}

fn fingerprint<T: Serialize>(value: &T) -> Hash {
    blake3::hash(&serde_json::to_vec(value).unwrap_or_default())
}

/// Live state for one schema plus the terminal submit handler.
///
/// Mutations apply immediately. Derived work (re-validation, observer
/// notification) happens in [`FormInstance::settle`], which hosts call once
/// after each UI event has been dispatched.
pub struct FormInstance {
    schema: Arc<Schema>,
    initial: FormValues,
    state: FormState,
    on_submit: SubmitHandler,
    observers: FormObservers,
    config: FormConfig,
    fingerprints: Fingerprints,
}

impl fmt::Debug for FormInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormInstance")
            .field("fields", &self.schema.len())
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FormInstance {
    pub fn new<F>(schema: Arc<Schema>, on_submit: F) -> Self
    where
        F: FnMut(&FormValues) -> SubmitResult + Send + 'static,
    {
        Self::with_config(schema, FormConfig::default(), on_submit)
    }

    pub fn with_config<F>(schema: Arc<Schema>, config: FormConfig, on_submit: F) -> Self
    where
        F: FnMut(&FormValues) -> SubmitResult + Send + 'static,
    {
        Self::from_handler(schema, config, Box::new(on_submit))
    }

    pub fn from_handler(schema: Arc<Schema>, config: FormConfig, on_submit: SubmitHandler) -> Self {
        let initial = schema.initial_values();
        let state = FormState {
            values: initial.clone(),
            ..FormState::default()
        };
        Self {
            schema,
            initial,
            state,
            on_submit,
            observers: FormObservers::default(),
            config,
            fingerprints: Fingerprints::default(),
        }
    }

    pub fn with_observers(mut self, observers: FormObservers) -> Self {
        self.observers = observers;
        self
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    pub fn state(&self) -> &FormState {
        &self.state
    }

    pub fn values(&self) -> &FormValues {
        &self.state.values
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.state.values.get(field)
    }

    pub fn initial_values(&self) -> &FormValues {
        &self.initial
    }

    pub fn errors(&self) -> &FormErrors {
        &self.state.errors
    }

    pub fn field_errors(&self, field: &str) -> Option<&[String]> {
        self.state.field_errors(field)
    }

    pub fn touched(&self) -> &Touched {
        &self.state.touched
    }

    pub fn is_touched(&self, field: &str) -> bool {
        self.state.is_touched(field)
    }

    pub fn submitting(&self) -> bool {
        self.state.submitting
    }

    /// Owned by the caller; the engine never toggles it.
    pub fn set_submitting(&mut self, submitting: bool) {
        self.state.submitting = submitting;
    }

    /// The submit affordance is enabled only without errors and while no
    /// submission is in flight.
    pub fn can_submit(&self) -> bool {
        !self.state.has_errors() && !self.state.submitting
    }

    pub fn descriptor(&self, field: &str) -> Result<&FieldDescriptor> {
        self.schema
            .get(field)
            .ok_or_else(|| FormError::FieldNotFound(field.to_string()))
    }

    /// Replace one field's value after coercing it to the field's shape.
    /// Does not validate.
    pub fn set_field_value(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<()> {
        let value = self.descriptor(field)?.coerce(field, value.into())?;
        self.state.values.replace(field, value);
        emit(
            self.config.logger.as_ref(),
            LogLevel::Trace,
            FORM_TARGET,
            "field_changed",
            [json_kv("field", field)],
        );
        Ok(())
    }

    /// Append `message` to the field's error list.
    pub fn set_field_error(&mut self, field: &str, message: impl Into<String>) -> Result<()> {
        self.descriptor(field)?;
        self.state
            .errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
        Ok(())
    }

    pub fn set_field_touched(&mut self, field: &str, touched: bool) -> Result<()> {
        self.descriptor(field)?;
        self.state.touched.insert(field.to_string(), touched);
        Ok(())
    }

    /// Shared change handler: every renderer reports edits through here.
    pub fn handle_change(&mut self, field: &str, value: impl Into<FieldValue>) -> Result<()> {
        self.set_field_value(field, value)
    }

    /// Shared blur handler: leaving a field marks it touched.
    pub fn handle_blur(&mut self, field: &str) -> Result<()> {
        self.set_field_touched(field, true)
    }

    /// Rebuild the error map from scratch. Returns `true` when it is empty.
    pub fn validate(&mut self) -> bool {
        let mut errors = FormErrors::new();
        for (name, descriptor) in self.schema.iter() {
            let mut messages = Vec::new();
            let value = self.state.values.get(name).unwrap_or(&FieldValue::Absent);
            if descriptor.required && value.is_empty() {
                messages.push(format!("{} is required", descriptor.display_label(name)));
            }
            if let Some(validator) = &descriptor.validator {
                for message in validator.run(name, descriptor, &self.state) {
                    if !messages.contains(&message) {
                        messages.push(message);
                    }
                }
            }
            if !messages.is_empty() {
                errors.insert(name.to_string(), messages);
            }
        }

        let passed = errors.is_empty();
        emit(
            self.config.logger.as_ref(),
            LogLevel::Debug,
            FORM_TARGET,
            "validated",
            [
                json_kv("passed", passed),
                json_kv("fields_with_errors", errors.len()),
            ],
        );
        with_metrics(self.config.metrics.as_ref(), |m| m.record_validation(passed));
        self.state.errors = errors;
        passed
    }

    /// Validate, then hand the values to the submit handler only if
    /// validation passed. Returns whether the handler was invoked; a handler
    /// failure is returned as-is and `submitting` is left alone.
    pub fn submit(&mut self) -> std::result::Result<bool, SubmitError> {
        if !self.validate() {
            emit(
                self.config.logger.as_ref(),
                LogLevel::Info,
                FORM_TARGET,
                "submit_blocked",
                [json_kv("fields_with_errors", self.state.errors.len())],
            );
            with_metrics(self.config.metrics.as_ref(), |m| m.record_submission(false));
            return Ok(false);
        }

        with_metrics(self.config.metrics.as_ref(), |m| m.record_submission(true));
        emit(
            self.config.logger.as_ref(),
            LogLevel::Info,
            FORM_TARGET,
            "submitted",
            [json_kv("fields", self.state.values.len())],
        );
        (self.on_submit)(&self.state.values)?;
        Ok(true)
    }

    /// Restore initial values and forget every error and touched flag.
    pub fn reset_form(&mut self) {
        self.state.values = self.initial.clone();
        self.state.errors.clear();
        self.state.touched.clear();
        emit(
            self.config.logger.as_ref(),
            LogLevel::Debug,
            FORM_TARGET,
            "reset",
            std::iter::empty(),
        );
    }

    /// Renderer-facing props for one field. Reading never mutates state.
    pub fn field_props(&self, field: &str) -> Result<FieldProps> {
        let descriptor = self.descriptor(field)?;
        let value = self.state.values.get(field).unwrap_or(&FieldValue::Absent);
        Ok(FieldProps::derive(field, descriptor, value))
    }

    /// Follow-up pass after an event: re-validate if values changed (when
    /// configured) and notify observers of every map that changed. The first
    /// pass after construction treats everything as changed.
    pub fn settle(&mut self) -> SettleReport {
        let mut report = SettleReport::default();

        let values = fingerprint(&self.state.values);
        if self.fingerprints.values != Some(values) {
            self.fingerprints.values = Some(values);
            report.values_changed = true;
            if self.config.validate_on_change {
                self.validate();
                report.validated = true;
            }
            if let Some(observer) = self.observers.on_change.as_mut() {
                observer(&self.state.values);
            }
        }

        let errors = fingerprint(&self.state.errors);
        if self.fingerprints.errors != Some(errors) {
            self.fingerprints.errors = Some(errors);
            report.errors_changed = true;
            if let Some(observer) = self.observers.on_error.as_mut() {
                observer(&self.state.errors);
            }
        }

        let touched = fingerprint(&self.state.touched);
        if self.fingerprints.touched != Some(touched) {
            self.fingerprints.touched = Some(touched);
            report.touched_changed = true;
            if let Some(observer) = self.observers.on_blur.as_mut() {
                observer(&self.state.touched);
            }
        }

        if report.changed() {
            emit(
                self.config.logger.as_ref(),
                LogLevel::Trace,
                FORM_TARGET,
                "settled",
                [json_kv("report", json!(format!("{report:?}")))],
            );
        }
        report
    }
}
