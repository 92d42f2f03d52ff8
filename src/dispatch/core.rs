use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DispatchError, Result};
use crate::form::{FieldProps, FormInstance, FormState};
use crate::schema::{FieldDescriptor, FieldTag, FieldValue, Schema};

use super::frame::{FieldFrame, FormView, RenderedField};

/// Everything a renderer may look at. Renderers are pure functions of this
/// input and must not reach for state outside it.
#[derive(Debug)]
pub struct RenderInput<'a> {
    pub field: &'a str,
    pub descriptor: &'a FieldDescriptor,
    pub state: &'a FormState,
    pub errors: Option<&'a [String]>,
    pub props: FieldProps,
}

impl<'a> RenderInput<'a> {
    pub fn new(form: &'a FormInstance, field: &'a str) -> Result<Self> {
        let descriptor = form.descriptor(field)?;
        Ok(Self {
            field,
            descriptor,
            state: form.state(),
            errors: form.field_errors(field),
            props: form.field_props(field)?,
        })
    }

    pub fn value(&self) -> &FieldValue {
        self.state.value(self.field).unwrap_or(&FieldValue::Absent)
    }

    pub fn has_errors(&self) -> bool {
        self.errors.is_some_and(|errors| !errors.is_empty())
    }
}

pub type Renderer<O> = Arc<dyn Fn(&RenderInput<'_>) -> O + Send + Sync>;

/// How a tag was resolved by the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Registered,
    Fallback,
}

/// Tag → renderer table with an explicit default arm.
///
/// Dispatch is total: a tag without a renderer goes to the fallback, which
/// conventionally renders a neutral placeholder. Use
/// [`RendererTable::ensure_covers`] to turn such gaps into errors.
pub struct RendererTable<O> {
    renderers: HashMap<FieldTag, Renderer<O>>,
    fallback: Renderer<O>,
}

impl<O> fmt::Debug for RendererTable<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<_> = self.renderers.keys().map(FieldTag::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("RendererTable").field("tags", &tags).finish()
    }
}

impl<O> RendererTable<O> {
    pub fn new<F>(fallback: F) -> Self
    where
        F: Fn(&RenderInput<'_>) -> O + Send + Sync + 'static,
    {
        Self {
            renderers: HashMap::new(),
            fallback: Arc::new(fallback),
        }
    }

    /// Register (or replace) the renderer for `tag`.
    pub fn register<F>(&mut self, tag: FieldTag, renderer: F) -> &mut Self
    where
        F: Fn(&RenderInput<'_>) -> O + Send + Sync + 'static,
    {
        self.renderers.insert(tag, Arc::new(renderer));
        self
    }

    pub fn with<F>(mut self, tag: FieldTag, renderer: F) -> Self
    where
        F: Fn(&RenderInput<'_>) -> O + Send + Sync + 'static,
    {
        self.register(tag, renderer);
        self
    }

    pub fn unregister(&mut self, tag: &FieldTag) -> bool {
        self.renderers.remove(tag).is_some()
    }

    pub fn resolve(&self, tag: &FieldTag) -> Resolution {
        if self.renderers.contains_key(tag) {
            Resolution::Registered
        } else {
            Resolution::Fallback
        }
    }

    pub fn render(&self, input: &RenderInput<'_>) -> O {
        let renderer = self
            .renderers
            .get(&input.descriptor.tag)
            .unwrap_or(&self.fallback);
        renderer(input)
    }

    /// Built-in tags that would hit the fallback.
    pub fn missing_builtins(&self) -> Vec<FieldTag> {
        FieldTag::BUILTIN
            .iter()
            .filter(|tag| !self.renderers.contains_key(*tag))
            .cloned()
            .collect()
    }

    /// Fail if any field of `schema` would be rendered by the fallback.
    pub fn ensure_covers(&self, schema: &Schema) -> Result<()> {
        let missing: Vec<_> = schema
            .iter()
            .filter(|(_, d)| !self.renderers.contains_key(&d.tag))
            .map(|(name, d)| (name.to_string(), d.tag.to_string()))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(DispatchError::MissingRenderers(missing).into())
        }
    }

    /// Decorate and render one field.
    pub fn render_field(&self, form: &FormInstance, field: &str) -> Result<RenderedField<O>> {
        let input = RenderInput::new(form, field)?;
        let frame = FieldFrame::build(field, input.descriptor, input.errors);
        let control = self.render(&input);
        Ok(RenderedField { frame, control })
    }

    /// Render every field in schema order.
    pub fn render_form(&self, form: &FormInstance) -> FormView<O> {
        let fields = form
            .schema()
            .names()
            .filter_map(|name| self.render_field(form, name).ok())
            .collect();
        FormView {
            title: None,
            description: None,
            fields,
            submit_enabled: form.can_submit(),
        }
    }
}
