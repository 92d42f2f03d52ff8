use crate::schema::FieldDescriptor;

/// What appears beneath a field: its errors while it has any, otherwise the
/// helper text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameFooter {
    Errors(Vec<String>),
    Helper(String),
    Empty,
}

/// Shared decoration wrapped around every rendered control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFrame {
    pub field: String,
    pub label: String,
    pub required: bool,
    pub information: Option<String>,
    pub span: Option<u16>,
    pub footer: FrameFooter,
}

impl FieldFrame {
    pub fn build(field: &str, descriptor: &FieldDescriptor, errors: Option<&[String]>) -> Self {
        let footer = match (errors, &descriptor.hints.helper_text) {
            (Some(errors), _) if !errors.is_empty() => FrameFooter::Errors(errors.to_vec()),
            (_, Some(helper)) => FrameFooter::Helper(helper.clone()),
            _ => FrameFooter::Empty,
        };
        Self {
            field: field.to_string(),
            label: descriptor.display_label(field).to_string(),
            required: descriptor.required,
            information: descriptor.hints.information.clone(),
            span: descriptor.hints.span,
            footer,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.footer, FrameFooter::Errors(_))
    }

    /// Label with the required marker appended.
    pub fn label_text(&self) -> String {
        if self.required {
            format!("{} *", self.label)
        } else {
            self.label.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedField<O> {
    pub frame: FieldFrame,
    pub control: O,
}

/// A whole form, decorated and rendered in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct FormView<O> {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<RenderedField<O>>,
    pub submit_enabled: bool,
}

impl<O> FormView<O> {
    pub fn titled(mut self, title: Option<String>, description: Option<String>) -> Self {
        self.title = title;
        self.description = description;
        self
    }
}
