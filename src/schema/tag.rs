use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Discriminant of a field descriptor. Decides the value shape and the
/// renderer a field is dispatched to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldTag {
    Text,
    Email,
    Search,
    Number,
    Password,
    Date,
    DateTime,
    Time,
    Week,
    Month,
    Telephone,
    TextArea,
    Checkbox,
    Radio,
    Switch,
    Range,
    Color,
    Select,
    MultiSelect,
    Tags,
    /// Host-defined tag, dispatched to whatever renderer the host registers.
    Custom(String),
}

/// Canonical runtime shape held by a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    Text,
    Number,
    Bool,
    List,
    Any,
}

impl FieldTag {
    /// Every built-in tag, in declaration order.
    pub const BUILTIN: [FieldTag; 20] = [
        FieldTag::Text,
        FieldTag::Email,
        FieldTag::Search,
        FieldTag::Number,
        FieldTag::Password,
        FieldTag::Date,
        FieldTag::DateTime,
        FieldTag::Time,
        FieldTag::Week,
        FieldTag::Month,
        FieldTag::Telephone,
        FieldTag::TextArea,
        FieldTag::Checkbox,
        FieldTag::Radio,
        FieldTag::Switch,
        FieldTag::Range,
        FieldTag::Color,
        FieldTag::Select,
        FieldTag::MultiSelect,
        FieldTag::Tags,
    ];

    /// Tag by name. Builtin names resolve to their builtin variant, so a
    /// tag built here matches one parsed from a schema literal.
    pub fn custom(name: impl Into<String>) -> Self {
        FieldTag::from(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            FieldTag::Text => "text",
            FieldTag::Email => "email",
            FieldTag::Search => "search",
            FieldTag::Number => "number",
            FieldTag::Password => "password",
            FieldTag::Date => "date",
            FieldTag::DateTime => "datetime",
            FieldTag::Time => "time",
            FieldTag::Week => "week",
            FieldTag::Month => "month",
            FieldTag::Telephone => "telephone",
            FieldTag::TextArea => "textarea",
            FieldTag::Checkbox => "checkbox",
            FieldTag::Radio => "radio",
            FieldTag::Switch => "switch",
            FieldTag::Range => "range",
            FieldTag::Color => "color",
            FieldTag::Select => "select",
            FieldTag::MultiSelect => "multi-select",
            FieldTag::Tags => "tags",
            FieldTag::Custom(name) => name,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, FieldTag::Custom(_))
    }

    /// Choice fields must declare `options`.
    pub fn requires_options(&self) -> bool {
        matches!(
            self,
            FieldTag::Checkbox | FieldTag::Radio | FieldTag::Select | FieldTag::MultiSelect
        )
    }

    /// Shape implied by the tag alone. Checkbox fields are refined by their
    /// initial value, see [`crate::schema::FieldDescriptor::value_shape`].
    pub fn base_shape(&self) -> ValueShape {
        match self {
            FieldTag::Number | FieldTag::Range => ValueShape::Number,
            FieldTag::Switch => ValueShape::Bool,
            FieldTag::MultiSelect | FieldTag::Tags => ValueShape::List,
            FieldTag::Custom(_) => ValueShape::Any,
            _ => ValueShape::Text,
        }
    }

    /// Native input kind a host toolkit would use for single-primitive tags.
    pub fn input_kind(&self) -> &'static str {
        match self {
            FieldTag::Email => "email",
            FieldTag::Search => "search",
            FieldTag::Number => "number",
            FieldTag::Password => "password",
            FieldTag::Date => "date",
            FieldTag::DateTime => "datetime-local",
            FieldTag::Time => "time",
            FieldTag::Week => "week",
            FieldTag::Month => "month",
            FieldTag::Telephone => "tel",
            FieldTag::TextArea => "textarea",
            FieldTag::Range => "range",
            FieldTag::Color => "color",
            FieldTag::Checkbox => "checkbox",
            FieldTag::Radio => "radio",
            _ => "text",
        }
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldTag {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = FieldTag::BUILTIN
            .iter()
            .find(|tag| tag.as_str() == s)
            .cloned()
            .unwrap_or_else(|| FieldTag::Custom(s.to_string()));
        Ok(tag)
    }
}

impl From<String> for FieldTag {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(tag) => tag,
            Err(never) => match never {},
        }
    }
}

impl From<FieldTag> for String {
    fn from(tag: FieldTag) -> Self {
        tag.as_str().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_tags_round_trip_through_strings() {
        for tag in FieldTag::BUILTIN.iter() {
            let parsed: FieldTag = tag.as_str().parse().unwrap();
            assert_eq!(&parsed, tag);
        }
    }

    #[test]
    fn unknown_names_become_custom_tags() {
        let tag: FieldTag = "image".parse().unwrap();
        assert_eq!(tag, FieldTag::custom("image"));
        assert!(tag.is_custom());
        assert_eq!(tag.base_shape(), ValueShape::Any);
    }

    #[test]
    fn serde_uses_kebab_names() {
        let tag: FieldTag = serde_json::from_str("\"multi-select\"").unwrap();
        assert_eq!(tag, FieldTag::MultiSelect);
        assert_eq!(serde_json::to_string(&FieldTag::DateTime).unwrap(), "\"datetime\"");
    }

    #[test]
    fn custom_constructor_resolves_builtin_names() {
        assert_eq!(FieldTag::custom("text"), FieldTag::Text);
        assert_eq!(FieldTag::custom("multi-select"), FieldTag::MultiSelect);
        assert_eq!(FieldTag::custom("image"), FieldTag::Custom("image".into()));
        assert!(!FieldTag::custom("text").is_custom());
    }

    #[test]
    fn choice_tags_require_options() {
        assert!(FieldTag::Radio.requires_options());
        assert!(FieldTag::MultiSelect.requires_options());
        assert!(!FieldTag::Tags.requires_options());
        assert!(!FieldTag::Switch.requires_options());
    }
}
