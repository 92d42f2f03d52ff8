use serde::{Deserialize, Serialize};

use super::tag::ValueShape;

/// Runtime value of a single field.
///
/// `Absent` is the "nothing entered" state; together with the empty string
/// it is what the required check treats as empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Absent,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FieldValue::List(items.into_iter().map(Into::into).collect())
    }

    /// `Absent` or the empty string.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Absent => true,
            FieldValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Absent => "absent",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
            FieldValue::List(_) => "list",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether the value fits `shape` without conversion.
    pub fn fits(&self, shape: ValueShape) -> bool {
        matches!(
            (shape, self),
            (_, FieldValue::Absent)
                | (ValueShape::Any, _)
                | (ValueShape::Text, FieldValue::Text(_))
                | (ValueShape::Number, FieldValue::Number(_))
                | (ValueShape::Bool, FieldValue::Bool(_))
                | (ValueShape::List, FieldValue::List(_))
        )
    }
}

/// Why a value could not be coerced into a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Coercion {
    Shape(&'static str),
    NotNumeric(String),
    NotBoolean(String),
}

impl ValueShape {
    /// Canonical conversion of `value` into this shape.
    pub(crate) fn coerce(self, value: FieldValue) -> Result<FieldValue, Coercion> {
        match (self, value) {
            (_, FieldValue::Absent) => Ok(FieldValue::Absent),
            (ValueShape::Any, value) => Ok(value),
            (ValueShape::Text, FieldValue::Text(text)) => Ok(FieldValue::Text(text)),
            (ValueShape::Text, FieldValue::Number(n)) => Ok(FieldValue::Text(n.to_string())),
            (ValueShape::Text, FieldValue::Bool(b)) => Ok(FieldValue::Text(b.to_string())),
            (ValueShape::Number, FieldValue::Number(n)) => Ok(FieldValue::Number(n)),
            (ValueShape::Number, FieldValue::Text(text)) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Ok(FieldValue::Absent);
                }
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|n| n.is_finite())
                    .map(FieldValue::Number)
                    .ok_or(Coercion::NotNumeric(text))
            }
            (ValueShape::Bool, FieldValue::Bool(b)) => Ok(FieldValue::Bool(b)),
            (ValueShape::Bool, FieldValue::Text(text)) => match text.trim() {
                "true" | "on" | "1" => Ok(FieldValue::Bool(true)),
                "false" | "off" | "0" | "" => Ok(FieldValue::Bool(false)),
                _ => Err(Coercion::NotBoolean(text)),
            },
            (ValueShape::List, FieldValue::List(items)) => Ok(FieldValue::List(items)),
            (_, other) => Err(Coercion::Shape(other.kind_name())),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Absent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_means_absent_or_blank_text() {
        assert!(FieldValue::Absent.is_empty());
        assert!(FieldValue::text("").is_empty());
        assert!(!FieldValue::text(" ").is_empty());
        assert!(!FieldValue::Number(0.0).is_empty());
        assert!(!FieldValue::Bool(false).is_empty());
        assert!(!FieldValue::List(Vec::new()).is_empty());
    }

    #[test]
    fn number_shape_parses_text_and_blanks_to_absent() {
        assert_eq!(
            ValueShape::Number.coerce(FieldValue::text(" 42.5 ")),
            Ok(FieldValue::Number(42.5))
        );
        assert_eq!(
            ValueShape::Number.coerce(FieldValue::text("  ")),
            Ok(FieldValue::Absent)
        );
        assert_eq!(
            ValueShape::Number.coerce(FieldValue::text("abc")),
            Err(Coercion::NotNumeric("abc".into()))
        );
        assert_eq!(
            ValueShape::Number.coerce(FieldValue::text("NaN")),
            Err(Coercion::NotNumeric("NaN".into()))
        );
    }

    #[test]
    fn text_shape_stringifies_scalars_but_rejects_lists() {
        assert_eq!(
            ValueShape::Text.coerce(FieldValue::Number(5.0)),
            Ok(FieldValue::text("5"))
        );
        assert_eq!(
            ValueShape::Text.coerce(FieldValue::Bool(true)),
            Ok(FieldValue::text("true"))
        );
        assert_eq!(
            ValueShape::Text.coerce(FieldValue::list(["a"])),
            Err(Coercion::Shape("list"))
        );
    }

    #[test]
    fn bool_shape_accepts_switch_spellings() {
        assert_eq!(ValueShape::Bool.coerce("on".into()), Ok(FieldValue::Bool(true)));
        assert_eq!(ValueShape::Bool.coerce("0".into()), Ok(FieldValue::Bool(false)));
        assert_eq!(
            ValueShape::Bool.coerce("maybe".into()),
            Err(Coercion::NotBoolean("maybe".into()))
        );
    }

    #[test]
    fn untagged_serde_maps_json_kinds() {
        let values: Vec<FieldValue> =
            serde_json::from_str(r#"[null, true, 3, "x", ["a", "b"]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                FieldValue::Absent,
                FieldValue::Bool(true),
                FieldValue::Number(3.0),
                FieldValue::text("x"),
                FieldValue::list(["a", "b"]),
            ]
        );
        assert_eq!(serde_json::to_string(&FieldValue::Absent).unwrap(), "null");
    }
}
