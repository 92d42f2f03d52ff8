use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

use crate::error::Result;
use crate::form::FormInstance;
use crate::schema::{ChoiceOption, FieldValue};

/// Whether an input handled an event or let it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Consumed,
}

fn selected(form: &FormInstance, field: &str) -> Vec<String> {
    match form.value(field) {
        Some(FieldValue::List(items)) => items.clone(),
        Some(FieldValue::Text(text)) if !text.is_empty() => vec![text.clone()],
        _ => Vec::new(),
    }
}

/// Flip `value` in a checkbox group.
///
/// Multiple groups add or remove it from the list. Single groups set it, or
/// clear the field when it is already the checked value.
pub fn toggle_option(form: &mut FormInstance, field: &str, value: &str) -> Result<()> {
    let next = if form.descriptor(field)?.is_multiple() {
        let mut items = selected(form, field);
        match items.iter().position(|item| item == value) {
            Some(index) => {
                items.remove(index);
            }
            None => items.push(value.to_string()),
        }
        FieldValue::List(items)
    } else if form.value(field).and_then(FieldValue::as_text) == Some(value) {
        FieldValue::Absent
    } else {
        FieldValue::text(value)
    };
    form.set_field_value(field, next)
}

/// Pick the single value of a radio group or select.
pub fn select_option(form: &mut FormInstance, field: &str, value: &str) -> Result<()> {
    form.set_field_value(field, value)
}

/// Local state of a multi-select: the filter being typed and the highlighted
/// suggestion. Only committed picks reach the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiSelectInput {
    filter: String,
    active: usize,
}

impl MultiSelectInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn set_filter(&mut self, filter: impl Into<String>) {
        self.filter = filter.into();
        self.active = 0;
    }

    /// Options whose label contains the filter, case-insensitively, minus
    /// those already picked.
    pub fn suggestions(&self, form: &FormInstance, field: &str) -> Result<Vec<ChoiceOption>> {
        let picked = selected(form, field);
        let needle = self.filter.to_lowercase();
        Ok(form
            .descriptor(field)?
            .choices()
            .iter()
            .filter(|option| !picked.contains(&option.value))
            .filter(|option| option.label.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    /// The suggestion list shows only while something is typed.
    pub fn is_open(&self) -> bool {
        !self.filter.is_empty()
    }

    pub fn next(&mut self, count: usize) {
        if count > 0 {
            self.active = (self.active + 1) % count;
        }
    }

    pub fn previous(&mut self, count: usize) {
        if count > 0 {
            self.active = (self.active + count - 1) % count;
        }
    }

    pub fn pick(&mut self, form: &mut FormInstance, field: &str, value: &str) -> Result<()> {
        let mut items = selected(form, field);
        if !items.iter().any(|item| item == value) {
            items.push(value.to_string());
        }
        form.set_field_value(field, FieldValue::List(items))?;
        self.set_filter("");
        Ok(())
    }

    /// Pick the highlighted suggestion. Returns whether anything was picked.
    pub fn commit_active(&mut self, form: &mut FormInstance, field: &str) -> Result<bool> {
        let suggestions = self.suggestions(form, field)?;
        match suggestions.get(self.active) {
            Some(option) => {
                self.pick(form, field, &option.value)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn remove(&mut self, form: &mut FormInstance, field: &str, value: &str) -> Result<()> {
        let items: Vec<_> = selected(form, field)
            .into_iter()
            .filter(|item| item != value)
            .collect();
        form.set_field_value(field, FieldValue::List(items))
    }

    pub fn handle_key(
        &mut self,
        form: &mut FormInstance,
        field: &str,
        key: &KeyEvent,
    ) -> Result<EventFlow> {
        if key.kind != KeyEventKind::Press {
            return Ok(EventFlow::Continue);
        }

        match key.code {
            KeyCode::Char(ch) => {
                self.filter.push(ch);
                self.active = 0;
                Ok(EventFlow::Consumed)
            }
            KeyCode::Backspace => {
                if self.filter.pop().is_none() {
                    if let Some(last) = selected(form, field).pop() {
                        self.remove(form, field, &last)?;
                    }
                }
                self.active = 0;
                Ok(EventFlow::Consumed)
            }
            KeyCode::Down if self.is_open() => {
                let count = self.suggestions(form, field)?.len();
                self.next(count);
                Ok(EventFlow::Consumed)
            }
            KeyCode::Up if self.is_open() => {
                let count = self.suggestions(form, field)?.len();
                self.previous(count);
                Ok(EventFlow::Consumed)
            }
            KeyCode::Enter if self.is_open() => {
                self.commit_active(form, field)?;
                Ok(EventFlow::Consumed)
            }
            _ => Ok(EventFlow::Continue),
        }
    }
}

/// Local buffer of a tag editor. A trailing comma or Enter commits it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagsInput {
    buffer: String,
}

impl TagsInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn input(&mut self, form: &mut FormInstance, field: &str, text: &str) -> Result<()> {
        match text.strip_suffix(',') {
            Some(head) => {
                self.buffer = head.to_string();
                self.commit(form, field).map(|_| ())
            }
            None => {
                self.buffer = text.to_string();
                Ok(())
            }
        }
    }

    /// Add the trimmed buffer as a tag. Empty and duplicate entries are
    /// dropped. Returns whether a tag was added.
    pub fn commit(&mut self, form: &mut FormInstance, field: &str) -> Result<bool> {
        let tag = self.buffer.trim().to_string();
        self.buffer.clear();
        let mut items = selected(form, field);
        if tag.is_empty() || items.contains(&tag) {
            return Ok(false);
        }
        items.push(tag);
        form.set_field_value(field, FieldValue::List(items))?;
        Ok(true)
    }

    pub fn remove(&mut self, form: &mut FormInstance, field: &str, tag: &str) -> Result<()> {
        let items: Vec<_> = selected(form, field)
            .into_iter()
            .filter(|item| item != tag)
            .collect();
        form.set_field_value(field, FieldValue::List(items))
    }

    pub fn handle_key(
        &mut self,
        form: &mut FormInstance,
        field: &str,
        key: &KeyEvent,
    ) -> Result<EventFlow> {
        if key.kind != KeyEventKind::Press {
            return Ok(EventFlow::Continue);
        }

        match key.code {
            KeyCode::Char(',') | KeyCode::Enter => {
                self.commit(form, field)?;
                Ok(EventFlow::Consumed)
            }
            KeyCode::Char(ch) => {
                self.buffer.push(ch);
                Ok(EventFlow::Consumed)
            }
            KeyCode::Backspace => {
                if self.buffer.pop().is_none() {
                    if let Some(last) = selected(form, field).pop() {
                        self.remove(form, field, &last)?;
                    }
                }
                Ok(EventFlow::Consumed)
            }
            _ => Ok(EventFlow::Continue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FormValues, SubmitResult};
    use crate::schema::{FieldDescriptor, Schema};
    use crossterm::event::KeyModifiers;
    use std::sync::Arc;

    fn form() -> FormInstance {
        let schema = Schema::builder()
            .field(
                "letters",
                FieldDescriptor::checkbox("Letters", ["a", "b"]).initial(Vec::<String>::new()),
            )
            .field(
                "agree",
                FieldDescriptor::checkbox("Agree", ["yes"]).initial(FieldValue::Absent),
            )
            .field("size", FieldDescriptor::radio("Size", ["s", "m"]))
            .field(
                "langs",
                FieldDescriptor::multi_select("Languages", [("Rust", "rs"), ("Ruby", "rb"), ("Go", "go")]),
            )
            .field("labels", FieldDescriptor::tags("Labels"))
            .build()
            .unwrap();
        FormInstance::new(Arc::new(schema), |_: &FormValues| -> SubmitResult { Ok(()) })
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn toggling_a_checkbox_option_twice_restores_the_list() {
        let mut form = form();
        toggle_option(&mut form, "letters", "a").unwrap();
        assert_eq!(form.value("letters"), Some(&FieldValue::list(["a"])));
        toggle_option(&mut form, "letters", "a").unwrap();
        assert_eq!(form.value("letters"), Some(&FieldValue::List(vec![])));
    }

    #[test]
    fn single_checkbox_toggles_between_value_and_absent() {
        let mut form = form();
        toggle_option(&mut form, "agree", "yes").unwrap();
        assert_eq!(form.value("agree"), Some(&FieldValue::text("yes")));
        toggle_option(&mut form, "agree", "yes").unwrap();
        assert_eq!(form.value("agree"), Some(&FieldValue::Absent));
    }

    #[test]
    fn radio_selection_replaces_the_value() {
        let mut form = form();
        select_option(&mut form, "size", "s").unwrap();
        select_option(&mut form, "size", "m").unwrap();
        assert_eq!(form.value("size"), Some(&FieldValue::text("m")));
    }

    #[test]
    fn multi_select_filters_and_hides_picked_options() {
        let mut form = form();
        let mut input = MultiSelectInput::new();
        assert!(!input.is_open());

        input.set_filter("ru");
        let labels: Vec<_> = input
            .suggestions(&form, "langs")
            .unwrap()
            .into_iter()
            .map(|o| o.label)
            .collect();
        assert_eq!(labels, vec!["Rust", "Ruby"]);

        input.next(2);
        assert_eq!(input.active(), 1);
        assert!(input.commit_active(&mut form, "langs").unwrap());
        assert_eq!(form.value("langs"), Some(&FieldValue::list(["rb"])));
        assert_eq!(input.filter(), "");

        input.set_filter("r");
        let values: Vec<_> = input
            .suggestions(&form, "langs")
            .unwrap()
            .into_iter()
            .map(|o| o.value)
            .collect();
        assert_eq!(values, vec!["rs"]);
    }

    #[test]
    fn multi_select_keys_navigate_and_commit() {
        let mut form = form();
        let mut input = MultiSelectInput::new();
        assert_eq!(
            input.handle_key(&mut form, "langs", &press(KeyCode::Enter)).unwrap(),
            EventFlow::Continue
        );
        input.handle_key(&mut form, "langs", &press(KeyCode::Char('r'))).unwrap();
        input.handle_key(&mut form, "langs", &press(KeyCode::Up)).unwrap();
        assert_eq!(input.active(), 1);
        input.handle_key(&mut form, "langs", &press(KeyCode::Enter)).unwrap();
        assert_eq!(form.value("langs"), Some(&FieldValue::list(["rb"])));

        input.handle_key(&mut form, "langs", &press(KeyCode::Backspace)).unwrap();
        assert_eq!(form.value("langs"), Some(&FieldValue::List(vec![])));
    }

    #[test]
    fn tags_commit_on_comma_and_skip_duplicates() {
        let mut form = form();
        let mut tags = TagsInput::new();
        tags.input(&mut form, "labels", "urgent").unwrap();
        assert_eq!(tags.buffer(), "urgent");
        assert_eq!(form.value("labels"), Some(&FieldValue::List(vec![])));

        tags.input(&mut form, "labels", "urgent,").unwrap();
        tags.input(&mut form, "labels", " urgent ,").unwrap();
        tags.input(&mut form, "labels", " ,").unwrap();
        assert_eq!(form.value("labels"), Some(&FieldValue::list(["urgent"])));
        assert_eq!(tags.buffer(), "");

        for ch in "bug".chars() {
            tags.handle_key(&mut form, "labels", &press(KeyCode::Char(ch))).unwrap();
        }
        tags.handle_key(&mut form, "labels", &press(KeyCode::Enter)).unwrap();
        assert_eq!(form.value("labels"), Some(&FieldValue::list(["urgent", "bug"])));

        tags.remove(&mut form, "labels", "urgent").unwrap();
        assert_eq!(form.value("labels"), Some(&FieldValue::list(["bug"])));
    }
}
