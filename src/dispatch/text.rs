//! Plain-text renderers for every built-in tag.
//!
//! Output is a single string per control, suitable for a terminal line.
//! Widths are measured after stripping ANSI escapes so styled labels pad
//! correctly.

use unicode_width::UnicodeWidthChar;

use crate::schema::{ChoiceOption, Direction, FieldTag, FieldValue};

use super::core::{RenderInput, RendererTable};
use super::frame::{FormView, FrameFooter};

pub const FALLBACK_TEXT: &str = "Nothing to render";
const RANGE_SLOTS: usize = 10;

/// Display width of `text` once ANSI escapes are removed.
pub fn display_width(text: &str) -> usize {
    let clean = strip_ansi_escapes::strip(text);
    let clean = String::from_utf8_lossy(&clean);
    unicode_width::UnicodeWidthStr::width(&*clean)
}

/// Cut `text` to at most `width` columns, ending with `…` when cut.
pub fn fit_width(text: &str, width: usize) -> String {
    if display_width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let clean = strip_ansi_escapes::strip(text);
    let clean = String::from_utf8_lossy(&clean);
    let mut out = String::new();
    let mut used = 0;
    for ch in clean.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > width - 1 {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

fn boxed(input: &RenderInput<'_>, shown: String) -> String {
    if shown.is_empty() {
        let placeholder = input.props.placeholder.clone().unwrap_or_default();
        format!("[{placeholder}]")
    } else {
        format!("[{shown}]")
    }
}

fn line_input(input: &RenderInput<'_>) -> String {
    boxed(input, input.props.value.display())
}

fn password(input: &RenderInput<'_>) -> String {
    let masked = "•".repeat(input.props.value.display().chars().count());
    boxed(input, masked)
}

fn text_area(input: &RenderInput<'_>) -> String {
    let text = input.props.value.display();
    if text.is_empty() {
        return line_input(input);
    }
    text.lines().map(|line| format!("| {line}")).collect::<Vec<_>>().join("\n")
}

fn group(input: &RenderInput<'_>, items: Vec<String>) -> String {
    let sep = match input.descriptor.hints.direction {
        Some(Direction::Column) => "\n",
        _ => "  ",
    };
    items.join(sep)
}

fn is_checked(value: &FieldValue, option: &ChoiceOption) -> bool {
    match value {
        FieldValue::List(items) => items.contains(&option.value),
        FieldValue::Text(text) => *text == option.value,
        _ => false,
    }
}

fn checkbox(input: &RenderInput<'_>) -> String {
    let value = input.value();
    let items = input
        .descriptor
        .choices()
        .iter()
        .map(|option| {
            let mark = if is_checked(value, option) { "x" } else { " " };
            format!("[{mark}] {}", option.label)
        })
        .collect();
    group(input, items)
}

fn radio(input: &RenderInput<'_>) -> String {
    let value = input.value();
    let items = input
        .descriptor
        .choices()
        .iter()
        .map(|option| {
            let mark = if is_checked(value, option) { "•" } else { " " };
            format!("({mark}) {}", option.label)
        })
        .collect();
    group(input, items)
}

fn switch(input: &RenderInput<'_>) -> String {
    match input.value().as_bool() {
        Some(true) => "[on]".to_string(),
        _ => "[off]".to_string(),
    }
}

fn range(input: &RenderInput<'_>) -> String {
    let constraints = &input.descriptor.constraints;
    let min = constraints.min.unwrap_or(0.0);
    let max = constraints.max.unwrap_or(min);
    let value = input.value().as_number().unwrap_or(min);
    let filled = if max > min {
        (((value - min) / (max - min)) * RANGE_SLOTS as f64).round() as usize
    } else {
        0
    };
    let filled = filled.min(RANGE_SLOTS);
    format!(
        "{min} [{}{}] {max} ({value})",
        "=".repeat(filled),
        "-".repeat(RANGE_SLOTS - filled)
    )
}

fn label_for<'a>(input: &'a RenderInput<'_>, value: &'a str) -> &'a str {
    input
        .descriptor
        .choices()
        .iter()
        .find(|option| option.value == value)
        .map(|option| option.label.as_str())
        .unwrap_or(value)
}

fn select(input: &RenderInput<'_>) -> String {
    match input.value().as_text().filter(|text| !text.is_empty()) {
        Some(value) => format!("[{} ▾]", label_for(input, value)),
        None => {
            let label = input.descriptor.display_label(input.field);
            let prompt = input
                .props
                .placeholder
                .clone()
                .unwrap_or_else(|| format!("Select {label}"));
            format!("[{prompt} ▾]")
        }
    }
}

fn multi_select(input: &RenderInput<'_>) -> String {
    match input.value().as_list() {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|value| format!("[{} ×]", label_for(input, value)))
            .collect::<Vec<_>>()
            .join(" "),
        _ => select(input),
    }
}

fn tags(input: &RenderInput<'_>) -> String {
    match input.value().as_list() {
        Some(items) if !items.is_empty() => items
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" "),
        _ => line_input(input),
    }
}

fn color(input: &RenderInput<'_>) -> String {
    let value = input.props.value.display();
    if value.is_empty() {
        "[■ none]".to_string()
    } else {
        format!("[■ {value}]")
    }
}

/// Table covering every built-in tag with the text renderers above.
pub fn text_renderers() -> RendererTable<String> {
    let mut table = RendererTable::new(|_| FALLBACK_TEXT.to_string());
    for tag in [
        FieldTag::Text,
        FieldTag::Email,
        FieldTag::Search,
        FieldTag::Number,
        FieldTag::Date,
        FieldTag::DateTime,
        FieldTag::Time,
        FieldTag::Week,
        FieldTag::Month,
        FieldTag::Telephone,
    ] {
        table.register(tag, line_input);
    }
    table
        .register(FieldTag::Password, password)
        .register(FieldTag::TextArea, text_area)
        .register(FieldTag::Checkbox, checkbox)
        .register(FieldTag::Radio, radio)
        .register(FieldTag::Switch, switch)
        .register(FieldTag::Range, range)
        .register(FieldTag::Color, color)
        .register(FieldTag::Select, select)
        .register(FieldTag::MultiSelect, multi_select)
        .register(FieldTag::Tags, tags);
    table
}

/// Lay a rendered form out as lines no wider than `width`.
pub fn render_text(view: &FormView<String>, width: usize) -> String {
    let mut lines = Vec::new();
    if let Some(title) = &view.title {
        lines.push(title.clone());
    }
    if let Some(description) = &view.description {
        lines.push(description.clone());
    }
    if !lines.is_empty() {
        lines.push(String::new());
    }

    for rendered in &view.fields {
        let frame = &rendered.frame;
        let mut label = frame.label_text();
        if frame.information.is_some() {
            label.push_str(" (i)");
        }
        lines.push(label);
        lines.extend(rendered.control.lines().map(|line| format!("  {line}")));
        match &frame.footer {
            FrameFooter::Errors(errors) => {
                lines.extend(errors.iter().map(|error| format!("  ! {error}")));
            }
            FrameFooter::Helper(helper) => lines.push(format!("  {helper}")),
            FrameFooter::Empty => {}
        }
    }

    lines.push(if view.submit_enabled {
        "[ Submit ]".to_string()
    } else {
        "[ Submit ] (disabled)".to_string()
    });

    lines
        .iter()
        .map(|line| fit_width(line, width))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::{FormInstance, FormValues, SubmitResult};
    use crate::schema::{FieldDescriptor, Schema};
    use std::sync::Arc;

    fn form() -> FormInstance {
        let schema = Schema::builder()
            .field("name", FieldDescriptor::text("Name").required().placeholder("Your name"))
            .field("secret", FieldDescriptor::new(FieldTag::Password, "Secret"))
            .field("subscribe", FieldDescriptor::switch("Subscribe"))
            .field("volume", FieldDescriptor::range("Volume", 0.0, 10.0))
            .field("size", FieldDescriptor::select("Size", [("Small", "s"), ("Large", "l")]))
            .field(
                "letters",
                FieldDescriptor::checkbox("Letters", ["a", "b"]).direction(Direction::Row),
            )
            .field("labels", FieldDescriptor::tags("Labels"))
            .field("avatar", FieldDescriptor::new(FieldTag::custom("image"), "Avatar"))
            .build()
            .unwrap();
        FormInstance::new(Arc::new(schema), |_: &FormValues| -> SubmitResult { Ok(()) })
    }

    fn control(form: &FormInstance, field: &str) -> String {
        text_renderers().render_field(form, field).unwrap().control
    }

    #[test]
    fn every_builtin_tag_has_a_renderer() {
        assert!(text_renderers().missing_builtins().is_empty());
    }

    #[test]
    fn controls_reflect_current_values() {
        let mut form = form();
        assert_eq!(control(&form, "name"), "[Your name]");
        assert_eq!(control(&form, "size"), "[Select Size ▾]");
        assert_eq!(control(&form, "subscribe"), "[off]");
        assert_eq!(control(&form, "volume"), "0 [----------] 10 (0)");

        form.set_field_value("name", "Ada").unwrap();
        form.set_field_value("secret", "hunter2").unwrap();
        form.set_field_value("subscribe", true).unwrap();
        form.set_field_value("volume", 5.0).unwrap();
        form.set_field_value("size", "l").unwrap();
        form.set_field_value("letters", FieldValue::list(["b"])).unwrap();
        form.set_field_value("labels", FieldValue::list(["x", "y"])).unwrap();

        assert_eq!(control(&form, "name"), "[Ada]");
        assert_eq!(control(&form, "secret"), "[•••••••]");
        assert_eq!(control(&form, "subscribe"), "[on]");
        assert_eq!(control(&form, "volume"), "0 [=====-----] 10 (5)");
        assert_eq!(control(&form, "size"), "[Large ▾]");
        assert_eq!(control(&form, "letters"), "[ ] a  [x] b");
        assert_eq!(control(&form, "labels"), "#x #y");
    }

    #[test]
    fn unknown_tags_render_the_placeholder() {
        assert_eq!(control(&form(), "avatar"), FALLBACK_TEXT);
    }

    #[test]
    fn text_layout_shows_errors_and_disabled_submit() {
        let mut form = form();
        form.validate();
        let view = text_renderers()
            .render_form(&form)
            .titled(Some("Profile".into()), None);
        let text = render_text(&view, 80);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "Profile");
        assert_eq!(lines[2], "Name *");
        assert_eq!(lines[4], "  ! Name is required");
        assert_eq!(lines.last(), Some(&"[ Submit ] (disabled)"));
    }

    #[test]
    fn width_helpers_ignore_ansi_and_truncate() {
        assert_eq!(display_width("\u{1b}[31mred\u{1b}[0m"), 3);
        assert_eq!(display_width("日本"), 4);
        assert_eq!(fit_width("abcdef", 4), "abc…");
        assert_eq!(fit_width("abc", 4), "abc");
        assert_eq!(fit_width("abc", 0), "");
    }
}
