use crate::property::{Property, PropertyValue, Reference};
use crate::ui::{Icons, Theme, theme};
use owo_colors::OwoColorize;
use std::fmt::Write;

pub fn header(text: &str) {
    println!("{} {}", Icons::ROCKET, text.style(theme().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(theme().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(theme().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(theme().dim.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(theme().dim.clone()), value);
}

/// Text form of a leaf value, `None` for containers
pub fn format_value(value: &PropertyValue) -> Option<String> {
    let text = match value {
        PropertyValue::Bool(v) => if *v { "True" } else { "False" }.to_string(),
        PropertyValue::Int8(v) => v.to_string(),
        PropertyValue::Int16(v) => v.to_string(),
        PropertyValue::Int32(v) => v.to_string(),
        PropertyValue::UInt8(v) => v.to_string(),
        PropertyValue::UInt16(v) => v.to_string(),
        PropertyValue::UInt32(v) => v.to_string(),
        PropertyValue::Float32(v) => v.to_string(),
        PropertyValue::Float64(v) => v.to_string(),
        PropertyValue::String(v) | PropertyValue::WideString(v) => format!("'{}'", v),
        PropertyValue::F32Vec2(v) => tuple(v),
        PropertyValue::F32Vec3(v) => tuple(v),
        PropertyValue::F32Vec4(v) => tuple(v),
        PropertyValue::S32Vec2(v) => tuple(v),
        PropertyValue::S32Vec3(v) => tuple(v),
        PropertyValue::S32Vec4(v) => tuple(v),
        PropertyValue::Color([r, g, b, a]) => format!("RGBA[{},{},{},{}]", r, g, b, a),
        PropertyValue::ObjectReference(r) => format!("~/{}", r.name),
        PropertyValue::ImportReference(r) => r.name.clone(),
        PropertyValue::Guid(v)
        | PropertyValue::PathReference(v)
        | PropertyValue::LocalisationHash(v)
        | PropertyValue::Hash(v) => v.clone(),
        PropertyValue::List(_) | PropertyValue::Map(_) | PropertyValue::Pair(_) => return None,
    };
    Some(text)
}

fn tuple<T: ToString>(values: &[T]) -> String {
    let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
    format!("({})", parts.join(", "))
}

/// Render a property tree, one node per line, children indented below their container
pub fn render_property(property: &Property, theme: &Theme) -> String {
    let mut out = String::new();
    let label = if property.name.is_empty() { "-" } else { property.name.as_str() };
    render_node(&mut out, label, property, 0, theme);
    out
}

fn render_node(out: &mut String, label: &str, property: &Property, depth: usize, theme: &Theme) {
    let indent = "  ".repeat(depth);
    let kind = property.kind();

    match &property.value {
        PropertyValue::List(items) => {
            let _ = writeln!(out, "{}{}: {} [{}]", indent, label.style(theme.name.clone()), kind.style(theme.kind.clone()), items.len());
            for (i, item) in items.iter().enumerate() {
                render_node(out, &format!("[{}]", i), item, depth + 1, theme);
            }
        }
        PropertyValue::Map(entries) => {
            let _ = writeln!(out, "{}{}: {} [{}]", indent, label.style(theme.name.clone()), kind.style(theme.kind.clone()), entries.len());
            for (key, value) in entries {
                render_node(out, "key", key, depth + 1, theme);
                render_node(out, "value", value, depth + 1, theme);
            }
        }
        PropertyValue::Pair(pair) => {
            let _ = writeln!(out, "{}{}: {}", indent, label.style(theme.name.clone()), kind.style(theme.kind.clone()));
            render_node(out, "first", &pair.0, depth + 1, theme);
            render_node(out, "second", &pair.1, depth + 1, theme);
        }
        PropertyValue::ObjectReference(reference) | PropertyValue::ImportReference(reference) => {
            let text = format_value(&property.value).unwrap_or_default();
            let _ = writeln!(
                out,
                "{}{}: {} = {}{}",
                indent,
                label.style(theme.name.clone()),
                kind.style(theme.kind.clone()),
                text.style(theme.reference.clone()),
                reference_marker(reference, theme)
            );
        }
        leaf => {
            let text = format_value(leaf).unwrap_or_default();
            let _ = writeln!(out, "{}{}: {} = {}", indent, label.style(theme.name.clone()), kind.style(theme.kind.clone()), text);
        }
    }
}

fn reference_marker(reference: &Reference, theme: &Theme) -> String {
    match reference.target {
        Some(id) => format!(" {} #{}", Icons::LINK, id).style(theme.muted.clone()).to_string(),
        None => format!(" {} unresolved", Icons::BROKEN_LINK).style(theme.warn.clone()).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_leaf_values() {
        assert_eq!(format_value(&PropertyValue::Bool(true)).unwrap(), "True");
        assert_eq!(format_value(&PropertyValue::F32Vec2([1.5, -2.0])).unwrap(), "(1.5, -2)");
        assert_eq!(format_value(&PropertyValue::Color([1, 2, 3, 4])).unwrap(), "RGBA[1,2,3,4]");
        assert_eq!(
            format_value(&PropertyValue::ObjectReference(Reference::unresolved("Tank"))).unwrap(),
            "~/Tank"
        );
        assert!(format_value(&PropertyValue::List(Vec::new())).is_none());
    }

    #[test]
    fn test_render_nested_tree() {
        let pair = PropertyValue::pair(
            Property::element(PropertyValue::Int32(1)),
            Property::element(PropertyValue::ObjectReference(Reference::resolved("Tank", 7))),
        );
        let property = Property::new(
            "Weapons",
            0,
            PropertyValue::List(vec![Property::element(PropertyValue::Map(vec![(
                Property::element(PropertyValue::String("main".to_string())),
                Property::element(pair),
            )]))]),
        );

        let text = render_property(&property, &Theme::plain());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Weapons: list [1]");
        assert_eq!(lines[1], "  [0]: map [1]");
        assert_eq!(lines[2], "    key: string = 'main'");
        assert_eq!(lines[3], "    value: pair");
        assert_eq!(lines[4], "      first: int32 = 1");
        assert!(lines[5].starts_with("      second: object_reference = ~/Tank"));
        assert!(lines[5].ends_with("#7"));
    }
}
