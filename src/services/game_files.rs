//! Text files read by the Haydee loader (`.mtl` materials and `.outfit` descriptors).
//!
//! Both use the engine's text data format: an `HD_DATA_TXT 300` header line
//! followed by named, brace-delimited blocks of tab-separated `key value;`
//! fields. Field order is preserved so output is byte-for-byte deterministic.

use crate::models::{ModDescriptor, Resolution};
use crate::services::layout;
use indexmap::IndexMap;
use regex::Regex;
use std::fmt::Write;

/// First line of every engine text file
pub const HD_HEADER: &str = "HD_DATA_TXT 300";

/// Category written for the only slot of a single-variant mod
pub const DEFAULT_SLOT_CATEGORY: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq)]
enum FieldValue {
    /// Written as `"..."`
    Text(String),
    /// Written verbatim (numbers, install-relative paths)
    Raw(String),
}

/// One block of the engine text format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdBlock {
    kind: String,
    fields: IndexMap<String, FieldValue>,
    children: Vec<HdBlock>,
}

impl HdBlock {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn text(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.fields
            .insert(key.to_string(), FieldValue::Text(sanitize(value.as_ref())));
        self
    }

    pub fn raw(mut self, key: &str, value: impl ToString) -> Self {
        self.fields
            .insert(key.to_string(), FieldValue::Raw(value.to_string()));
        self
    }

    pub fn child(mut self, block: HdBlock) -> Self {
        self.children.push(block);
        self
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let indent = "\t".repeat(depth);
        let _ = writeln!(out, "{indent}{}", self.kind);
        let _ = writeln!(out, "{indent}{{");
        for (key, value) in &self.fields {
            match value {
                FieldValue::Text(text) => {
                    let _ = writeln!(out, "{indent}\t{key}\t\"{text}\";");
                }
                FieldValue::Raw(raw) => {
                    let _ = writeln!(out, "{indent}\t{key}\t{raw};");
                }
            }
        }
        for child in &self.children {
            child.render_into(out, depth + 1);
        }
        let _ = writeln!(out, "{indent}}}");
    }
}

/// Render a complete file: header, blank line, then the block
pub fn render(block: &HdBlock) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HD_HEADER}");
    out.push('\n');
    block.render_into(&mut out, 0);
    out
}

/// Quotes and semicolons would terminate a field early.
fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '"' => '\'',
            ';' => ',',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect()
}

/// Material pointing the engine at `texture_file` inside `mod_name`
pub fn material_file(mod_name: &str, texture_file: &str) -> String {
    render(
        &HdBlock::new("material")
            .raw("diffuseMap", layout::game_reference(mod_name, texture_file))
            .raw("specularPower", 40),
    )
}

/// Outfit descriptor enumerating every slot of `descriptor` in order
pub fn outfit_file(descriptor: &ModDescriptor) -> String {
    let mut outfit = HdBlock::new("outfit").text("name", &descriptor.name);
    if let Some(author) = &descriptor.author {
        outfit = outfit.text("author", author);
    }
    outfit = outfit.text("resolution", descriptor.resolution.as_str());

    let category = descriptor
        .slot_category
        .as_deref()
        .unwrap_or(DEFAULT_SLOT_CATEGORY);

    for slot in &descriptor.slots {
        outfit = outfit.child(
            HdBlock::new("slot")
                .raw("index", slot.index)
                .text("category", category)
                .text("variant", &slot.variant)
                .raw("material", layout::game_reference(&descriptor.name, &slot.material))
                .raw("texture", layout::game_reference(&descriptor.name, &slot.texture)),
        );
    }

    render(&outfit)
}

/// Value of the first `key` field anywhere in an engine text file
pub fn read_field(contents: &str, key: &str) -> Option<String> {
    let pattern = format!(r#"(?m)^\s*{}\s+"?([^";]*)"?\s*;"#, regex::escape(key));
    let re = Regex::new(&pattern).ok()?;
    re.captures(contents)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Resolution recorded in an outfit descriptor, if any
pub fn read_resolution(contents: &str) -> Option<Resolution> {
    read_field(contents, "resolution").and_then(|value| value.parse().ok())
}
