//! Catalog loader.
//!
//! Turns a data directory into index documents:
//!
//! - `medicines.json` → one [`DocumentCategory::Medicine`] document per item
//! - `medical_personnel.json` → one [`DocumentCategory::DoctorDirectory`] document per department
//! - `symptoms.json` → one [`DocumentCategory::Symptom`] document per symptom
//! - any other `.json` → [`DocumentCategory::Generic`] items
//! - `.txt` / `.md` → [`DocumentCategory::Generic`] chunks
//!
//! JSON items are never chunked; free text is split into overlapping
//! character windows.

use std::collections::BTreeMap;
use std::path::Path;

use medroute_core::error::IndexError;
use medroute_core::index::{ContextDocument, DocumentAttributes, DocumentCategory};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Keys tried, in order, when picking an item's display name.
const NAME_KEYS: &[&str] = &[
    "name",
    "medicine_name",
    "title",
    "symptom_name",
    "disease_name",
    "product_name",
    "department_name",
];

/// Character window used to split free text.
#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    pub size: usize,
    pub overlap: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 200,
        }
    }
}

/// Category implied by a catalog file name.
pub fn category_for_file(file_name: &str) -> DocumentCategory {
    match file_name {
        "medicines.json" => DocumentCategory::Medicine,
        "medical_personnel.json" => DocumentCategory::DoctorDirectory,
        "symptoms.json" => DocumentCategory::Symptom,
        _ => DocumentCategory::Generic,
    }
}

/// Load every supported file under `dir` (non-recursive), sorted by file name.
pub fn load_catalog(dir: &Path, chunking: ChunkOptions) -> Result<Vec<ContextDocument>, IndexError> {
    let read = std::fs::read_dir(dir)
        .map_err(|e| IndexError::NotLoaded(format!("{}: {e}", dir.display())))?;

    let mut paths: Vec<_> = read
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let loaded = match ext {
            "json" => load_json_file(&path)?,
            "txt" | "md" => load_text_file(&path, chunking)?,
            _ => {
                debug!(path = %path.display(), "Skipping unsupported file");
                continue;
            }
        };
        debug!(path = %path.display(), count = loaded.len(), "Loaded catalog file");
        documents.extend(loaded);
    }

    info!(dir = %dir.display(), count = documents.len(), "Catalog loaded");
    Ok(documents)
}

/// Load one JSON catalog file.
pub fn load_json_file(path: &Path) -> Result<Vec<ContextDocument>, IndexError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| IndexError::NotLoaded(format!("{}: {e}", path.display())))?;
    let data: Value = serde_json::from_str(&raw).map_err(|e| IndexError::InvalidDocument {
        id: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let category = category_for_file(file_name);
    let file = path.display().to_string();

    let Some((array_name, items)) = detect_item_array(&data) else {
        // A single record: keep it whole.
        let text = render_value(&data, 0);
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let mut attrs = DocumentAttributes::default();
        attrs.extra.insert("file".into(), file);
        return Ok(vec![ContextDocument::new(file_name, text, category, attrs)]);
    };

    let mut documents = Vec::with_capacity(items.len());
    for (idx, item) in items.iter().enumerate() {
        let Value::Object(fields) = item else {
            warn!(file = file_name, idx, "Skipping non-object catalog item");
            continue;
        };
        let name = item_name(fields).unwrap_or_else(|| format!("{array_name} #{}", idx + 1));
        let attributes = item_attributes(fields, &name, &file);
        let text = render_item(fields, &name);
        documents.push(ContextDocument::new(
            format!("{file_name}#{idx}"),
            text,
            category,
            attributes,
        ));
    }
    Ok(documents)
}

/// Load a free-text file and split it into chunks.
pub fn load_text_file(path: &Path, chunking: ChunkOptions) -> Result<Vec<ContextDocument>, IndexError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| IndexError::NotLoaded(format!("{}: {e}", path.display())))?;
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let file = path.display().to_string();

    Ok(chunk_text(&raw, chunking.size, chunking.overlap)
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| {
            let mut attrs = DocumentAttributes::default();
            attrs.extra.insert("file".into(), file.clone());
            ContextDocument::new(format!("{file_name}#{i}"), chunk, DocumentCategory::Generic, attrs)
        })
        .collect())
}

/// Split `text` into windows of at most `size` characters, each starting
/// `size - overlap` characters after the previous one. Whitespace-only
/// windows are dropped.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if size == 0 || chars.is_empty() {
        return Vec::new();
    }
    let step = size.saturating_sub(overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// The list of catalog items: a top-level array, or the first array field
/// of a top-level object.
fn detect_item_array(data: &Value) -> Option<(&str, &Vec<Value>)> {
    match data {
        Value::Array(items) => Some(("items", items)),
        Value::Object(fields) => fields.iter().find_map(|(key, value)| match value {
            Value::Array(items) if !items.is_empty() => Some((key.as_str(), items)),
            _ => None,
        }),
        _ => None,
    }
}

fn item_name(fields: &serde_json::Map<String, Value>) -> Option<String> {
    NAME_KEYS
        .iter()
        .find_map(|key| fields.get(*key).and_then(Value::as_str))
        .or_else(|| {
            fields
                .values()
                .filter_map(Value::as_str)
                .find(|s| !s.is_empty() && s.chars().count() < 100)
        })
        .map(str::to_string)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

/// Attribution comes from the item's own fields only; the file it was read
/// from is kept under `extra["file"]`.
fn item_attributes(
    fields: &serde_json::Map<String, Value>,
    name: &str,
    file: &str,
) -> DocumentAttributes {
    let raw: BTreeMap<String, String> = fields
        .iter()
        .filter_map(|(k, v)| scalar_text(v).map(|text| (k.clone(), text)))
        .collect();

    let mut attrs = DocumentAttributes::from_map(&raw);
    attrs.extra.insert("file".into(), file.to_string());
    if attrs.name.is_empty() {
        attrs.name = name.to_string();
    }
    attrs
}

fn title_case(key: &str) -> String {
    key.split(['_', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_item(fields: &serde_json::Map<String, Value>, name: &str) -> String {
    let mut lines = vec![name.to_uppercase(), String::new()];
    for (key, value) in fields {
        if value.as_str() == Some(name) {
            continue;
        }
        match value {
            Value::Array(items) => {
                lines.push(format!("{}:", title_case(key)));
                lines.extend(items.iter().map(|item| format!("- {}", render_value(item, 1).trim())));
            }
            Value::Object(_) => {
                lines.push(format!("{}:", title_case(key)));
                lines.push(render_value(value, 1));
            }
            other => lines.push(format!("{}: {}", title_case(key), render_value(other, 0))),
        }
    }
    lines.join("\n")
}

fn render_value(value: &Value, indent: usize) -> String {
    let prefix = "  ".repeat(indent);
    match value {
        Value::Object(fields) => fields
            .iter()
            .map(|(k, v)| match v {
                Value::Object(_) | Value::Array(_) => {
                    format!("{prefix}{k}:\n{}", render_value(v, indent + 1))
                }
                _ => format!("{prefix}{k}: {}", render_value(v, 0)),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Array(items) => items
            .iter()
            .map(|item| format!("{prefix}- {}", render_value(item, 0).trim_start()))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
