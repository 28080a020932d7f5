//! Control discovery: turns raw page facts into classified [`FormField`]s.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{self, FieldType};
use crate::document::{Document, FramePath, LabelSources, Locator, RawControl};
use crate::error::Result;

/// Confidence given to an unmatched control promoted to a custom question.
const QUESTION_CONFIDENCE: f32 = 0.5;

const GENERIC_CAPTIONS: &[&str] = &["attach", "upload", "choose file"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    Text,
    TextArea,
    Select,
    Checkbox,
    Radio,
    File,
}

impl ControlKind {
    /// `None` for controls that never take input (hidden, buttons).
    pub fn of(tag: &str, input_type: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "select" => return Some(ControlKind::Select),
            "textarea" => return Some(ControlKind::TextArea),
            "input" | "" => {}
            _ => return None,
        }
        match input_type.to_lowercase().as_str() {
            "hidden" | "submit" | "button" | "reset" | "image" => None,
            "checkbox" => Some(ControlKind::Checkbox),
            "radio" => Some(ControlKind::Radio),
            "file" => Some(ControlKind::File),
            _ => Some(ControlKind::Text),
        }
    }
}

/// Run-wide identity of a question: the same label and type seen again is
/// the same question, whatever its locator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldKey {
    pub label: String,
    pub field_type: FieldType,
}

/// One classified control. Rebuilt on every extraction pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    pub frame: FramePath,
    pub locator: Locator,
    pub kind: ControlKind,
    pub field_type: FieldType,
    pub label: String,
    /// Question text for controls whose label is only an answer choice
    /// (one radio input per option); empty otherwise.
    pub group: String,
    pub name: String,
    pub id: String,
    pub options: Vec<String>,
    pub current_value: String,
    pub required: bool,
    pub confidence: f32,
}

impl FormField {
    pub fn key(&self) -> FieldKey {
        let label = if self.group.is_empty() {
            self.label.clone()
        } else {
            format!("{} / {}", self.group, self.label)
        };
        FieldKey {
            label,
            field_type: self.field_type,
        }
    }

    /// The question being asked.
    pub fn question(&self) -> &str {
        if self.group.is_empty() {
            &self.label
        } else {
            &self.group
        }
    }

    pub fn is_eeo(&self) -> bool {
        self.field_type.is_eeo() || catalog::is_eeo_text(self.question())
    }

    pub fn is_high_risk(&self) -> bool {
        self.field_type.is_high_risk() || self.is_eeo()
    }
}

/// Enumerate and classify the fillable controls of one frame.
pub async fn extract<D>(doc: &D, frame: &FramePath) -> Result<Vec<FormField>>
where
    D: Document + ?Sized,
{
    let raws = doc.scan_controls(frame).await?;
    Ok(build_fields(frame, raws))
}

/// Classification proper, separated from the page scan.
pub fn build_fields(frame: &FramePath, raws: Vec<RawControl>) -> Vec<FormField> {
    let mut fields: Vec<FormField> = Vec::new();
    // radio group name -> index into `fields`
    let mut groups: Vec<(String, usize)> = Vec::new();

    for raw in raws {
        let Some(kind) = ControlKind::of(&raw.tag, &raw.input_type) else {
            continue;
        };
        match raw.visible {
            None => {
                debug!(id = %raw.id, name = %raw.name, "visibility check failed, skipping for this pass");
                continue;
            }
            Some(false) => continue,
            Some(true) => {}
        }

        let own_label = resolve_label(kind, &raw);

        if kind == ControlKind::Radio && !raw.name.is_empty() {
            if let Some((_, idx)) = groups.iter().find(|(name, _)| *name == raw.name) {
                let field = &mut fields[*idx];
                field.options.push(own_label.clone());
                if raw.checked {
                    field.current_value = own_label;
                }
                continue;
            }
            let label = if raw.group_label.trim().is_empty() {
                own_label.clone()
            } else {
                clean_label(&raw.group_label)
            };
            let mut field = classify_field(frame, kind, &raw, label, String::new());
            field.options = vec![own_label.clone()];
            field.current_value = if raw.checked { own_label } else { String::new() };
            groups.push((raw.name.clone(), fields.len()));
            fields.push(field);
            continue;
        }

        let group = if kind == ControlKind::Radio {
            clean_label(&raw.group_label)
        } else {
            String::new()
        };
        fields.push(classify_field(frame, kind, &raw, own_label, group));
    }
    fields
}

fn classify_field(
    frame: &FramePath,
    kind: ControlKind,
    raw: &RawControl,
    label: String,
    group: String,
) -> FormField {
    let question = if group.is_empty() { &label } else { &group };
    let (mut field_type, mut confidence) =
        catalog::classify(question, &raw.name, &raw.id, &raw.placeholder);
    if field_type == FieldType::Unknown && looks_like_question(kind, question) {
        field_type = FieldType::CustomQuestion;
        confidence = QUESTION_CONFIDENCE;
    }

    let current_value = match kind {
        ControlKind::Checkbox | ControlKind::Radio => {
            if raw.checked {
                "checked".to_string()
            } else {
                String::new()
            }
        }
        _ => raw.value.clone(),
    };

    FormField {
        frame: frame.clone(),
        locator: build_locator(raw),
        kind,
        field_type,
        label,
        group,
        name: raw.name.clone(),
        id: raw.id.clone(),
        options: if kind == ControlKind::Select {
            raw.options.clone()
        } else {
            Vec::new()
        },
        current_value,
        required: raw.required,
        confidence,
    }
}

fn looks_like_question(kind: ControlKind, text: &str) -> bool {
    if matches!(kind, ControlKind::Checkbox | ControlKind::File) {
        return false;
    }
    let text = text.trim();
    text.ends_with('?') || text.split_whitespace().count() >= 6
}

/// Collapse whitespace and drop required-field markers.
pub fn clean_label(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_end_matches(|c: char| c == '*' || c.is_whitespace())
        .to_string()
}

/// Label for a control: explicit `<label for>`, enclosing label, sibling
/// label, then (file inputs only) the nearest usable caption, then the
/// control's own aria-label, placeholder or name.
pub fn resolve_label(kind: ControlKind, raw: &RawControl) -> String {
    if let Some(label) = label_from_sources(kind, &raw.labels) {
        return label;
    }
    [&raw.aria_label, &raw.placeholder, &raw.name]
        .into_iter()
        .map(|s| clean_label(s))
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

pub fn label_from_sources(kind: ControlKind, labels: &LabelSources) -> Option<String> {
    let direct = [&labels.explicit, &labels.ancestor, &labels.sibling]
        .into_iter()
        .map(|s| clean_label(s))
        .find(|s| !s.is_empty());
    if direct.is_some() || kind != ControlKind::File {
        return direct;
    }
    labels.captions.iter().find_map(|caption| {
        let text = caption.text.trim();
        let limit_ok = if caption.heading {
            text.chars().count() < 100
        } else {
            text.chars().count() < 50 && !text.contains('\n')
        };
        let generic = GENERIC_CAPTIONS.contains(&text.to_lowercase().as_str());
        (!text.is_empty() && limit_ok && !generic).then(|| clean_label(text))
    })
}

/// Durable selector: id, then name, then a unique fallback attribute, then a
/// structural path below the nearest ancestor with an id.
pub fn build_locator(raw: &RawControl) -> Locator {
    if !raw.id.is_empty() {
        return Locator::new(id_selector(&raw.id));
    }
    if !raw.name.is_empty() {
        return Locator::new(format!("[name=\"{}\"]", escape_attr(&raw.name)));
    }
    if let Some(hint) = raw.attributes.iter().find(|h| h.unique && !h.value.is_empty()) {
        return Locator::new(format!("[{}=\"{}\"]", hint.attr, escape_attr(&hint.value)));
    }
    let tag = if raw.tag.is_empty() { "input" } else { &raw.tag };
    let path = if raw.path.is_empty() {
        tag.to_string()
    } else {
        raw.path.join(" > ")
    };
    match &raw.anchor_id {
        Some(anchor) if !anchor.is_empty() => {
            Locator::new(format!("{} > {}", id_selector(anchor), path))
        }
        _ => Locator::new(path),
    }
}

/// `#id` when the id is a valid bare CSS identifier, else an attribute selector.
pub fn id_selector(id: &str) -> String {
    if is_css_ident(id) {
        format!("#{id}")
    } else {
        format!("[id=\"{}\"]", escape_attr(id))
    }
}

fn is_css_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let valid_start = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => true,
        Some('-') => matches!(chars.clone().next(), Some(c) if c.is_ascii_alphabetic() || c == '_'),
        _ => false,
    };
    valid_start && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
