//! Dataset - ordered examples with optional index-aligned labels

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, ParseError};

/// Expected answer for one example
///
/// Either a plain string, or an object whose `answer` field holds the
/// expected output and whose optional `choices` field overrides the
/// allowed answer set for that example.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Text(String),
    Structured(StructuredLabel),
}

/// Object-form label
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredLabel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Label {
    /// Per-example choice override, if the label carries one
    pub fn choices(&self) -> Option<&[String]> {
        match self {
            Label::Text(_) => None,
            Label::Structured(s) => s.choices.as_deref().filter(|c| !c.is_empty()),
        }
    }

    /// Expected answer rendered as text for prompts
    pub fn expected_text(&self) -> Result<String, ParseError> {
        match self {
            Label::Text(text) => Ok(text.clone()),
            Label::Structured(s) => match &s.answer {
                Some(Value::String(text)) => Ok(text.clone()),
                Some(Value::Array(items)) => Ok(items
                    .iter()
                    .map(value_to_label)
                    .collect::<Vec<_>>()
                    .join(", ")),
                Some(Value::Null) | None => Err(ParseError::MissingField("answer")),
                Some(other) => Ok(other.to_string()),
            },
        }
    }

    /// Expected answer normalised into a label set
    pub fn expected_labels(&self) -> Result<BTreeSet<String>, ParseError> {
        match self {
            Label::Structured(StructuredLabel {
                answer: Some(Value::Array(items)),
                ..
            }) => Ok(items
                .iter()
                .map(|v| normalize_label(&value_to_label(v)))
                .filter(|l| !l.is_empty())
                .collect()),
            _ => Ok(split_labels(&self.expected_text()?)),
        }
    }
}

fn value_to_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}

/// Split an answer into a normalised label set.
///
/// Labels are separated by `,`, `;` or `|`, trimmed and case-folded.
pub fn split_labels(text: &str) -> BTreeSet<String> {
    text.split(|c: char| c == ',' || c == ';' || c == '|')
        .map(normalize_label)
        .filter(|l| !l.is_empty())
        .collect()
}

/// Examples to optimize against, with optional labels.
///
/// Deserialization goes through the same checks as the constructors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    examples: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<Label>>,
}

/// Unchecked wire form of [`Dataset`]
#[derive(Deserialize)]
struct RawDataset {
    examples: Vec<String>,
    #[serde(default)]
    labels: Option<Vec<Label>>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = EngineError;

    fn try_from(raw: RawDataset) -> Result<Self, Self::Error> {
        Self::build(raw.examples, raw.labels)
    }
}

impl Dataset {
    /// Unlabeled dataset
    pub fn new(examples: Vec<String>) -> Result<Self, EngineError> {
        Self::build(examples, None)
    }

    /// Labeled dataset; labels must align with examples one-to-one
    pub fn with_labels(examples: Vec<String>, labels: Vec<Label>) -> Result<Self, EngineError> {
        Self::build(examples, Some(labels))
    }

    fn build(examples: Vec<String>, labels: Option<Vec<Label>>) -> Result<Self, EngineError> {
        if examples.is_empty() {
            return Err(EngineError::EmptyDataset);
        }
        if let Some(labels) = &labels {
            if labels.len() != examples.len() {
                return Err(EngineError::Config(format!(
                    "{} labels for {} examples",
                    labels.len(),
                    examples.len()
                )));
            }
        }
        Ok(Self { examples, labels })
    }

    /// Load from a JSON file of the form `{"examples": [...], "labels": [...]}`
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read dataset {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse dataset {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    pub fn example(&self, index: usize) -> Option<&str> {
        self.examples.get(index).map(String::as_str)
    }

    pub fn is_labeled(&self) -> bool {
        self.labels.is_some()
    }

    pub fn label(&self, index: usize) -> Option<&Label> {
        self.labels.as_ref().and_then(|labels| labels.get(index))
    }

    /// Allowed answer choices for `index`: the label's override or `default`
    pub fn choices_for<'a>(&'a self, index: usize, default: &'a [String]) -> &'a [String] {
        self.label(index)
            .and_then(Label::choices)
            .unwrap_or(default)
    }
}
