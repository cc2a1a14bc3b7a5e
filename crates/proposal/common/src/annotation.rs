// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Annotation model
//!
//! Annotations are the output of analysis: named, typed values attached to a
//! node of the analyzed tree. A node's collection is append-only; existing
//! entries are never edited or removed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Well-known annotation names shared by analyzers and renderers
pub const SEVERITY: &str = "cld.severity";
pub const RISK: &str = "cld.risk";
pub const DIFF: &str = "cld.diff";
pub const VALUE_TYPE: &str = "cld.value_type";

/// Single piece of analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    name: String,

    #[serde(rename = "type")]
    kind: String,

    value: Value,

    /// Identity of the producing analyzer, stamped by the engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    analyzer_id: Option<String>,
}

impl Annotation {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            value: value.into(),
            analyzer_id: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn analyzer_id(&self) -> Option<&str> {
        self.analyzer_id.as_deref()
    }

    /// Returns the annotation stamped with the producing analyzer.
    ///
    /// Any identity set by the analyzer itself is replaced.
    pub fn produced_by(mut self, analyzer_id: impl Into<String>) -> Self {
        self.analyzer_id = Some(analyzer_id.into());
        self
    }
}

/// Ordered, append-only collection of annotations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotations(Vec<Annotation>);

impl Annotations {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, annotation: Annotation) {
        self.0.push(annotation);
    }

    pub fn extend(&mut self, annotations: impl IntoIterator<Item = Annotation>) {
        self.0.extend(annotations);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Annotation> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Annotation] {
        &self.0
    }

    pub fn by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.0.iter().filter(move |a| a.name == name)
    }

    pub fn by_type<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.0.iter().filter(move |a| a.kind == kind)
    }

    pub fn by_analyzer<'a>(&'a self, analyzer_id: &'a str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.0.iter().filter(move |a| a.analyzer_id.as_deref() == Some(analyzer_id))
    }

    /// First annotation with the given name, if any
    pub fn first(&self, name: &str) -> Option<&Annotation> {
        self.0.iter().find(|a| a.name == name)
    }

    pub fn into_vec(self) -> Vec<Annotation> {
        self.0
    }
}

impl From<Vec<Annotation>> for Annotations {
    fn from(annotations: Vec<Annotation>) -> Self {
        Self(annotations)
    }
}

impl FromIterator<Annotation> for Annotations {
    fn from_iter<I: IntoIterator<Item = Annotation>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Annotations {
    type Item = Annotation;
    type IntoIter = std::vec::IntoIter<Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Annotations {
    type Item = &'a Annotation;
    type IntoIter = std::slice::Iter<'a, Annotation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Capability shared by every node of the analyzed tree
pub trait Annotated {
    fn annotations(&self) -> &Annotations;

    /// Appends annotations after any existing ones
    fn add_annotations(&mut self, annotations: Vec<Annotation>);

    fn annotations_by_name<'a>(&'a self, name: &'a str) -> Vec<&'a Annotation> {
        self.annotations().by_name(name).collect()
    }

    fn annotations_by_type<'a>(&'a self, kind: &'a str) -> Vec<&'a Annotation> {
        self.annotations().by_type(kind).collect()
    }

    fn annotations_by_analyzer<'a>(&'a self, analyzer_id: &'a str) -> Vec<&'a Annotation> {
        self.annotations().by_analyzer(analyzer_id).collect()
    }
}

/// How bad a finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Debug,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Debug => "debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational risk of executing a change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    High,
    Medium,
    Low,
}

impl Risk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Risk::High => "high",
            Risk::Medium => "medium",
            Risk::Low => "low",
        }
    }
}

impl fmt::Display for Risk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn severity(level: Severity) -> Annotation {
    Annotation::new(SEVERITY, "enum", level.as_str())
}

pub fn risk(level: Risk) -> Annotation {
    Annotation::new(RISK, "enum", level.as_str())
}

/// Before/after comparison of an on-chain value
pub fn diff(old: impl Into<Value>, new: impl Into<Value>, value_type: &str) -> Annotation {
    Annotation::new(
        DIFF,
        "diff",
        serde_json::json!({
            "old": old.into(),
            "new": new.into(),
            "valueType": value_type,
        }),
    )
}

/// Rendering hint for a parameter value (e.g. "ethereum.address", "token.amount")
pub fn value_type(value_type: &str) -> Annotation {
    Annotation::new(VALUE_TYPE, "string", value_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Annotations {
        vec![
            Annotation::new("seen", "bool", true).produced_by("P"),
            risk(Risk::Low).produced_by("C"),
            Annotation::new("seen", "bool", false).produced_by("Q"),
            severity(Severity::Warning),
        ]
        .into()
    }

    #[test]
    fn test_query_by_name_type_and_analyzer() {
        let annotations = sample();

        assert_eq!(annotations.by_name("seen").count(), 2);
        assert_eq!(annotations.by_type("enum").count(), 2);
        assert_eq!(annotations.by_analyzer("C").map(|a| a.name()).collect::<Vec<_>>(), vec![RISK]);
        assert_eq!(annotations.first("seen").unwrap().analyzer_id(), Some("P"));
        assert!(annotations.first("missing").is_none());
    }

    #[test]
    fn test_push_preserves_order() {
        let mut annotations = sample();
        annotations.push(Annotation::new("late", "string", "x"));

        let names: Vec<_> = annotations.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["seen", RISK, "seen", SEVERITY, "late"]);
    }

    #[test]
    fn test_produced_by_overrides_existing_identity() {
        let annotation = Annotation::new("x", "string", "y").produced_by("self-claimed").produced_by("engine");
        assert_eq!(annotation.analyzer_id(), Some("engine"));
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(diff(1, 2, "uint256").produced_by("config-diff")).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "cld.diff",
                "type": "diff",
                "value": { "old": 1, "new": 2, "valueType": "uint256" },
                "analyzerId": "config-diff",
            })
        );

        let untagged = serde_json::to_value(value_type("ethereum.address")).unwrap();
        assert!(untagged.get("analyzerId").is_none());
    }
}
