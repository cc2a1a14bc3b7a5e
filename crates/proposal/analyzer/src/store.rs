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

//! Dependency-scoped annotation store
//!
//! Built fresh for every analyzer invocation. It exposes only annotations
//! produced by the analyzer's declared dependencies, taken from the target
//! node and everything beneath it. Annotations from undeclared analyzers stay
//! invisible even when they sit on the same node.

use crate::scope::NodePath;
use proposal_common::{AnalyzedProposal, Annotation, Annotations, TreeLevel};
use serde::Serialize;
use std::collections::HashSet;

/// Annotation together with the node it was found on
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopedAnnotation {
    pub path: NodePath,
    pub annotation: Annotation,
}

impl ScopedAnnotation {
    pub fn level(&self) -> TreeLevel {
        self.path.level()
    }
}

#[derive(Debug, Clone, Default)]
pub struct DependencyAnnotationStore {
    dependencies: Vec<String>,
    entries: Vec<ScopedAnnotation>,
}

impl DependencyAnnotationStore {
    /// Snapshot of the dependency annotations visible from `path`
    pub fn collect(tree: &AnalyzedProposal, path: NodePath, dependencies: &[String]) -> Self {
        let allowed: HashSet<&str> = dependencies.iter().map(String::as_str).collect();
        let mut entries = Vec::new();

        if !allowed.is_empty() {
            for node_path in path.subtree(tree) {
                let Some(node) = node_path.node(tree) else { continue };
                entries.extend(
                    node.annotations()
                        .iter()
                        .filter(|a| a.analyzer_id().is_some_and(|id| allowed.contains(id)))
                        .map(|a| ScopedAnnotation {
                            path: node_path,
                            annotation: a.clone(),
                        }),
                );
            }
        }

        Self {
            dependencies: dependencies.to_vec(),
            entries,
        }
    }

    /// Declared dependencies this store was scoped to
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Union of everything visible, children before parents
    pub fn dependency_annotations(&self) -> Annotations {
        self.entries.iter().map(|e| e.annotation.clone()).collect()
    }

    pub fn filter<F>(&self, predicate: F) -> Annotations
    where
        F: Fn(&ScopedAnnotation) -> bool,
    {
        self.entries.iter().filter(|e| predicate(e)).map(|e| e.annotation.clone()).collect()
    }

    pub fn at_level(&self, level: TreeLevel) -> Annotations {
        self.filter(|e| e.level() == level)
    }

    pub fn at_path(&self, path: NodePath) -> Annotations {
        self.filter(|e| e.path == path)
    }

    pub fn from_analyzer(&self, analyzer_id: &str) -> Annotations {
        self.filter(|e| e.annotation.analyzer_id() == Some(analyzer_id))
    }

    pub fn entries(&self) -> &[ScopedAnnotation] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
