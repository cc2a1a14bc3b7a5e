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

//! Analyzer dependency graph and execution levels
//!
//! One graph is built per tree level from the analyzers registered for that
//! level. Dependencies on analyzers of an earlier pass (a call analyzer
//! depending on a parameter analyzer) are already satisfied when the pass
//! starts and do not affect leveling.

use crate::analyzer::BaseAnalyzer;
use crate::error::GraphError;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// DAG over analyzer dependency declarations
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// Edges point from dependency to dependent
    graph: DiGraph<String, ()>,

    node_indices: HashMap<String, NodeIndex>,

    /// Satisfied dependencies on analyzers from earlier passes
    external: HashMap<String, Vec<String>>,

    /// Analyzer IDs grouped by execution level, registration order within a level
    levels: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Builds and levels the graph.
    ///
    /// # Arguments
    /// - `analyzers`: analyzers of one kind, in registration order
    /// - `resolved`: IDs of analyzers that complete before this pass starts
    ///
    /// # Returns
    /// - Err(GraphError): on unknown dependencies, self-dependencies or cycles
    pub fn build<A: BaseAnalyzer>(analyzers: &[A], resolved: &HashSet<String>) -> Result<Self, GraphError> {
        let mut graph = DependencyGraph::default();

        for analyzer in analyzers {
            let id = analyzer.id().to_string();
            if graph.node_indices.contains_key(&id) {
                return Err(GraphError::DuplicateAnalyzer(id));
            }
            let index = graph.graph.add_node(id.clone());
            graph.node_indices.insert(id, index);
        }

        for analyzer in analyzers {
            let id = analyzer.id();
            let dependent_index = graph.node_indices[id];

            for dependency in analyzer.dependencies() {
                if dependency == id {
                    return Err(GraphError::SelfDependency(id.to_string()));
                }

                if let Some(&dependency_index) = graph.node_indices.get(&dependency) {
                    graph.graph.update_edge(dependency_index, dependent_index, ());
                } else if resolved.contains(&dependency) {
                    graph.external.entry(id.to_string()).or_default().push(dependency);
                } else {
                    return Err(GraphError::DanglingDependency {
                        analyzer: id.to_string(),
                        dependency,
                    });
                }
            }
        }

        graph.levels = graph.compute_levels(analyzers)?;
        Ok(graph)
    }

    /// level(a) = 0 without in-pass dependencies, else 1 + max(level(dep))
    fn compute_levels<A: BaseAnalyzer>(&self, analyzers: &[A]) -> Result<Vec<Vec<String>>, GraphError> {
        let order = toposort(&self.graph, None).map_err(|cycle| GraphError::CycleDetected(self.graph[cycle.node_id()].clone()))?;

        let mut level_of: HashMap<NodeIndex, usize> = HashMap::with_capacity(order.len());
        for index in order {
            let level = self
                .graph
                .neighbors_directed(index, Direction::Incoming)
                .filter_map(|dep| level_of.get(&dep))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level_of.insert(index, level);
        }

        let depth = level_of.values().copied().max().map_or(0, |max| max + 1);
        let mut levels: Vec<Vec<String>> = vec![Vec::new(); depth];
        for analyzer in analyzers {
            let index = self.node_indices[analyzer.id()];
            levels[level_of[&index]].push(analyzer.id().to_string());
        }

        Ok(levels)
    }

    /// Analyzer IDs grouped by level; level N+1 only starts after level N
    pub fn levels(&self) -> &[Vec<String>] {
        &self.levels
    }

    pub fn level_of(&self, analyzer_id: &str) -> Option<usize> {
        self.levels.iter().position(|level| level.iter().any(|id| id == analyzer_id))
    }

    /// In-pass dependencies of an analyzer
    pub fn dependencies_of(&self, analyzer_id: &str) -> Vec<String> {
        self.neighbors(analyzer_id, Direction::Incoming)
    }

    /// In-pass analyzers depending on the given one
    pub fn dependents_of(&self, analyzer_id: &str) -> Vec<String> {
        self.neighbors(analyzer_id, Direction::Outgoing)
    }

    /// Dependencies satisfied by an earlier pass
    pub fn external_dependencies_of(&self, analyzer_id: &str) -> &[String] {
        self.external.get(analyzer_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn neighbors(&self, analyzer_id: &str, direction: Direction) -> Vec<String> {
        let mut ids: Vec<String> = match self.node_indices.get(analyzer_id) {
            Some(&index) => self.graph.neighbors_directed(index, direction).map(|n| self.graph[n].clone()).collect(),
            None => Vec::new(),
        };
        ids.sort();
        ids
    }
}
