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

//! Analyzer registry and per-run execution plan

use crate::analyzer::{BaseAnalyzer, BatchOperationAnalyzer, CallAnalyzer, ParameterAnalyzer, ProposalAnalyzer, RegisteredAnalyzer};
use crate::error::{AnalysisError, RegistrationError};
use crate::graph::DependencyGraph;
use proposal_common::TreeLevel;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Pass order: bottom-up, leaves first
pub const PASS_ORDER: [TreeLevel; 4] = [TreeLevel::Parameter, TreeLevel::Call, TreeLevel::BatchOperation, TreeLevel::Proposal];

/// Analyzers of all four kinds, IDs unique across kinds
#[derive(Debug, Clone, Default)]
pub struct AnalyzerRegistry {
    analyzers: Vec<RegisteredAnalyzer>,
    ids: HashSet<String>,
}

impl AnalyzerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, analyzer: RegisteredAnalyzer) -> Result<(), RegistrationError> {
        let id = analyzer.id();
        if id.trim().is_empty() {
            return Err(RegistrationError::EmptyAnalyzerId);
        }
        if self.ids.contains(id) {
            return Err(RegistrationError::DuplicateAnalyzer(id.to_string()));
        }

        self.ids.insert(id.to_string());
        self.analyzers.push(analyzer);
        Ok(())
    }

    pub fn register_proposal_analyzer(&mut self, analyzer: Arc<dyn ProposalAnalyzer>) -> Result<(), RegistrationError> {
        self.register(RegisteredAnalyzer::Proposal(analyzer))
    }

    pub fn register_batch_operation_analyzer(&mut self, analyzer: Arc<dyn BatchOperationAnalyzer>) -> Result<(), RegistrationError> {
        self.register(RegisteredAnalyzer::BatchOperation(analyzer))
    }

    pub fn register_call_analyzer(&mut self, analyzer: Arc<dyn CallAnalyzer>) -> Result<(), RegistrationError> {
        self.register(RegisteredAnalyzer::Call(analyzer))
    }

    pub fn register_parameter_analyzer(&mut self, analyzer: Arc<dyn ParameterAnalyzer>) -> Result<(), RegistrationError> {
        self.register(RegisteredAnalyzer::Parameter(analyzer))
    }

    pub fn contains(&self, analyzer_id: &str) -> bool {
        self.ids.contains(analyzer_id)
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// Analyzers of one kind, in registration order
    pub fn of_level(&self, level: TreeLevel) -> Vec<RegisteredAnalyzer> {
        self.analyzers.iter().filter(|a| a.level() == level).cloned().collect()
    }

    /// Builds and validates the dependency graph of every pass
    pub fn plan(&self) -> Result<ExecutionPlan, AnalysisError> {
        let mut resolved: HashSet<String> = HashSet::new();
        let mut passes = HashMap::new();

        for level in PASS_ORDER {
            let analyzers = self.of_level(level);
            let graph = DependencyGraph::build(&analyzers, &resolved).map_err(|source| AnalysisError::Graph { level, source })?;

            let by_id: HashMap<&str, &RegisteredAnalyzer> = analyzers.iter().map(|a| (a.id(), a)).collect();
            let levels: Vec<Vec<RegisteredAnalyzer>> = graph
                .levels()
                .iter()
                .map(|ids| ids.iter().filter_map(|id| by_id.get(id.as_str()).map(|a| (*a).clone())).collect())
                .collect();

            resolved.extend(analyzers.iter().map(|a| a.id().to_string()));
            passes.insert(level, levels);
        }

        Ok(ExecutionPlan { passes })
    }
}

/// Leveled analyzers for each of the four passes
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    passes: HashMap<TreeLevel, Vec<Vec<RegisteredAnalyzer>>>,
}

impl ExecutionPlan {
    pub fn levels(&self, pass: TreeLevel) -> &[Vec<RegisteredAnalyzer>] {
        self.passes.get(&pass).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn analyzer_count(&self) -> usize {
        self.passes.values().flatten().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::AnalyzerContext;
    use crate::error::AnalyzerError;
    use async_trait::async_trait;
    use proposal_common::{Annotation, DecodedCall, DecodedParameter, DecodedTimelockProposal};

    struct Named {
        id: &'static str,
        deps: Vec<&'static str>,
    }

    impl BaseAnalyzer for Named {
        fn id(&self) -> &str {
            self.id
        }

        fn dependencies(&self) -> Vec<String> {
            self.deps.iter().map(|d| d.to_string()).collect()
        }
    }

    #[async_trait]
    impl ParameterAnalyzer for Named {
        async fn analyze(&self, _ctx: &AnalyzerContext, _parameter: &DecodedParameter) -> Result<Vec<Annotation>, AnalyzerError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl CallAnalyzer for Named {
        async fn analyze(&self, _ctx: &AnalyzerContext, _call: &DecodedCall) -> Result<Vec<Annotation>, AnalyzerError> {
            Ok(Vec::new())
        }
    }

    #[async_trait]
    impl ProposalAnalyzer for Named {
        async fn analyze(&self, _ctx: &AnalyzerContext, _proposal: &DecodedTimelockProposal) -> Result<Vec<Annotation>, AnalyzerError> {
            Ok(Vec::new())
        }
    }

    fn named(id: &'static str, deps: &[&'static str]) -> Arc<Named> {
        Arc::new(Named { id, deps: deps.to_vec() })
    }

    #[test]
    fn test_empty_and_duplicate_ids_are_rejected() {
        let mut registry = AnalyzerRegistry::new();
        assert_eq!(registry.register_parameter_analyzer(named("", &[])), Err(RegistrationError::EmptyAnalyzerId));

        registry.register_parameter_analyzer(named("shared", &[])).unwrap();
        // uniqueness spans analyzer kinds
        assert_eq!(
            registry.register_call_analyzer(named("shared", &[])),
            Err(RegistrationError::DuplicateAnalyzer("shared".to_string()))
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("shared"));
    }

    #[test]
    fn test_plan_levels_each_pass() {
        let mut registry = AnalyzerRegistry::new();
        registry.register_parameter_analyzer(named("p1", &[])).unwrap();
        registry.register_parameter_analyzer(named("p2", &["p1"])).unwrap();
        registry.register_call_analyzer(named("c1", &["p2"])).unwrap();
        registry.register_proposal_analyzer(named("root", &["c1", "p1"])).unwrap();

        let plan = registry.plan().unwrap();
        let ids = |pass| plan.levels(pass).iter().map(|l| l.iter().map(|a| a.id().to_string()).collect::<Vec<_>>()).collect::<Vec<_>>();

        assert_eq!(ids(TreeLevel::Parameter), vec![vec!["p1"], vec!["p2"]]);
        assert_eq!(ids(TreeLevel::Call), vec![vec!["c1"]]);
        assert!(ids(TreeLevel::BatchOperation).is_empty());
        assert_eq!(ids(TreeLevel::Proposal), vec![vec!["root"]]);
        assert_eq!(plan.analyzer_count(), 4);
    }

    #[test]
    fn test_dependency_on_later_pass_is_rejected() {
        let mut registry = AnalyzerRegistry::new();
        registry.register_call_analyzer(named("c1", &[])).unwrap();
        registry.register_parameter_analyzer(named("p1", &["c1"])).unwrap();

        let err = registry.plan().unwrap_err();
        assert!(matches!(err, AnalysisError::Graph { level: TreeLevel::Parameter, .. }));
    }
}
