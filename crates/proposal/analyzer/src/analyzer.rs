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

//! Analyzer extension points
//!
//! Analysis is extended by implementing one of four analyzer traits, one per
//! tree level. Each analyzer has a globally unique ID and declares the IDs of
//! the analyzers whose output it reads.

use crate::context::ExecutionContext;
use crate::error::AnalyzerError;
use crate::scope::{AnalysisTarget, NodeScope};
use crate::store::DependencyAnnotationStore;
use async_trait::async_trait;
use proposal_common::{Annotation, DecodedBatchOperation, DecodedCall, DecodedParameter, DecodedTimelockProposal, TreeLevel};
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Identity and dependency declaration shared by every analyzer
pub trait BaseAnalyzer: Send + Sync {
    fn id(&self) -> &str;

    /// IDs of analyzers whose annotations this analyzer reads
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }
}

#[async_trait]
pub trait ProposalAnalyzer: BaseAnalyzer {
    async fn can_analyze(&self, _ctx: &AnalyzerContext, _proposal: &DecodedTimelockProposal) -> bool {
        true
    }

    async fn analyze(&self, ctx: &AnalyzerContext, proposal: &DecodedTimelockProposal) -> Result<Vec<Annotation>, AnalyzerError>;
}

#[async_trait]
pub trait BatchOperationAnalyzer: BaseAnalyzer {
    async fn can_analyze(&self, _ctx: &AnalyzerContext, _operation: &DecodedBatchOperation) -> bool {
        true
    }

    async fn analyze(&self, ctx: &AnalyzerContext, operation: &DecodedBatchOperation) -> Result<Vec<Annotation>, AnalyzerError>;
}

#[async_trait]
pub trait CallAnalyzer: BaseAnalyzer {
    async fn can_analyze(&self, _ctx: &AnalyzerContext, _call: &DecodedCall) -> bool {
        true
    }

    async fn analyze(&self, ctx: &AnalyzerContext, call: &DecodedCall) -> Result<Vec<Annotation>, AnalyzerError>;
}

#[async_trait]
pub trait ParameterAnalyzer: BaseAnalyzer {
    async fn can_analyze(&self, _ctx: &AnalyzerContext, _parameter: &DecodedParameter) -> bool {
        true
    }

    async fn analyze(&self, ctx: &AnalyzerContext, parameter: &DecodedParameter) -> Result<Vec<Annotation>, AnalyzerError>;
}

/// Everything an analyzer may look at during one invocation
#[derive(Debug, Clone)]
pub struct AnalyzerContext {
    execution: Arc<ExecutionContext>,
    scope: NodeScope,
    dependencies: DependencyAnnotationStore,
    cancellation: CancellationToken,
    deadline: Instant,
}

impl AnalyzerContext {
    pub fn new(execution: Arc<ExecutionContext>, scope: NodeScope, dependencies: DependencyAnnotationStore, cancellation: CancellationToken, deadline: Instant) -> Self {
        Self {
            execution,
            scope,
            dependencies,
            cancellation,
            deadline,
        }
    }

    /// Domain, environment and decoded proposal of the current run
    pub fn execution(&self) -> &ExecutionContext {
        &self.execution
    }

    pub fn scope(&self) -> &NodeScope {
        &self.scope
    }

    /// Annotations from declared dependencies only
    pub fn dependencies(&self) -> &DependencyAnnotationStore {
        &self.dependencies
    }

    /// Cancelled when the run is cancelled or this invocation times out
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Fails with [`AnalyzerError::Cancelled`] once cancellation was requested
    pub fn check_cancelled(&self) -> Result<(), AnalyzerError> {
        if self.cancellation.is_cancelled() { Err(AnalyzerError::Cancelled) } else { Ok(()) }
    }
}

/// Registration record tagging an analyzer with its tree level
#[derive(Clone)]
pub enum RegisteredAnalyzer {
    Proposal(Arc<dyn ProposalAnalyzer>),
    BatchOperation(Arc<dyn BatchOperationAnalyzer>),
    Call(Arc<dyn CallAnalyzer>),
    Parameter(Arc<dyn ParameterAnalyzer>),
}

impl std::fmt::Debug for RegisteredAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredAnalyzer").field("id", &self.id()).field("level", &self.level()).finish()
    }
}

impl RegisteredAnalyzer {
    pub fn level(&self) -> TreeLevel {
        match self {
            RegisteredAnalyzer::Proposal(_) => TreeLevel::Proposal,
            RegisteredAnalyzer::BatchOperation(_) => TreeLevel::BatchOperation,
            RegisteredAnalyzer::Call(_) => TreeLevel::Call,
            RegisteredAnalyzer::Parameter(_) => TreeLevel::Parameter,
        }
    }

    pub(crate) async fn can_analyze(&self, ctx: &AnalyzerContext, target: &AnalysisTarget) -> Result<bool, AnalyzerError> {
        Ok(match (self, target) {
            (RegisteredAnalyzer::Proposal(a), AnalysisTarget::Proposal(node)) => a.can_analyze(ctx, node).await,
            (RegisteredAnalyzer::BatchOperation(a), AnalysisTarget::BatchOperation(node)) => a.can_analyze(ctx, node).await,
            (RegisteredAnalyzer::Call(a), AnalysisTarget::Call(node)) => a.can_analyze(ctx, node).await,
            (RegisteredAnalyzer::Parameter(a), AnalysisTarget::Parameter(node)) => a.can_analyze(ctx, node).await,
            _ => return Err(self.mismatch(target)),
        })
    }

    pub(crate) async fn analyze(&self, ctx: &AnalyzerContext, target: &AnalysisTarget) -> Result<Vec<Annotation>, AnalyzerError> {
        match (self, target) {
            (RegisteredAnalyzer::Proposal(a), AnalysisTarget::Proposal(node)) => a.analyze(ctx, node).await,
            (RegisteredAnalyzer::BatchOperation(a), AnalysisTarget::BatchOperation(node)) => a.analyze(ctx, node).await,
            (RegisteredAnalyzer::Call(a), AnalysisTarget::Call(node)) => a.analyze(ctx, node).await,
            (RegisteredAnalyzer::Parameter(a), AnalysisTarget::Parameter(node)) => a.analyze(ctx, node).await,
            _ => Err(self.mismatch(target)),
        }
    }

    fn mismatch(&self, target: &AnalysisTarget) -> AnalyzerError {
        AnalyzerError::KindMismatch {
            kind: self.level(),
            target: target.level(),
        }
    }
}

impl BaseAnalyzer for RegisteredAnalyzer {
    fn id(&self) -> &str {
        match self {
            RegisteredAnalyzer::Proposal(a) => a.id(),
            RegisteredAnalyzer::BatchOperation(a) => a.id(),
            RegisteredAnalyzer::Call(a) => a.id(),
            RegisteredAnalyzer::Parameter(a) => a.id(),
        }
    }

    fn dependencies(&self) -> Vec<String> {
        match self {
            RegisteredAnalyzer::Proposal(a) => a.dependencies(),
            RegisteredAnalyzer::BatchOperation(a) => a.dependencies(),
            RegisteredAnalyzer::Call(a) => a.dependencies(),
            RegisteredAnalyzer::Parameter(a) => a.dependencies(),
        }
    }
}
