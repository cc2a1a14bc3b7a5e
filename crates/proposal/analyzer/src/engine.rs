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

//! Analyzer engine
//!
//! Walks the decoded proposal bottom-up (parameters, calls, batch operations,
//! proposal) and runs every registered analyzer of the matching kind on every
//! node. Within a node, analyzers run level by level as computed from their
//! dependency graph: all analyzers of a level are spawned at once and the
//! next level only starts after every task of the current one has finished.
//! Annotations are appended by the calling task after the barrier, in level
//! order, so no node is ever written concurrently.

use crate::analyzer::{
    AnalyzerContext, BaseAnalyzer, BatchOperationAnalyzer, CallAnalyzer, ParameterAnalyzer, ProposalAnalyzer, RegisteredAnalyzer,
};
use crate::config::EngineConfig;
use crate::context::ExecutionContext;
use crate::decoder::{InstructionDecoder, MappingTables, ProposalDecoder};
use crate::environment::{EnvironmentLoader, LoadOptions};
use crate::error::{AnalysisError, AnalyzerError, RegistrationError, RenderError};
use crate::registry::{AnalyzerRegistry, ExecutionPlan, PASS_ORDER};
use crate::renderer::{Renderer, RendererRegistry};
use crate::scope::{AnalysisTarget, NodePath, NodeScope};
use crate::store::DependencyAnnotationStore;
use futures::future::join_all;
use metrics::{counter, histogram};
use proposal_common::{Annotated, AnalyzedProposal, Annotation, TimelockProposal};
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, instrument, warn};

/// What happened to one analyzer on one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalyzerOutcome {
    Succeeded { annotations: usize },
    Skipped,
    Failed { error: String },
    TimedOut { timeout_ms: u64 },
}

impl AnalyzerOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            AnalyzerOutcome::Succeeded { .. } => "succeeded",
            AnalyzerOutcome::Skipped => "skipped",
            AnalyzerOutcome::Failed { .. } => "failed",
            AnalyzerOutcome::TimedOut { .. } => "timed_out",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerOutcomeRecord {
    pub analyzer_id: String,
    pub path: NodePath,
    pub outcome: AnalyzerOutcome,
    pub duration_ms: u64,
}

/// Outcome counts of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub timed_out: usize,
}

/// Everything produced by one analysis run
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    context: ExecutionContext,
    proposal: AnalyzedProposal,
    outcomes: Vec<AnalyzerOutcomeRecord>,
}

impl AnalysisReport {
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn proposal(&self) -> &AnalyzedProposal {
        &self.proposal
    }

    pub fn into_proposal(self) -> AnalyzedProposal {
        self.proposal
    }

    /// Per analyzer and node, in execution order
    pub fn outcomes(&self) -> &[AnalyzerOutcomeRecord] {
        &self.outcomes
    }

    pub fn outcomes_for<'a>(&'a self, analyzer_id: &'a str) -> impl Iterator<Item = &'a AnalyzerOutcomeRecord> + 'a {
        self.outcomes.iter().filter(move |r| r.analyzer_id == analyzer_id)
    }

    pub fn summary(&self) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for record in &self.outcomes {
            match record.outcome {
                AnalyzerOutcome::Succeeded { .. } => summary.succeeded += 1,
                AnalyzerOutcome::Skipped => summary.skipped += 1,
                AnalyzerOutcome::Failed { .. } => summary.failed += 1,
                AnalyzerOutcome::TimedOut { .. } => summary.timed_out += 1,
            }
        }
        summary
    }
}

/// Long-lived engine holding only registration tables.
///
/// Per-run state lives in the [`AnalysisReport`] returned by [`AnalyzerEngine::run`],
/// so concurrent runs on one engine do not interfere.
pub struct AnalyzerEngine {
    config: EngineConfig,
    environments: Arc<dyn EnvironmentLoader>,
    decoder: Arc<dyn ProposalDecoder>,
    analyzers: AnalyzerRegistry,
    renderers: RendererRegistry,
    mapping_tables: MappingTables,
}

impl AnalyzerEngine {
    pub fn new(environments: Arc<dyn EnvironmentLoader>, decoder: Arc<dyn ProposalDecoder>) -> Self {
        Self {
            config: EngineConfig::default(),
            environments,
            decoder,
            analyzers: AnalyzerRegistry::new(),
            renderers: RendererRegistry::new(),
            mapping_tables: MappingTables::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyzers(&self) -> &AnalyzerRegistry {
        &self.analyzers
    }

    pub fn renderers(&self) -> &RendererRegistry {
        &self.renderers
    }

    pub fn register_analyzer(&mut self, analyzer: RegisteredAnalyzer) -> Result<(), RegistrationError> {
        self.analyzers.register(analyzer)
    }

    pub fn register_proposal_analyzer(&mut self, analyzer: Arc<dyn ProposalAnalyzer>) -> Result<(), RegistrationError> {
        self.analyzers.register_proposal_analyzer(analyzer)
    }

    pub fn register_batch_operation_analyzer(&mut self, analyzer: Arc<dyn BatchOperationAnalyzer>) -> Result<(), RegistrationError> {
        self.analyzers.register_batch_operation_analyzer(analyzer)
    }

    pub fn register_call_analyzer(&mut self, analyzer: Arc<dyn CallAnalyzer>) -> Result<(), RegistrationError> {
        self.analyzers.register_call_analyzer(analyzer)
    }

    pub fn register_parameter_analyzer(&mut self, analyzer: Arc<dyn ParameterAnalyzer>) -> Result<(), RegistrationError> {
        self.analyzers.register_parameter_analyzer(analyzer)
    }

    pub fn register_renderer(&mut self, renderer: Arc<dyn Renderer>) -> Result<(), RegistrationError> {
        self.renderers.register(renderer)
    }

    /// Contract identifier ("Type vX.Y.Z") to ABI JSON, handed to the decoder
    pub fn register_evm_abi_mappings(&mut self, mappings: BTreeMap<String, String>) -> Result<(), RegistrationError> {
        self.mapping_tables.register_evm_abi_mappings(mappings)
    }

    /// Program ID to instruction decoder, handed to the decoder
    pub fn register_solana_decoders(&mut self, decoders: BTreeMap<String, Arc<dyn InstructionDecoder>>) -> Result<(), RegistrationError> {
        self.mapping_tables.register_solana_decoders(decoders)
    }

    /// Runs every registered analyzer over the proposal.
    ///
    /// # Workflow
    /// 1. Validate the analyzer dependency graphs
    /// 2. Load an environment scoped to the proposal's chains
    /// 3. Decode the proposal
    /// 4. Parameter, call, batch operation and proposal passes, in that order
    ///
    /// # Returns
    /// - Ok(AnalysisReport): the analyzed tree and per-analyzer outcomes
    /// - Err(AnalysisError): on graph, environment or decode failure, or cancellation.
    ///   Individual analyzer failures never abort the run.
    #[instrument(skip_all, fields(domain = %domain, environment = %environment_name))]
    pub async fn run(&self, cancel: &CancellationToken, domain: &str, environment_name: &str, proposal: &TimelockProposal) -> Result<AnalysisReport, AnalysisError> {
        let plan = self.analyzers.plan()?;
        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled { stage: "startup".to_string() });
        }

        let chain_selectors = proposal.chain_selectors();
        info!(chains = ?chain_selectors, analyzers = plan.analyzer_count(), "Starting proposal analysis");

        let environment = cancellable(
            cancel,
            "environment loading",
            self.environments.load(domain, environment_name, LoadOptions::restricted_to(chain_selectors.clone())),
        )
        .await?
        .map_err(|source| AnalysisError::Environment {
            domain: domain.to_string(),
            environment: environment_name.to_string(),
            chain_selectors: chain_selectors.clone(),
            source,
        })?;

        let decoder_config = self.mapping_tables.snapshot();
        let decoded = cancellable(cancel, "decoding", self.decoder.decode(environment.as_ref(), &decoder_config, proposal))
            .await?
            .map_err(|source| AnalysisError::Decode {
                description: proposal.description.clone(),
                chain_selectors: chain_selectors.clone(),
                source,
            })?;
        let decoded = Arc::new(decoded);
        debug!(
            batches = decoded.batch_operations.len(),
            calls = decoded.call_count(),
            parameters = decoded.parameter_count(),
            "Decoded proposal"
        );

        let execution = Arc::new(ExecutionContext::new(
            domain,
            environment_name,
            environment,
            decoder_config,
            Arc::new(proposal.clone()),
            decoded.clone(),
        ));

        let mut tree = AnalyzedProposal::from_decoded(decoded);
        let mut executor = PassExecutor::new(&self.config, execution.clone(), cancel.clone());
        executor.run_passes(&plan, &mut tree).await?;

        let report = AnalysisReport {
            context: (*execution).clone(),
            proposal: tree,
            outcomes: executor.outcomes,
        };
        let summary = report.summary();
        info!(
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            timed_out = summary.timed_out,
            "Proposal analysis complete"
        );

        Ok(report)
    }

    /// Renders a finished run with a registered renderer
    pub fn render(&self, writer: &mut dyn Write, renderer_id: &str, report: &AnalysisReport) -> Result<(), RenderError> {
        self.renderers.render(writer, renderer_id, report.proposal(), Some(report.context()))
    }
}

async fn cancellable<F: Future>(cancel: &CancellationToken, stage: &str, future: F) -> Result<F::Output, AnalysisError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AnalysisError::Cancelled { stage: stage.to_string() }),
        output = future => Ok(output),
    }
}

/// Internal result of one spawned analyzer task
enum TaskResult {
    Annotated(Vec<Annotation>),
    Skipped,
    Failed(String),
    TimedOut,
}

/// Per-run executor for the four bottom-up passes
struct PassExecutor {
    execution: Arc<ExecutionContext>,
    cancel: CancellationToken,
    timeout: Duration,
    permits: Option<Arc<Semaphore>>,
    outcomes: Vec<AnalyzerOutcomeRecord>,
}

impl PassExecutor {
    fn new(config: &EngineConfig, execution: Arc<ExecutionContext>, cancel: CancellationToken) -> Self {
        Self {
            execution,
            cancel,
            timeout: config.analyzer_timeout(),
            permits: config.max_concurrency.map(|n| Arc::new(Semaphore::new(n))),
            outcomes: Vec::new(),
        }
    }

    async fn run_passes(&mut self, plan: &ExecutionPlan, tree: &mut AnalyzedProposal) -> Result<(), AnalysisError> {
        for pass in PASS_ORDER {
            let levels = plan.levels(pass);
            if levels.is_empty() {
                continue;
            }

            let paths = NodePath::all_at(tree, pass);
            for path in &paths {
                self.analyze_node(tree, *path, levels).await?;
            }
            debug!(pass = %pass, nodes = paths.len(), levels = levels.len(), "Completed analysis pass");
        }
        Ok(())
    }

    async fn analyze_node(&mut self, tree: &mut AnalyzedProposal, path: NodePath, levels: &[Vec<RegisteredAnalyzer>]) -> Result<(), AnalysisError> {
        let (scope, target) = NodeScope::resolve(tree, path).ok_or_else(|| AnalysisError::MissingNode(path.to_string()))?;

        for level in levels {
            if self.cancel.is_cancelled() {
                return Err(AnalysisError::Cancelled {
                    stage: format!("{} pass at {}", path.level(), path),
                });
            }

            let handles: Vec<_> = level
                .iter()
                .map(|analyzer| {
                    let task = AnalyzerTask {
                        analyzer: analyzer.clone(),
                        context: AnalyzerContextParts {
                            execution: self.execution.clone(),
                            scope: scope.clone(),
                            dependencies: DependencyAnnotationStore::collect(tree, path, &analyzer.dependencies()),
                            cancellation: self.cancel.child_token(),
                        },
                        target: target.clone(),
                        timeout: self.timeout,
                        permits: self.permits.clone(),
                    };
                    // Dropping the run future aborts every task of the level
                    AbortOnDropHandle::new(tokio::spawn(task.execute()))
                })
                .collect();

            // Barrier: results come back in level order, not completion order
            let results: Vec<_> = join_all(handles)
                .await
                .into_iter()
                .map(|joined| joined.unwrap_or_else(|join_error| (TaskResult::Failed(format!("analyzer task aborted: {}", join_error)), Duration::ZERO)))
                .collect();

            let node = path.node_mut(tree).ok_or_else(|| AnalysisError::MissingNode(path.to_string()))?;
            for (analyzer, (result, elapsed)) in level.iter().zip(results) {
                let outcome = self.apply(analyzer.id(), &scope, result, node);
                self.record(analyzer.id(), path, outcome, elapsed);
            }
        }

        Ok(())
    }

    /// Sequential append step; the only place nodes are mutated
    fn apply(&self, analyzer_id: &str, scope: &NodeScope, result: TaskResult, node: &mut dyn Annotated) -> AnalyzerOutcome {
        match result {
            TaskResult::Annotated(annotations) => {
                let count = annotations.len();
                node.add_annotations(annotations.into_iter().map(|a| a.produced_by(analyzer_id)).collect());
                debug!(analyzer = analyzer_id, scope = %scope, annotations = count, "Analyzer succeeded");
                AnalyzerOutcome::Succeeded { annotations: count }
            }
            TaskResult::Skipped => {
                debug!(analyzer = analyzer_id, scope = %scope, "Analyzer skipped node");
                AnalyzerOutcome::Skipped
            }
            TaskResult::Failed(error) => {
                warn!(
                    analyzer = analyzer_id,
                    chain_selector = ?scope.chain_selector(),
                    call = ?scope.call_name(),
                    parameter = ?scope.parameter_name(),
                    error = %error,
                    "Analyzer failed"
                );
                AnalyzerOutcome::Failed { error }
            }
            TaskResult::TimedOut => {
                let timeout_ms = self.timeout.as_millis() as u64;
                warn!(
                    analyzer = analyzer_id,
                    chain_selector = ?scope.chain_selector(),
                    call = ?scope.call_name(),
                    parameter = ?scope.parameter_name(),
                    timeout_ms,
                    "Analyzer timed out"
                );
                AnalyzerOutcome::TimedOut { timeout_ms }
            }
        }
    }

    fn record(&mut self, analyzer_id: &str, path: NodePath, outcome: AnalyzerOutcome, elapsed: Duration) {
        counter!("proposal_analyzer_outcomes_total", 1, "outcome" => outcome.label());
        histogram!("proposal_analyzer_duration_seconds", elapsed.as_secs_f64());

        self.outcomes.push(AnalyzerOutcomeRecord {
            analyzer_id: analyzer_id.to_string(),
            path,
            outcome,
            duration_ms: elapsed.as_millis() as u64,
        });
    }
}

/// Context pieces owned by a task until its deadline is known
struct AnalyzerContextParts {
    execution: Arc<ExecutionContext>,
    scope: NodeScope,
    dependencies: DependencyAnnotationStore,
    cancellation: CancellationToken,
}

struct AnalyzerTask {
    analyzer: RegisteredAnalyzer,
    context: AnalyzerContextParts,
    target: AnalysisTarget,
    timeout: Duration,
    permits: Option<Arc<Semaphore>>,
}

impl AnalyzerTask {
    async fn execute(self) -> (TaskResult, Duration) {
        let _permit = match self.permits {
            Some(permits) => match permits.acquire_owned().await {
                Ok(permit) => Some(permit),
                Err(_) => return (TaskResult::Failed("concurrency limiter closed".to_string()), Duration::ZERO),
            },
            None => None,
        };

        // The deadline starts once the task is allowed to run
        let started = Instant::now();
        let deadline = started + self.timeout;
        let cancellation = self.context.cancellation.clone();
        let ctx = AnalyzerContext::new(self.context.execution, self.context.scope, self.context.dependencies, self.context.cancellation, deadline);

        let result = match tokio::time::timeout_at(deadline, invoke(&self.analyzer, &ctx, &self.target)).await {
            Err(_) => {
                cancellation.cancel();
                TaskResult::TimedOut
            }
            Ok(Ok(Some(annotations))) => TaskResult::Annotated(annotations),
            Ok(Ok(None)) => TaskResult::Skipped,
            Ok(Err(error)) => TaskResult::Failed(error.to_string()),
        };

        (result, started.elapsed())
    }
}

/// `None` when the analyzer declined the node
async fn invoke(analyzer: &RegisteredAnalyzer, ctx: &AnalyzerContext, target: &AnalysisTarget) -> Result<Option<Vec<Annotation>>, AnalyzerError> {
    if !analyzer.can_analyze(ctx, target).await? {
        return Ok(None);
    }
    analyzer.analyze(ctx, target).await.map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::DecoderConfig;
    use crate::environment::{Environment, MockEnvironmentLoader, StaticEnvironment, StaticEnvironmentLoader};
    use crate::error::{DecodeError, EnvironmentError};
    use async_trait::async_trait;
    use proposal_common::{BatchOperation, DecodedBatchOperation, DecodedCall, DecodedParameter, DecodedTimelockProposal, Transaction};
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixtureDecoder;

    #[async_trait]
    impl ProposalDecoder for FixtureDecoder {
        async fn decode(&self, _environment: &dyn Environment, _config: &DecoderConfig, proposal: &TimelockProposal) -> Result<DecodedTimelockProposal, DecodeError> {
            let batches = proposal
                .operations
                .iter()
                .map(|op| {
                    let calls = op
                        .transactions
                        .iter()
                        .map(|tx| {
                            DecodedCall::new(tx.to.clone(), "transfer")
                                .with_input(DecodedParameter::new("to", "address", tx.to.clone()))
                                .with_input(DecodedParameter::new("amount", "uint256", 123))
                        })
                        .collect();
                    DecodedBatchOperation::new(op.chain_selector, calls)
                })
                .collect();
            Ok(DecodedTimelockProposal::new(batches))
        }
    }

    struct FailingDecoder;

    #[async_trait]
    impl ProposalDecoder for FailingDecoder {
        async fn decode(&self, _environment: &dyn Environment, _config: &DecoderConfig, _proposal: &TimelockProposal) -> Result<DecodedTimelockProposal, DecodeError> {
            Err(DecodeError::UnknownContract("Mystery v0.0.1".to_string()))
        }
    }

    /// Parameter analyzer that tracks how many invocations overlap
    struct Gauge {
        id: &'static str,
        running: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    impl BaseAnalyzer for Gauge {
        fn id(&self) -> &str {
            self.id
        }
    }

    #[async_trait]
    impl ParameterAnalyzer for Gauge {
        async fn analyze(&self, _ctx: &AnalyzerContext, _parameter: &DecodedParameter) -> Result<Vec<Annotation>, AnalyzerError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    struct Impostor;

    impl BaseAnalyzer for Impostor {
        fn id(&self) -> &str {
            "honest"
        }
    }

    #[async_trait]
    impl CallAnalyzer for Impostor {
        async fn analyze(&self, _ctx: &AnalyzerContext, _call: &DecodedCall) -> Result<Vec<Annotation>, AnalyzerError> {
            Ok(vec![Annotation::new("claim", "string", "forged").produced_by("someone-else")])
        }
    }

    fn proposal() -> TimelockProposal {
        TimelockProposal::new(
            "two chains",
            vec![
                BatchOperation::new(222, vec![Transaction::new("0xbbb", vec![0x02])]),
                BatchOperation::new(111, vec![Transaction::new("0xaaa", vec![0x01])]),
            ],
        )
    }

    fn engine() -> AnalyzerEngine {
        AnalyzerEngine::new(Arc::new(StaticEnvironmentLoader::new([111, 222])), Arc::new(FixtureDecoder))
    }

    #[tokio::test]
    async fn test_environment_is_loaded_for_exactly_the_proposal_chains() {
        let mut loader = MockEnvironmentLoader::new();
        loader
            .expect_load()
            .withf(|domain, environment_name, options| domain == "ccip" && environment_name == "staging" && options.chain_selectors == Some(BTreeSet::from([111, 222])))
            .times(1)
            .returning(|domain, environment_name, options| {
                let environment: Arc<dyn Environment> = Arc::new(StaticEnvironment::new(domain, environment_name, options.chain_selectors.unwrap_or_default(), Default::default()));
                Ok(environment)
            });

        let engine = AnalyzerEngine::new(Arc::new(loader), Arc::new(FixtureDecoder));
        let report = engine.run(&CancellationToken::new(), "ccip", "staging", &proposal()).await.unwrap();

        assert_eq!(report.context().domain(), "ccip");
        assert_eq!(report.context().environment_name(), "staging");
        assert_eq!(report.context().environment().chain_selectors(), BTreeSet::from([111, 222]));
        assert_eq!(report.proposal().batch_operations().len(), 2);
        assert!(report.outcomes().is_empty());
    }

    #[tokio::test]
    async fn test_environment_failure_is_fatal() {
        let mut loader = MockEnvironmentLoader::new();
        loader.expect_load().returning(|_, _, _| Err(EnvironmentError::NotFound("staging".to_string())));

        let engine = AnalyzerEngine::new(Arc::new(loader), Arc::new(FixtureDecoder));
        let err = engine.run(&CancellationToken::new(), "ccip", "staging", &proposal()).await.unwrap_err();

        match err {
            AnalysisError::Environment { domain, environment, chain_selectors, .. } => {
                assert_eq!(domain, "ccip");
                assert_eq!(environment, "staging");
                assert_eq!(chain_selectors, BTreeSet::from([111, 222]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_decode_failure_is_fatal() {
        let engine = AnalyzerEngine::new(Arc::new(StaticEnvironmentLoader::new([111, 222])), Arc::new(FailingDecoder));
        let err = engine.run(&CancellationToken::new(), "ccip", "staging", &proposal()).await.unwrap_err();

        match err {
            AnalysisError::Decode { description, chain_selectors, source } => {
                assert_eq!(description, "two chains");
                assert_eq!(chain_selectors, BTreeSet::from([111, 222]));
                assert!(matches!(source, DecodeError::UnknownContract(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_run_before_loading() {
        let mut loader = MockEnvironmentLoader::new();
        loader.expect_load().never();

        let engine = AnalyzerEngine::new(Arc::new(loader), Arc::new(FixtureDecoder));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = engine.run(&cancel, "ccip", "staging", &proposal()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn test_engine_stamps_producing_analyzer() {
        let mut engine = engine();
        engine.register_call_analyzer(Arc::new(Impostor)).unwrap();

        let report = engine.run(&CancellationToken::new(), "ccip", "staging", &proposal()).await.unwrap();
        for batch in report.proposal().batch_operations() {
            for call in batch.calls() {
                let claims = call.annotations_by_name("claim");
                assert_eq!(claims.len(), 1);
                assert_eq!(claims.iter().next().unwrap().analyzer_id(), Some("honest"));
            }
        }
        assert_eq!(report.summary(), OutcomeSummary { succeeded: 2, ..Default::default() });
    }

    #[tokio::test]
    async fn test_max_concurrency_bounds_parallel_analyzers() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut engine = engine().with_config(EngineConfig::default().with_max_concurrency(1));
        for id in ["g1", "g2", "g3"] {
            engine
                .register_parameter_analyzer(Arc::new(Gauge {
                    id,
                    running: running.clone(),
                    peak: peak.clone(),
                }))
                .unwrap();
        }

        let report = engine.run(&CancellationToken::new(), "ccip", "staging", &proposal()).await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(report.summary().succeeded, 3 * 4);
    }

    #[tokio::test]
    async fn test_unbounded_level_runs_analyzers_together() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut engine = engine();
        for id in ["g1", "g2", "g3"] {
            engine
                .register_parameter_analyzer(Arc::new(Gauge {
                    id,
                    running: running.clone(),
                    peak: peak.clone(),
                }))
                .unwrap();
        }

        engine.run(&CancellationToken::new(), "ccip", "staging", &proposal()).await.unwrap();
        assert_eq!(peak.load(Ordering::SeqCst), 3);
    }

    const TOKEN_ABI: &str = r#"[{"type":"function","name":"transfer"}]"#;

    struct MemoProgram;

    impl InstructionDecoder for MemoProgram {
        fn program_name(&self) -> &str {
            "Memo"
        }

        fn decode(&self, program_id: &str, data: &[u8], _accounts: &serde_json::Value) -> Result<DecodedCall, DecodeError> {
            Ok(DecodedCall::new(program_id, "memo")
                .with_contract(self.program_name(), "")
                .with_input(DecodedParameter::new("length", "u64", data.len() as u64)))
        }
    }

    /// Resolves EVM calls through the ABI table and Solana calls through the decoder table
    struct TableDecoder;

    #[async_trait]
    impl ProposalDecoder for TableDecoder {
        async fn decode(&self, _environment: &dyn Environment, config: &DecoderConfig, proposal: &TimelockProposal) -> Result<DecodedTimelockProposal, DecodeError> {
            let mut batches = Vec::new();
            for op in &proposal.operations {
                let mut calls = Vec::new();
                for tx in &op.transactions {
                    let call = match tx.contract_type.split_once(' ') {
                        Some((contract_type, version)) => {
                            let abi = config.abi_for(contract_type, version).ok_or_else(|| DecodeError::UnknownContract(tx.contract_type.clone()))?;
                            assert_eq!(abi, TOKEN_ABI);
                            DecodedCall::new(tx.to.clone(), "transfer").with_contract(contract_type, version)
                        }
                        None => {
                            let program = config.solana_decoder(&tx.to).ok_or_else(|| DecodeError::UnknownProgram(tx.to.clone()))?;
                            program.decode(&tx.to, &tx.data, &tx.additional_fields)?
                        }
                    };
                    calls.push(call);
                }
                batches.push(DecodedBatchOperation::new(op.chain_selector, calls));
            }
            Ok(DecodedTimelockProposal::new(batches))
        }
    }

    fn mixed_proposal() -> TimelockProposal {
        TimelockProposal::new(
            "evm and solana",
            vec![
                BatchOperation::new(111, vec![Transaction::new("0xaaa", vec![0xa9]).with_contract_type("Token 1.0.0")]),
                BatchOperation::new(222, vec![Transaction::new("MemoProgram1111", vec![1, 2, 3])]),
            ],
        )
    }

    #[tokio::test]
    async fn test_registered_mappings_reach_the_decoder() {
        let mut engine = AnalyzerEngine::new(Arc::new(StaticEnvironmentLoader::new([111, 222])), Arc::new(TableDecoder));
        engine
            .register_evm_abi_mappings(BTreeMap::from([("Token v1.0.0".to_string(), TOKEN_ABI.to_string())]))
            .unwrap();
        let program: Arc<dyn InstructionDecoder> = Arc::new(MemoProgram);
        engine.register_solana_decoders(BTreeMap::from([("MemoProgram1111".to_string(), program)])).unwrap();

        let report = engine.run(&CancellationToken::new(), "ccip", "staging", &mixed_proposal()).await.unwrap();

        let decoded = report.context().decoded();
        assert_eq!(decoded.batch_operations[0].calls[0].contract_identifier(), "Token v1.0.0");
        assert_eq!(decoded.batch_operations[1].calls[0].method, "memo");
        assert_eq!(decoded.batch_operations[1].calls[0].inputs[0].value, serde_json::json!(3));

        let config = report.context().decoder_config();
        assert_eq!(config.abi("Token v1.0.0"), Some(TOKEN_ABI));
        assert_eq!(config.solana_decoder("MemoProgram1111").map(|d| d.program_name()), Some("Memo"));
    }

    #[tokio::test]
    async fn test_decoder_without_registered_mappings_fails_the_run() {
        let engine = AnalyzerEngine::new(Arc::new(StaticEnvironmentLoader::new([111, 222])), Arc::new(TableDecoder));
        let err = engine.run(&CancellationToken::new(), "ccip", "staging", &mixed_proposal()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Decode { source: DecodeError::UnknownContract(ref c), .. } if c == "Token 1.0.0"));
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(AnalyzerOutcome::Succeeded { annotations: 2 }.label(), "succeeded");
        assert_eq!(AnalyzerOutcome::Skipped.label(), "skipped");
        assert_eq!(AnalyzerOutcome::Failed { error: "x".into() }.label(), "failed");
        assert_eq!(AnalyzerOutcome::TimedOut { timeout_ms: 5 }.label(), "timed_out");

        let value = serde_json::to_value(AnalyzerOutcome::TimedOut { timeout_ms: 5 }).unwrap();
        assert_eq!(value, serde_json::json!({"status": "timed_out", "timeout_ms": 5}));
    }
}
