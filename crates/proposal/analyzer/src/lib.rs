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

//! Dependency-aware analysis of timelock proposals
//!
//! The [`AnalyzerEngine`] decodes a proposal, walks the decoded tree bottom-up
//! and runs registered analyzers on every node. Analyzers declare which other
//! analyzers they depend on; the engine orders them into levels, runs each
//! level concurrently under a per-analyzer timeout and only ever shows an
//! analyzer the annotations of its declared dependencies.

pub mod analyzer;
pub mod config;
pub mod context;
pub mod decoder;
pub mod engine;
pub mod environment;
pub mod error;
pub mod graph;
pub mod logging;
pub mod registry;
pub mod renderer;
pub mod scope;
pub mod store;

pub use analyzer::{AnalyzerContext, BaseAnalyzer, BatchOperationAnalyzer, CallAnalyzer, ParameterAnalyzer, ProposalAnalyzer, RegisteredAnalyzer};
pub use config::{EngineConfig, LogFormat};
pub use context::ExecutionContext;
pub use decoder::{DecoderConfig, InstructionDecoder, ProposalDecoder};
pub use engine::{AnalysisReport, AnalyzerEngine, AnalyzerOutcome, AnalyzerOutcomeRecord, OutcomeSummary};
pub use environment::{Environment, EnvironmentLoader, LoadOptions, MetadataStore, StaticEnvironment, StaticEnvironmentLoader};
pub use error::{AnalysisError, AnalyzerError, ConfigError, DecodeError, EnvironmentError, GraphError, RegistrationError, RenderError};
pub use graph::DependencyGraph;
pub use logging::init_logging;
pub use registry::{AnalyzerRegistry, ExecutionPlan, PASS_ORDER};
pub use renderer::{JsonRenderer, RenderContext, Renderer, RendererRegistry, TextRenderer};
pub use scope::{AnalysisTarget, NodePath, NodeScope};
pub use store::{DependencyAnnotationStore, ScopedAnnotation};

pub use proposal_common as model;
