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

//! Error types for the proposal analysis pipeline

use proposal_common::{ChainSelector, TreeLevel};
use std::collections::BTreeSet;
use thiserror::Error;

/// Invalid analyzer dependency declarations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Analyzer '{analyzer}' depends on unknown analyzer '{dependency}'")]
    DanglingDependency { analyzer: String, dependency: String },

    #[error("Analyzer '{0}' depends on itself")]
    SelfDependency(String),

    #[error("Circular dependency detected involving analyzer '{0}'")]
    CycleDetected(String),

    #[error("Analyzer '{0}' appears more than once in the dependency graph")]
    DuplicateAnalyzer(String),
}

/// Rejected registrations on the engine or one of its registries
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("Analyzer ID must not be empty")]
    EmptyAnalyzerId,

    #[error("Analyzer '{0}' is already registered")]
    DuplicateAnalyzer(String),

    #[error("Renderer ID must not be empty")]
    EmptyRendererId,

    #[error("Renderer '{0}' is already registered")]
    DuplicateRenderer(String),

    #[error("Empty key in {table} mapping table")]
    EmptyMappingKey { table: &'static str },

    #[error("Empty value for '{key}' in {table} mapping table")]
    EmptyMappingValue { table: &'static str, key: String },

    #[error("Key '{key}' already present in {table} mapping table")]
    DuplicateMapping { table: &'static str, key: String },
}

/// Failure reported by an individual analyzer. Never fatal to a run.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("{0}")]
    Message(String),

    #[error("Analyzer observed cancellation")]
    Cancelled,

    #[error("Analyzer of kind {kind} cannot analyze a {target} node")]
    KindMismatch { kind: TreeLevel, target: TreeLevel },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AnalyzerError {
    pub fn message(message: impl Into<String>) -> Self {
        AnalyzerError::Message(message.into())
    }
}

#[derive(Debug, Error)]
pub enum EnvironmentError {
    #[error("Chain {0} is not available in this environment")]
    UnknownChain(ChainSelector),

    #[error("Environment '{0}' not found")]
    NotFound(String),

    #[error("Failed to load environment: {0}")]
    Load(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed proposal: {0}")]
    MalformedProposal(String),

    #[error("No ABI registered for contract '{0}'")]
    UnknownContract(String),

    #[error("No instruction decoder registered for program '{0}'")]
    UnknownProgram(String),

    #[error("On-chain lookup failed on chain {chain_selector}: {message}")]
    Lookup { chain_selector: ChainSelector, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Fatal errors that abort an analysis run
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid {level} analyzer dependency graph: {source}")]
    Graph {
        level: TreeLevel,
        #[source]
        source: GraphError,
    },

    #[error("Failed to load environment '{environment}' of domain '{domain}' for chains {chain_selectors:?}: {source}")]
    Environment {
        domain: String,
        environment: String,
        chain_selectors: BTreeSet<ChainSelector>,
        #[source]
        source: EnvironmentError,
    },

    #[error("Failed to decode proposal '{description}' (chains {chain_selectors:?}): {source}")]
    Decode {
        description: String,
        chain_selectors: BTreeSet<ChainSelector>,
        #[source]
        source: DecodeError,
    },

    #[error("Analysis cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("Analyzed tree has no node at {0}")]
    MissingNode(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Renderer '{0}' is not registered")]
    UnknownRenderer(String),

    #[error("No execution context available: run an analysis before rendering")]
    MissingExecutionContext,

    #[error("Failed to write rendered output: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize analyzed proposal: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue { key: String, value: String, reason: String },
}
