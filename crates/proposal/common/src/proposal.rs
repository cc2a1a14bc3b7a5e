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

//! Raw timelock proposal as submitted for review
//!
//! A proposal groups on-chain transactions into per-chain batch operations. It is
//! the input handed to a decoder; nothing in this crate mutates it.

use crate::error::ProposalError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Numeric chain identity used across the deployment tooling
pub type ChainSelector = u64;

/// What the timelock is asked to do with the batch operations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelockAction {
    #[default]
    Schedule,
    Cancel,
    Bypass,
}

/// Single on-chain call inside a batch operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Target contract address (chain-family specific encoding)
    pub to: String,

    /// Raw call data
    #[serde(with = "crate::hex_bytes")]
    pub data: Vec<u8>,

    /// Contract type and version, e.g. "RBACTimelock 1.0.0"
    #[serde(default)]
    pub contract_type: String,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Chain-family specific payload (e.g. Solana account metas)
    #[serde(default)]
    pub additional_fields: serde_json::Value,
}

impl Transaction {
    pub fn new(to: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            to: to.into(),
            data,
            contract_type: String::new(),
            tags: Vec::new(),
            additional_fields: serde_json::Value::Null,
        }
    }

    pub fn with_contract_type(mut self, contract_type: impl Into<String>) -> Self {
        self.contract_type = contract_type.into();
        self
    }

    pub fn with_additional_fields(mut self, fields: serde_json::Value) -> Self {
        self.additional_fields = fields;
        self
    }
}

/// Per-chain group of transactions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOperation {
    pub chain_selector: ChainSelector,
    pub transactions: Vec<Transaction>,
}

impl BatchOperation {
    pub fn new(chain_selector: ChainSelector, transactions: Vec<Transaction>) -> Self {
        Self { chain_selector, transactions }
    }
}

/// Multisig-gated timelock proposal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelockProposal {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub action: TimelockAction,

    /// Minimum delay before execution, in seconds
    #[serde(default)]
    pub delay_seconds: u64,

    pub operations: Vec<BatchOperation>,
}

fn default_version() -> String {
    "v1".to_string()
}

impl TimelockProposal {
    /// Creates a scheduling proposal with the given batch operations
    pub fn new(description: impl Into<String>, operations: Vec<BatchOperation>) -> Self {
        Self {
            version: default_version(),
            description: description.into(),
            action: TimelockAction::Schedule,
            delay_seconds: 0,
            operations,
        }
    }

    /// Parses and validates a proposal from its JSON form
    pub fn from_json(raw: &str) -> Result<Self, ProposalError> {
        let proposal: Self = serde_json::from_str(raw)?;
        proposal.validate()?;
        Ok(proposal)
    }

    /// Checks structural sanity: at least one batch, no empty batches
    pub fn validate(&self) -> Result<(), ProposalError> {
        if self.operations.is_empty() {
            return Err(ProposalError::NoOperations);
        }

        for (index, operation) in self.operations.iter().enumerate() {
            if operation.transactions.is_empty() {
                return Err(ProposalError::EmptyBatch {
                    index,
                    chain_selector: operation.chain_selector,
                });
            }
        }

        Ok(())
    }

    /// Distinct chain selectors referenced by the proposal, in ascending order
    pub fn chain_selectors(&self) -> BTreeSet<ChainSelector> {
        self.operations.iter().map(|op| op.chain_selector).collect()
    }

    pub fn transaction_count(&self) -> usize {
        self.operations.iter().map(|op| op.transactions.len()).sum()
    }
}
