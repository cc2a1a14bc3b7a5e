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

//! Analyzed proposal tree
//!
//! Mirrors the decoded tree one-to-one (same order, same cardinality) and adds
//! an annotation collection to every node. Each analyzed node shares its
//! decoded counterpart through an `Arc`, so analyzer tasks can hold the node
//! without borrowing from the tree.

use crate::annotation::{Annotated, Annotation, Annotations};
use crate::decoded::{DecodedBatchOperation, DecodedCall, DecodedParameter, DecodedTimelockProposal, ParameterDirection};
use crate::proposal::ChainSelector;
use serde::ser::{Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Depth of a node in the proposal tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeLevel {
    Proposal,
    BatchOperation,
    Call,
    Parameter,
}

impl fmt::Display for TreeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeLevel::Proposal => write!(f, "proposal"),
            TreeLevel::BatchOperation => write!(f, "batch_operation"),
            TreeLevel::Call => write!(f, "call"),
            TreeLevel::Parameter => write!(f, "parameter"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzedParameter {
    decoded: Arc<DecodedParameter>,
    direction: ParameterDirection,
    annotations: Annotations,
}

impl AnalyzedParameter {
    pub fn new(decoded: Arc<DecodedParameter>, direction: ParameterDirection) -> Self {
        Self {
            decoded,
            direction,
            annotations: Annotations::new(),
        }
    }

    pub fn decoded(&self) -> &Arc<DecodedParameter> {
        &self.decoded
    }

    pub fn name(&self) -> &str {
        &self.decoded.name
    }

    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }
}

impl Annotated for AnalyzedParameter {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn add_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations.extend(annotations);
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzedCall {
    decoded: Arc<DecodedCall>,
    inputs: Vec<AnalyzedParameter>,
    outputs: Vec<AnalyzedParameter>,
    annotations: Annotations,
}

impl AnalyzedCall {
    pub fn new(decoded: Arc<DecodedCall>) -> Self {
        let wrap = |params: &[DecodedParameter], direction: ParameterDirection| -> Vec<AnalyzedParameter> {
            params.iter().map(|p| AnalyzedParameter::new(Arc::new(p.clone()), direction)).collect()
        };

        Self {
            inputs: wrap(&decoded.inputs, ParameterDirection::Input),
            outputs: wrap(&decoded.outputs, ParameterDirection::Output),
            decoded,
            annotations: Annotations::new(),
        }
    }

    pub fn decoded(&self) -> &Arc<DecodedCall> {
        &self.decoded
    }

    pub fn name(&self) -> &str {
        &self.decoded.method
    }

    pub fn inputs(&self) -> &[AnalyzedParameter] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[AnalyzedParameter] {
        &self.outputs
    }

    pub fn inputs_mut(&mut self) -> &mut [AnalyzedParameter] {
        &mut self.inputs
    }

    pub fn outputs_mut(&mut self) -> &mut [AnalyzedParameter] {
        &mut self.outputs
    }

    /// Inputs followed by outputs, in declared order
    pub fn parameters(&self) -> impl Iterator<Item = &AnalyzedParameter> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    pub fn parameters_mut(&mut self) -> impl Iterator<Item = &mut AnalyzedParameter> {
        self.inputs.iter_mut().chain(self.outputs.iter_mut())
    }
}

impl Annotated for AnalyzedCall {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn add_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations.extend(annotations);
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzedBatchOperation {
    decoded: Arc<DecodedBatchOperation>,
    calls: Vec<AnalyzedCall>,
    annotations: Annotations,
}

impl AnalyzedBatchOperation {
    pub fn new(decoded: Arc<DecodedBatchOperation>) -> Self {
        Self {
            calls: decoded.calls.iter().map(|c| AnalyzedCall::new(Arc::new(c.clone()))).collect(),
            decoded,
            annotations: Annotations::new(),
        }
    }

    pub fn decoded(&self) -> &Arc<DecodedBatchOperation> {
        &self.decoded
    }

    pub fn chain_selector(&self) -> ChainSelector {
        self.decoded.chain_selector
    }

    pub fn calls(&self) -> &[AnalyzedCall] {
        &self.calls
    }

    pub fn calls_mut(&mut self) -> &mut [AnalyzedCall] {
        &mut self.calls
    }
}

impl Annotated for AnalyzedBatchOperation {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn add_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations.extend(annotations);
    }
}

#[derive(Debug, Clone)]
pub struct AnalyzedProposal {
    decoded: Arc<DecodedTimelockProposal>,
    batch_operations: Vec<AnalyzedBatchOperation>,
    annotations: Annotations,
}

impl AnalyzedProposal {
    /// Allocates an empty analyzed tree isomorphic to the decoded one
    pub fn from_decoded(decoded: Arc<DecodedTimelockProposal>) -> Self {
        Self {
            batch_operations: decoded
                .batch_operations
                .iter()
                .map(|b| AnalyzedBatchOperation::new(Arc::new(b.clone())))
                .collect(),
            decoded,
            annotations: Annotations::new(),
        }
    }

    pub fn decoded(&self) -> &Arc<DecodedTimelockProposal> {
        &self.decoded
    }

    pub fn batch_operations(&self) -> &[AnalyzedBatchOperation] {
        &self.batch_operations
    }

    pub fn batch_operations_mut(&mut self) -> &mut [AnalyzedBatchOperation] {
        &mut self.batch_operations
    }

    /// Every annotation in the tree, depth first, paired with its level
    pub fn all_annotations(&self) -> Vec<(TreeLevel, &Annotation)> {
        let mut out: Vec<(TreeLevel, &Annotation)> = Vec::new();
        for batch in &self.batch_operations {
            for call in batch.calls() {
                for param in call.parameters() {
                    out.extend(param.annotations().iter().map(|a| (TreeLevel::Parameter, a)));
                }
                out.extend(call.annotations().iter().map(|a| (TreeLevel::Call, a)));
            }
            out.extend(batch.annotations().iter().map(|a| (TreeLevel::BatchOperation, a)));
        }
        out.extend(self.annotations.iter().map(|a| (TreeLevel::Proposal, a)));
        out
    }
}

impl Annotated for AnalyzedProposal {
    fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    fn add_annotations(&mut self, annotations: Vec<Annotation>) {
        self.annotations.extend(annotations);
    }
}

#[derive(serde::Serialize)]
struct ParameterView<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    type_descriptor: &'a str,
    value: &'a serde_json::Value,
    annotations: &'a Annotations,
}

impl Serialize for AnalyzedParameter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ParameterView {
            name: &self.decoded.name,
            type_descriptor: &self.decoded.type_descriptor,
            value: &self.decoded.value,
            annotations: &self.annotations,
        }
        .serialize(serializer)
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct CallView<'a> {
    address: &'a str,
    method: &'a str,
    contract_type: &'a str,
    contract_version: &'a str,
    data: String,
    #[serde(skip_serializing_if = "is_null")]
    additional_fields: &'a serde_json::Value,
    inputs: &'a [AnalyzedParameter],
    outputs: &'a [AnalyzedParameter],
    annotations: &'a Annotations,
}

fn is_null(value: &&serde_json::Value) -> bool {
    value.is_null()
}

impl Serialize for AnalyzedCall {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        CallView {
            address: &self.decoded.address,
            method: &self.decoded.method,
            contract_type: &self.decoded.contract_type,
            contract_version: &self.decoded.contract_version,
            data: format!("0x{}", hex::encode(&self.decoded.data)),
            additional_fields: &self.decoded.additional_fields,
            inputs: &self.inputs,
            outputs: &self.outputs,
            annotations: &self.annotations,
        }
        .serialize(serializer)
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchView<'a> {
    chain_selector: ChainSelector,
    calls: &'a [AnalyzedCall],
    annotations: &'a Annotations,
}

impl Serialize for AnalyzedBatchOperation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BatchView {
            chain_selector: self.decoded.chain_selector,
            calls: &self.calls,
            annotations: &self.annotations,
        }
        .serialize(serializer)
    }
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ProposalView<'a> {
    batch_operations: &'a [AnalyzedBatchOperation],
    annotations: &'a Annotations,
}

impl Serialize for AnalyzedProposal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ProposalView {
            batch_operations: &self.batch_operations,
            annotations: &self.annotations,
        }
        .serialize(serializer)
    }
}
