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

//! Decoded proposal tree
//!
//! Produced once per analysis run by a decoder and read-only afterwards:
//! proposal -> batch operations -> calls -> parameters.

use crate::proposal::ChainSelector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// Whether a parameter is a call input or a call output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterDirection {
    Input,
    Output,
}

impl fmt::Display for ParameterDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterDirection::Input => write!(f, "input"),
            ParameterDirection::Output => write!(f, "output"),
        }
    }
}

/// Named, typed call argument or return value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedParameter {
    pub name: String,

    /// ABI-style type descriptor, e.g. "uint256" or "address[]"
    #[serde(rename = "type")]
    pub type_descriptor: String,

    pub value: Value,
}

impl DecodedParameter {
    pub fn new(name: impl Into<String>, type_descriptor: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            type_descriptor: type_descriptor.into(),
            value: value.into(),
        }
    }
}

/// Single decoded on-chain invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedCall {
    pub address: String,
    pub method: String,

    #[serde(default)]
    pub inputs: Vec<DecodedParameter>,

    #[serde(default)]
    pub outputs: Vec<DecodedParameter>,

    #[serde(with = "crate::hex_bytes", default)]
    pub data: Vec<u8>,

    #[serde(default)]
    pub additional_fields: Value,

    #[serde(default)]
    pub contract_type: String,

    #[serde(default)]
    pub contract_version: String,
}

impl DecodedCall {
    pub fn new(address: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            method: method.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            data: Vec::new(),
            additional_fields: Value::Null,
            contract_type: String::new(),
            contract_version: String::new(),
        }
    }

    pub fn with_input(mut self, parameter: DecodedParameter) -> Self {
        self.inputs.push(parameter);
        self
    }

    pub fn with_output(mut self, parameter: DecodedParameter) -> Self {
        self.outputs.push(parameter);
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    pub fn with_contract(mut self, contract_type: impl Into<String>, contract_version: impl Into<String>) -> Self {
        self.contract_type = contract_type.into();
        self.contract_version = contract_version.into();
        self
    }

    /// "Type vX.Y.Z" key used by the ABI mapping table
    pub fn contract_identifier(&self) -> String {
        contract_identifier(&self.contract_type, &self.contract_version)
    }

    /// Parameters of one direction, in declared order
    pub fn parameters(&self, direction: ParameterDirection) -> &[DecodedParameter] {
        match direction {
            ParameterDirection::Input => &self.inputs,
            ParameterDirection::Output => &self.outputs,
        }
    }
}

/// Builds the "Type vX.Y.Z" contract identifier
pub fn contract_identifier(contract_type: &str, version: &str) -> String {
    if version.is_empty() {
        contract_type.to_string()
    } else {
        format!("{} v{}", contract_type, version.trim_start_matches('v'))
    }
}

/// Calls destined for one chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedBatchOperation {
    pub chain_selector: ChainSelector,
    pub calls: Vec<DecodedCall>,
}

impl DecodedBatchOperation {
    pub fn new(chain_selector: ChainSelector, calls: Vec<DecodedCall>) -> Self {
        Self { chain_selector, calls }
    }
}

/// Root of the decoded tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedTimelockProposal {
    pub batch_operations: Vec<DecodedBatchOperation>,
}

impl DecodedTimelockProposal {
    pub fn new(batch_operations: Vec<DecodedBatchOperation>) -> Self {
        Self { batch_operations }
    }

    pub fn chain_selectors(&self) -> BTreeSet<ChainSelector> {
        self.batch_operations.iter().map(|b| b.chain_selector).collect()
    }

    pub fn call_count(&self) -> usize {
        self.batch_operations.iter().map(|b| b.calls.len()).sum()
    }

    pub fn parameter_count(&self) -> usize {
        self.batch_operations
            .iter()
            .flat_map(|b| b.calls.iter())
            .map(|c| c.inputs.len() + c.outputs.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contract_identifier() {
        let call = DecodedCall::new("0x1", "setConfig").with_contract("OffRamp", "1.6.0");
        assert_eq!(call.contract_identifier(), "OffRamp v1.6.0");

        assert_eq!(contract_identifier("OffRamp", "v1.6.0"), "OffRamp v1.6.0");
        assert_eq!(contract_identifier("OffRamp", ""), "OffRamp");
    }

    #[test]
    fn test_counts() {
        let proposal = DecodedTimelockProposal::new(vec![
            DecodedBatchOperation::new(
                1,
                vec![
                    DecodedCall::new("0x1", "transfer")
                        .with_input(DecodedParameter::new("to", "address", "0x2"))
                        .with_input(DecodedParameter::new("amount", "uint256", 5))
                        .with_output(DecodedParameter::new("ok", "bool", true)),
                    DecodedCall::new("0x1", "pause"),
                ],
            ),
            DecodedBatchOperation::new(2, vec![DecodedCall::new("0x3", "unpause")]),
        ]);

        assert_eq!(proposal.call_count(), 3);
        assert_eq!(proposal.parameter_count(), 3);
        assert_eq!(proposal.chain_selectors().len(), 2);
    }

    #[test]
    fn test_parameter_serializes_type_field() {
        let param = DecodedParameter::new("amount", "uint256", json!("123"));
        let value = serde_json::to_value(&param).unwrap();
        assert_eq!(value, json!({ "name": "amount", "type": "uint256", "value": "123" }));
    }
}
