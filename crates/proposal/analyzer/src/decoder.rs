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

//! Proposal decoder contract
//!
//! A decoder turns a raw proposal into the decoded tree using read-only chain
//! lookups. Decoders are configured per run with a snapshot of the engine's
//! mapping tables; swapping the tables changes how calls are decoded without
//! touching anything downstream.

use crate::environment::Environment;
use crate::error::{DecodeError, RegistrationError};
use async_trait::async_trait;
use proposal_common::decoded::contract_identifier;
use proposal_common::{DecodedCall, DecodedTimelockProposal, TimelockProposal};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

pub const EVM_ABI_TABLE: &str = "EVM ABI";
pub const SOLANA_DECODER_TABLE: &str = "Solana instruction decoder";

#[async_trait]
pub trait ProposalDecoder: Send + Sync {
    async fn decode(&self, environment: &dyn Environment, config: &DecoderConfig, proposal: &TimelockProposal) -> Result<DecodedTimelockProposal, DecodeError>;
}

/// Decodes raw instruction data for one Solana program
pub trait InstructionDecoder: Send + Sync {
    /// Human-readable program name used as the contract type of decoded calls
    fn program_name(&self) -> &str;

    fn decode(&self, program_id: &str, data: &[u8], accounts: &serde_json::Value) -> Result<DecodedCall, DecodeError>;
}

/// Run-scoped, immutable view of the decoder mapping tables
#[derive(Clone, Default)]
pub struct DecoderConfig {
    evm_abi_mappings: BTreeMap<String, String>,
    solana_decoders: BTreeMap<String, Arc<dyn InstructionDecoder>>,
}

impl fmt::Debug for DecoderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoderConfig")
            .field("evm_abi_mappings", &self.evm_abi_mappings.keys().collect::<Vec<_>>())
            .field("solana_decoders", &self.solana_decoders.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DecoderConfig {
    pub fn new(evm_abi_mappings: BTreeMap<String, String>, solana_decoders: BTreeMap<String, Arc<dyn InstructionDecoder>>) -> Self {
        Self {
            evm_abi_mappings,
            solana_decoders,
        }
    }

    /// ABI JSON for a "Type vX.Y.Z" contract identifier
    pub fn abi(&self, identifier: &str) -> Option<&str> {
        self.evm_abi_mappings.get(identifier).map(String::as_str)
    }

    pub fn abi_for(&self, contract_type: &str, version: &str) -> Option<&str> {
        self.abi(&contract_identifier(contract_type, version))
    }

    pub fn solana_decoder(&self, program_id: &str) -> Option<&Arc<dyn InstructionDecoder>> {
        self.solana_decoders.get(program_id)
    }

    pub fn evm_contracts(&self) -> impl Iterator<Item = &str> {
        self.evm_abi_mappings.keys().map(String::as_str)
    }

    pub fn solana_programs(&self) -> impl Iterator<Item = &str> {
        self.solana_decoders.keys().map(String::as_str)
    }
}

/// Engine-owned mapping tables with fail-on-duplicate registration
#[derive(Clone, Default)]
pub(crate) struct MappingTables {
    evm_abi_mappings: BTreeMap<String, String>,
    solana_decoders: BTreeMap<String, Arc<dyn InstructionDecoder>>,
}

impl MappingTables {
    /// Adds every entry or none of them
    pub fn register_evm_abi_mappings(&mut self, mappings: BTreeMap<String, String>) -> Result<(), RegistrationError> {
        for (key, abi) in &mappings {
            check_key(EVM_ABI_TABLE, key, self.evm_abi_mappings.contains_key(key))?;
            if abi.trim().is_empty() {
                return Err(RegistrationError::EmptyMappingValue {
                    table: EVM_ABI_TABLE,
                    key: key.clone(),
                });
            }
        }

        self.evm_abi_mappings.extend(mappings);
        Ok(())
    }

    /// Adds every entry or none of them
    pub fn register_solana_decoders(&mut self, decoders: BTreeMap<String, Arc<dyn InstructionDecoder>>) -> Result<(), RegistrationError> {
        for (program_id, decoder) in &decoders {
            check_key(SOLANA_DECODER_TABLE, program_id, self.solana_decoders.contains_key(program_id))?;
            if decoder.program_name().trim().is_empty() {
                return Err(RegistrationError::EmptyMappingValue {
                    table: SOLANA_DECODER_TABLE,
                    key: program_id.clone(),
                });
            }
        }

        self.solana_decoders.extend(decoders);
        Ok(())
    }

    pub fn snapshot(&self) -> DecoderConfig {
        DecoderConfig::new(self.evm_abi_mappings.clone(), self.solana_decoders.clone())
    }
}

fn check_key(table: &'static str, key: &str, already_present: bool) -> Result<(), RegistrationError> {
    if key.trim().is_empty() {
        return Err(RegistrationError::EmptyMappingKey { table });
    }
    if already_present {
        return Err(RegistrationError::DuplicateMapping { table, key: key.to_string() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposal_common::DecodedParameter;

    struct TokenProgram;

    impl InstructionDecoder for TokenProgram {
        fn program_name(&self) -> &str {
            "SPLToken"
        }

        fn decode(&self, program_id: &str, data: &[u8], _accounts: &serde_json::Value) -> Result<DecodedCall, DecodeError> {
            let amount = data.first().copied().ok_or_else(|| DecodeError::MalformedProposal("empty instruction".to_string()))?;
            Ok(DecodedCall::new(program_id, "transfer")
                .with_contract(self.program_name(), "")
                .with_input(DecodedParameter::new("amount", "u64", amount)))
        }
    }

    struct Unnamed;

    impl InstructionDecoder for Unnamed {
        fn program_name(&self) -> &str {
            ""
        }

        fn decode(&self, _program_id: &str, _data: &[u8], _accounts: &serde_json::Value) -> Result<DecodedCall, DecodeError> {
            Err(DecodeError::UnknownProgram("unnamed".to_string()))
        }
    }

    fn abi_table(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_register_and_lookup_abi() {
        let mut tables = MappingTables::default();
        tables.register_evm_abi_mappings(abi_table(&[("OnRamp v1.6.0", "[]"), ("OffRamp v1.6.0", "[{}]")])).unwrap();

        let config = tables.snapshot();
        assert_eq!(config.abi_for("OffRamp", "1.6.0"), Some("[{}]"));
        assert_eq!(config.abi("OnRamp v1.6.0"), Some("[]"));
        assert_eq!(config.abi_for("Router", "1.2.0"), None);
        assert_eq!(config.evm_contracts().collect::<Vec<_>>(), vec!["OffRamp v1.6.0", "OnRamp v1.6.0"]);
    }

    #[test]
    fn test_duplicate_abi_mapping_is_rejected_atomically() {
        let mut tables = MappingTables::default();
        tables.register_evm_abi_mappings(abi_table(&[("OnRamp v1.6.0", "[]")])).unwrap();

        let err = tables.register_evm_abi_mappings(abi_table(&[("FeeQuoter v1.6.0", "[]"), ("OnRamp v1.6.0", "[]")])).unwrap_err();
        assert_eq!(
            err,
            RegistrationError::DuplicateMapping {
                table: EVM_ABI_TABLE,
                key: "OnRamp v1.6.0".to_string()
            }
        );
        assert!(tables.snapshot().abi("FeeQuoter v1.6.0").is_none());
    }

    #[test]
    fn test_empty_keys_and_values_are_rejected() {
        let mut tables = MappingTables::default();
        assert_eq!(
            tables.register_evm_abi_mappings(abi_table(&[("", "[]")])).unwrap_err(),
            RegistrationError::EmptyMappingKey { table: EVM_ABI_TABLE }
        );
        assert!(matches!(
            tables.register_evm_abi_mappings(abi_table(&[("OnRamp v1.6.0", " ")])),
            Err(RegistrationError::EmptyMappingValue { .. })
        ));

        let mut decoders: BTreeMap<String, Arc<dyn InstructionDecoder>> = BTreeMap::new();
        decoders.insert("Prog1111".to_string(), Arc::new(Unnamed));
        assert!(matches!(
            tables.register_solana_decoders(decoders),
            Err(RegistrationError::EmptyMappingValue { table: SOLANA_DECODER_TABLE, .. })
        ));
    }

    #[test]
    fn test_solana_decoder_lookup() {
        let mut tables = MappingTables::default();
        let mut decoders: BTreeMap<String, Arc<dyn InstructionDecoder>> = BTreeMap::new();
        decoders.insert("Tokenkeg".to_string(), Arc::new(TokenProgram));
        tables.register_solana_decoders(decoders).unwrap();

        let config = tables.snapshot();
        let decoder = config.solana_decoder("Tokenkeg").unwrap();
        let call = decoder.decode("Tokenkeg", &[7], &serde_json::Value::Null).unwrap();
        assert_eq!(call.method, "transfer");
        assert_eq!(call.contract_type, "SPLToken");
        assert_eq!(call.inputs[0].value, serde_json::json!(7));
        assert!(config.solana_decoder("Unknown").is_none());
        assert_eq!(config.solana_programs().collect::<Vec<_>>(), vec!["Tokenkeg"]);
    }
}
