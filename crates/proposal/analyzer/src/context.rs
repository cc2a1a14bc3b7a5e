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

//! Run-scoped execution context
//!
//! Created by every analysis run and handed out with its report. Renderers
//! and analyzers read run metadata from here instead of from the engine.

use crate::decoder::DecoderConfig;
use crate::environment::Environment;
use proposal_common::{ChainSelector, DecodedTimelockProposal, TimelockProposal};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
pub struct ExecutionContext {
    domain: String,
    environment_name: String,
    environment: Arc<dyn Environment>,
    decoder_config: DecoderConfig,
    proposal: Arc<TimelockProposal>,
    decoded: Arc<DecodedTimelockProposal>,
}

impl ExecutionContext {
    pub fn new(
        domain: impl Into<String>,
        environment_name: impl Into<String>,
        environment: Arc<dyn Environment>,
        decoder_config: DecoderConfig,
        proposal: Arc<TimelockProposal>,
        decoded: Arc<DecodedTimelockProposal>,
    ) -> Self {
        Self {
            domain: domain.into(),
            environment_name: environment_name.into(),
            environment,
            decoder_config,
            proposal,
            decoded,
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    /// Chain-scoped, read-only environment loaded for this run
    pub fn environment(&self) -> &Arc<dyn Environment> {
        &self.environment
    }

    pub fn decoder_config(&self) -> &DecoderConfig {
        &self.decoder_config
    }

    pub fn proposal(&self) -> &TimelockProposal {
        &self.proposal
    }

    pub fn decoded(&self) -> &Arc<DecodedTimelockProposal> {
        &self.decoded
    }

    pub fn chain_selectors(&self) -> BTreeSet<ChainSelector> {
        self.proposal.chain_selectors()
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("domain", &self.domain)
            .field("environment_name", &self.environment_name)
            .field("chain_selectors", &self.environment.chain_selectors())
            .field("decoder_config", &self.decoder_config)
            .field("description", &self.proposal.description)
            .finish()
    }
}
