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

//! Error types for the proposal data model

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProposalError {
    #[error("Failed to parse proposal: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Proposal contains no batch operations")]
    NoOperations,

    #[error("Batch operation {index} on chain {chain_selector} contains no transactions")]
    EmptyBatch { index: usize, chain_selector: u64 },
}
