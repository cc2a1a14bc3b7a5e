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

//! Shared data model for timelock proposal analysis
//!
//! Holds the raw proposal as submitted for review, the decoded proposal tree,
//! the annotation model and the analyzed tree produced by the analyzer engine.

pub mod analyzed;
pub mod annotation;
pub mod decoded;
pub mod error;
pub mod proposal;

mod hex_bytes;

pub use analyzed::{AnalyzedBatchOperation, AnalyzedCall, AnalyzedParameter, AnalyzedProposal, TreeLevel};
pub use annotation::{Annotated, Annotation, Annotations, Risk, Severity};
pub use decoded::{DecodedBatchOperation, DecodedCall, DecodedParameter, DecodedTimelockProposal, ParameterDirection};
pub use error::ProposalError;
pub use proposal::{BatchOperation, ChainSelector, TimelockAction, TimelockProposal, Transaction};
