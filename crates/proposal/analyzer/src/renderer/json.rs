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

use super::{RenderContext, Renderer};
use crate::error::RenderError;
use proposal_common::AnalyzedProposal;
use serde::Serialize;
use std::io::Write;

pub const JSON_RENDERER_ID: &str = "json";

#[derive(Serialize)]
struct Document<'a> {
    context: &'a RenderContext,
    proposal: &'a AnalyzedProposal,
}

/// Pretty-printed JSON document of the whole analyzed tree
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn id(&self) -> &str {
        JSON_RENDERER_ID
    }

    fn render(&self, writer: &mut dyn Write, context: &RenderContext, proposal: &AnalyzedProposal) -> Result<(), RenderError> {
        serde_json::to_writer_pretty(&mut *writer, &Document { context, proposal })?;
        writeln!(writer)?;
        Ok(())
    }
}
