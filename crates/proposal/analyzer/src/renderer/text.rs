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
use proposal_common::{Annotated, AnalyzedParameter, AnalyzedProposal, Annotation};
use serde_json::Value;
use std::io::{self, Write};

pub const TEXT_RENDERER_ID: &str = "text";

/// Indented human-readable tree
#[derive(Debug, Clone, Copy)]
pub struct TextRenderer {
    indent: usize,
}

impl Default for TextRenderer {
    fn default() -> Self {
        Self { indent: 2 }
    }
}

impl TextRenderer {
    pub fn with_indent(indent: usize) -> Self {
        Self { indent }
    }

    fn pad(&self, depth: usize) -> String {
        " ".repeat(self.indent * depth)
    }

    fn write_annotations(&self, writer: &mut dyn Write, depth: usize, node: &dyn Annotated) -> io::Result<()> {
        for annotation in node.annotations().iter() {
            writeln!(writer, "{}* {}", self.pad(depth), describe(annotation))?;
        }
        Ok(())
    }

    fn write_parameter(&self, writer: &mut dyn Write, depth: usize, parameter: &AnalyzedParameter) -> io::Result<()> {
        let decoded = parameter.decoded();
        writeln!(
            writer,
            "{}{} {} ({}) = {}",
            self.pad(depth),
            parameter.direction(),
            decoded.name,
            decoded.type_descriptor,
            display_value(&decoded.value)
        )?;
        self.write_annotations(writer, depth + 1, parameter)
    }
}

impl Renderer for TextRenderer {
    fn id(&self) -> &str {
        TEXT_RENDERER_ID
    }

    fn render(&self, writer: &mut dyn Write, context: &RenderContext, proposal: &AnalyzedProposal) -> Result<(), RenderError> {
        let chains: Vec<String> = context.chain_selectors.iter().map(u64::to_string).collect();
        writeln!(writer, "Proposal: {}", context.description)?;
        writeln!(writer, "Environment: {}/{}", context.domain, context.environment_name)?;
        writeln!(writer, "Chains: {}", chains.join(", "))?;
        self.write_annotations(writer, 1, proposal)?;

        for (index, batch) in proposal.batch_operations().iter().enumerate() {
            writeln!(writer, "{}Batch {} on chain {}", self.pad(1), index, batch.chain_selector())?;
            self.write_annotations(writer, 2, batch)?;

            for (call_index, call) in batch.calls().iter().enumerate() {
                let decoded = call.decoded();
                let contract = if decoded.contract_type.is_empty() {
                    decoded.address.clone()
                } else {
                    format!("{} at {}", decoded.contract_identifier(), decoded.address)
                };
                writeln!(writer, "{}Call {}: {} on {}", self.pad(2), call_index, decoded.method, contract)?;
                self.write_annotations(writer, 3, call)?;

                for parameter in call.parameters() {
                    self.write_parameter(writer, 3, parameter)?;
                }
            }
        }

        Ok(())
    }
}

fn describe(annotation: &Annotation) -> String {
    let mut line = format!("{} [{}]: {}", annotation.name(), annotation.kind(), display_value(annotation.value()));
    if let Some(id) = annotation.analyzer_id() {
        line.push_str(&format!(" ({})", id));
    }
    line
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
