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

//! Rendering of analyzed proposals
//!
//! Renderers turn a finished [`AnalyzedProposal`] into bytes. The registry
//! only dispatches; every output format is defined by its renderer.

pub mod json;
pub mod text;

pub use json::JsonRenderer;
pub use text::TextRenderer;

use crate::context::ExecutionContext;
use crate::error::{RegistrationError, RenderError};
use proposal_common::{AnalyzedProposal, ChainSelector};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;
use std::sync::Arc;

/// Run metadata a renderer may print alongside the tree
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderContext {
    pub domain: String,
    pub environment_name: String,
    pub chain_selectors: BTreeSet<ChainSelector>,
    pub description: String,
}

impl From<&ExecutionContext> for RenderContext {
    fn from(context: &ExecutionContext) -> Self {
        Self {
            domain: context.domain().to_string(),
            environment_name: context.environment_name().to_string(),
            chain_selectors: context.chain_selectors(),
            description: context.proposal().description.clone(),
        }
    }
}

/// Formats an analyzed proposal
pub trait Renderer: Send + Sync {
    fn id(&self) -> &str;

    fn render(&self, writer: &mut dyn Write, context: &RenderContext, proposal: &AnalyzedProposal) -> Result<(), RenderError>;
}

/// Renderers keyed by ID
#[derive(Clone, Default)]
pub struct RendererRegistry {
    renderers: BTreeMap<String, Arc<dyn Renderer>>,
}

impl fmt::Debug for RendererRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RendererRegistry").field("renderers", &self.ids()).finish()
    }
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the JSON and text renderers
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for renderer in [Arc::new(JsonRenderer) as Arc<dyn Renderer>, Arc::new(TextRenderer::default())] {
            registry.renderers.insert(renderer.id().to_string(), renderer);
        }
        registry
    }

    pub fn register(&mut self, renderer: Arc<dyn Renderer>) -> Result<(), RegistrationError> {
        let id = renderer.id();
        if id.trim().is_empty() {
            return Err(RegistrationError::EmptyRendererId);
        }
        if self.renderers.contains_key(id) {
            return Err(RegistrationError::DuplicateRenderer(id.to_string()));
        }

        self.renderers.insert(id.to_string(), renderer);
        Ok(())
    }

    pub fn get(&self, renderer_id: &str) -> Option<&Arc<dyn Renderer>> {
        self.renderers.get(renderer_id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.renderers.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Renders with the given renderer.
    ///
    /// The renderer is looked up first, so an unknown ID is reported even
    /// when no run has produced a context yet.
    pub fn render(&self, writer: &mut dyn Write, renderer_id: &str, proposal: &AnalyzedProposal, context: Option<&ExecutionContext>) -> Result<(), RenderError> {
        let renderer = self.get(renderer_id).ok_or_else(|| RenderError::UnknownRenderer(renderer_id.to_string()))?;
        let context = context.ok_or(RenderError::MissingExecutionContext)?;

        renderer.render(writer, &RenderContext::from(context), proposal)
    }
}
