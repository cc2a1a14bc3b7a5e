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

//! Chain environment provider contract
//!
//! The engine asks for an environment scoped to exactly the chains a proposal
//! touches. Environments are read-only from the engine's point of view.

use crate::error::EnvironmentError;
use async_trait::async_trait;
use proposal_common::ChainSelector;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Read access to the key/value metadata store of an environment
pub trait MetadataStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;

    fn keys(&self) -> Vec<String>;
}

/// Live chain access for one domain/environment pair
pub trait Environment: Send + Sync {
    fn name(&self) -> &str;

    fn domain(&self) -> &str;

    /// Chains this environment can reach
    fn chain_selectors(&self) -> BTreeSet<ChainSelector>;

    fn metadata(&self) -> &dyn MetadataStore;
}

/// Options passed to [`EnvironmentLoader::load`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Restrict chain access to these selectors; all chains when `None`
    pub chain_selectors: Option<BTreeSet<ChainSelector>>,
}

impl LoadOptions {
    pub fn restricted_to(chain_selectors: BTreeSet<ChainSelector>) -> Self {
        Self {
            chain_selectors: Some(chain_selectors),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnvironmentLoader: Send + Sync {
    async fn load(&self, domain: &str, environment_name: &str, options: LoadOptions) -> Result<Arc<dyn Environment>, EnvironmentError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataStore {
    entries: BTreeMap<String, Value>,
}

impl InMemoryMetadataStore {
    pub fn new(entries: BTreeMap<String, Value>) -> Self {
        Self { entries }
    }
}

impl MetadataStore for InMemoryMetadataStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

#[derive(Debug, Clone)]
pub struct StaticEnvironment {
    domain: String,
    name: String,
    chain_selectors: BTreeSet<ChainSelector>,
    metadata: InMemoryMetadataStore,
}

impl StaticEnvironment {
    pub fn new(domain: impl Into<String>, name: impl Into<String>, chain_selectors: BTreeSet<ChainSelector>, metadata: InMemoryMetadataStore) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
            chain_selectors,
            metadata,
        }
    }
}

impl Environment for StaticEnvironment {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> &str {
        &self.domain
    }

    fn chain_selectors(&self) -> BTreeSet<ChainSelector> {
        self.chain_selectors.clone()
    }

    fn metadata(&self) -> &dyn MetadataStore {
        &self.metadata
    }
}

/// Loader backed by a fixed chain set and metadata map.
///
/// Honours the selector restriction and fails for chains it does not know.
#[derive(Debug, Clone, Default)]
pub struct StaticEnvironmentLoader {
    chain_selectors: BTreeSet<ChainSelector>,
    metadata: BTreeMap<String, Value>,
}

impl StaticEnvironmentLoader {
    pub fn new(chain_selectors: impl IntoIterator<Item = ChainSelector>) -> Self {
        Self {
            chain_selectors: chain_selectors.into_iter().collect(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[async_trait]
impl EnvironmentLoader for StaticEnvironmentLoader {
    async fn load(&self, domain: &str, environment_name: &str, options: LoadOptions) -> Result<Arc<dyn Environment>, EnvironmentError> {
        let chains = match options.chain_selectors {
            Some(requested) => {
                if let Some(missing) = requested.iter().find(|s| !self.chain_selectors.contains(s)) {
                    return Err(EnvironmentError::UnknownChain(*missing));
                }
                requested
            }
            None => self.chain_selectors.clone(),
        };

        Ok(Arc::new(StaticEnvironment::new(
            domain,
            environment_name,
            chains,
            InMemoryMetadataStore::new(self.metadata.clone()),
        )))
    }
}
