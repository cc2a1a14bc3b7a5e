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

//! Node addressing within the analyzed tree

use proposal_common::{
    Annotated, AnalyzedProposal, ChainSelector, DecodedBatchOperation, DecodedCall, DecodedParameter, DecodedTimelockProposal, ParameterDirection,
    TreeLevel,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Position of a node, by index, from the proposal root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum NodePath {
    Proposal,
    BatchOperation {
        batch: usize,
    },
    Call {
        batch: usize,
        call: usize,
    },
    Parameter {
        batch: usize,
        call: usize,
        direction: ParameterDirection,
        index: usize,
    },
}

impl NodePath {
    pub fn level(&self) -> TreeLevel {
        match self {
            NodePath::Proposal => TreeLevel::Proposal,
            NodePath::BatchOperation { .. } => TreeLevel::BatchOperation,
            NodePath::Call { .. } => TreeLevel::Call,
            NodePath::Parameter { .. } => TreeLevel::Parameter,
        }
    }

    /// Every node path of the given level, in tree order.
    ///
    /// Parameters are listed per call, inputs before outputs.
    pub fn all_at(tree: &AnalyzedProposal, level: TreeLevel) -> Vec<NodePath> {
        let mut paths = Vec::new();
        match level {
            TreeLevel::Proposal => paths.push(NodePath::Proposal),
            TreeLevel::BatchOperation => paths.extend((0..tree.batch_operations().len()).map(|batch| NodePath::BatchOperation { batch })),
            TreeLevel::Call => {
                for (batch, op) in tree.batch_operations().iter().enumerate() {
                    paths.extend((0..op.calls().len()).map(|call| NodePath::Call { batch, call }));
                }
            }
            TreeLevel::Parameter => {
                for (batch, op) in tree.batch_operations().iter().enumerate() {
                    for (call, c) in op.calls().iter().enumerate() {
                        for (direction, count) in [(ParameterDirection::Input, c.inputs().len()), (ParameterDirection::Output, c.outputs().len())] {
                            paths.extend((0..count).map(|index| NodePath::Parameter { batch, call, direction, index }));
                        }
                    }
                }
            }
        }
        paths
    }

    /// Borrow the annotated node at this path
    pub fn node<'a>(&self, tree: &'a AnalyzedProposal) -> Option<&'a dyn Annotated> {
        let node: &dyn Annotated = match *self {
            NodePath::Proposal => tree as &dyn Annotated,
            NodePath::BatchOperation { batch } => tree.batch_operations().get(batch)?,
            NodePath::Call { batch, call } => tree.batch_operations().get(batch)?.calls().get(call)?,
            NodePath::Parameter { batch, call, direction, index } => {
                let c = tree.batch_operations().get(batch)?.calls().get(call)?;
                match direction {
                    ParameterDirection::Input => c.inputs().get(index)?,
                    ParameterDirection::Output => c.outputs().get(index)?,
                }
            }
        };
        Some(node)
    }

    pub fn node_mut<'a>(&self, tree: &'a mut AnalyzedProposal) -> Option<&'a mut dyn Annotated> {
        let node: &mut dyn Annotated = match *self {
            NodePath::Proposal => tree as &mut dyn Annotated,
            NodePath::BatchOperation { batch } => tree.batch_operations_mut().get_mut(batch)?,
            NodePath::Call { batch, call } => tree.batch_operations_mut().get_mut(batch)?.calls_mut().get_mut(call)?,
            NodePath::Parameter { batch, call, direction, index } => {
                let c = tree.batch_operations_mut().get_mut(batch)?.calls_mut().get_mut(call)?;
                match direction {
                    ParameterDirection::Input => c.inputs_mut().get_mut(index)?,
                    ParameterDirection::Output => c.outputs_mut().get_mut(index)?,
                }
            }
        };
        Some(node)
    }

    /// Paths of this node and all of its descendants, children first
    pub fn subtree(&self, tree: &AnalyzedProposal) -> Vec<NodePath> {
        let mut out = Vec::new();
        self.collect_subtree(tree, &mut out);
        out
    }

    fn collect_subtree(&self, tree: &AnalyzedProposal, out: &mut Vec<NodePath>) {
        match *self {
            NodePath::Proposal => {
                for batch in 0..tree.batch_operations().len() {
                    NodePath::BatchOperation { batch }.collect_subtree(tree, out);
                }
            }
            NodePath::BatchOperation { batch } => {
                let calls = tree.batch_operations().get(batch).map_or(0, |b| b.calls().len());
                for call in 0..calls {
                    NodePath::Call { batch, call }.collect_subtree(tree, out);
                }
            }
            NodePath::Call { batch, call } => {
                if let Some(c) = tree.batch_operations().get(batch).and_then(|b| b.calls().get(call)) {
                    for (direction, count) in [(ParameterDirection::Input, c.inputs().len()), (ParameterDirection::Output, c.outputs().len())] {
                        out.extend((0..count).map(|index| NodePath::Parameter { batch, call, direction, index }));
                    }
                }
            }
            NodePath::Parameter { .. } => {}
        }
        out.push(*self);
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodePath::Proposal => write!(f, "proposal"),
            NodePath::BatchOperation { batch } => write!(f, "batch[{}]", batch),
            NodePath::Call { batch, call } => write!(f, "batch[{}].call[{}]", batch, call),
            NodePath::Parameter { batch, call, direction, index } => write!(f, "batch[{}].call[{}].{}[{}]", batch, call, direction, index),
        }
    }
}

/// Decoded node handed to an analyzer
#[derive(Debug, Clone)]
pub enum AnalysisTarget {
    Proposal(Arc<DecodedTimelockProposal>),
    BatchOperation(Arc<DecodedBatchOperation>),
    Call(Arc<DecodedCall>),
    Parameter(Arc<DecodedParameter>),
}

impl AnalysisTarget {
    pub fn level(&self) -> TreeLevel {
        match self {
            AnalysisTarget::Proposal(_) => TreeLevel::Proposal,
            AnalysisTarget::BatchOperation(_) => TreeLevel::BatchOperation,
            AnalysisTarget::Call(_) => TreeLevel::Call,
            AnalysisTarget::Parameter(_) => TreeLevel::Parameter,
        }
    }
}

/// Where in the proposal an analyzer is running
#[derive(Debug, Clone)]
pub struct NodeScope {
    path: NodePath,
    chain_selector: Option<ChainSelector>,
    call: Option<Arc<DecodedCall>>,
    parameter: Option<Arc<DecodedParameter>>,
}

impl NodeScope {
    /// Resolves the scope and target for a path, or `None` if the path is stale
    pub fn resolve(tree: &AnalyzedProposal, path: NodePath) -> Option<(NodeScope, AnalysisTarget)> {
        let mut scope = NodeScope {
            path,
            chain_selector: None,
            call: None,
            parameter: None,
        };

        let target = match path {
            NodePath::Proposal => AnalysisTarget::Proposal(tree.decoded().clone()),
            NodePath::BatchOperation { batch } => {
                let op = tree.batch_operations().get(batch)?;
                scope.chain_selector = Some(op.chain_selector());
                AnalysisTarget::BatchOperation(op.decoded().clone())
            }
            NodePath::Call { batch, call } => {
                let op = tree.batch_operations().get(batch)?;
                let c = op.calls().get(call)?;
                scope.chain_selector = Some(op.chain_selector());
                scope.call = Some(c.decoded().clone());
                AnalysisTarget::Call(c.decoded().clone())
            }
            NodePath::Parameter { batch, call, direction, index } => {
                let op = tree.batch_operations().get(batch)?;
                let c = op.calls().get(call)?;
                let p = match direction {
                    ParameterDirection::Input => c.inputs().get(index)?,
                    ParameterDirection::Output => c.outputs().get(index)?,
                };
                scope.chain_selector = Some(op.chain_selector());
                scope.call = Some(c.decoded().clone());
                scope.parameter = Some(p.decoded().clone());
                AnalysisTarget::Parameter(p.decoded().clone())
            }
        };

        Some((scope, target))
    }

    pub fn path(&self) -> NodePath {
        self.path
    }

    pub fn level(&self) -> TreeLevel {
        self.path.level()
    }

    pub fn chain_selector(&self) -> Option<ChainSelector> {
        self.chain_selector
    }

    /// Call being analyzed, or owning the parameter being analyzed
    pub fn call(&self) -> Option<&Arc<DecodedCall>> {
        self.call.as_ref()
    }

    pub fn call_name(&self) -> Option<&str> {
        self.call.as_deref().map(|c| c.method.as_str())
    }

    pub fn parameter_name(&self) -> Option<&str> {
        self.parameter.as_deref().map(|p| p.name.as_str())
    }
}

impl fmt::Display for NodeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)?;
        if let Some(selector) = self.chain_selector {
            write!(f, " chain_selector={}", selector)?;
        }
        if let Some(call) = self.call_name() {
            write!(f, " call={}", call)?;
        }
        if let Some(param) = self.parameter_name() {
            write!(f, " parameter={}", param)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proposal_common::{Annotation, DecodedBatchOperation};

    fn tree() -> AnalyzedProposal {
        AnalyzedProposal::from_decoded(Arc::new(DecodedTimelockProposal::new(vec![
            DecodedBatchOperation::new(
                111,
                vec![
                    DecodedCall::new("0xaa", "transfer")
                        .with_input(DecodedParameter::new("amount", "uint256", 123))
                        .with_output(DecodedParameter::new("ok", "bool", true)),
                ],
            ),
            DecodedBatchOperation::new(222, vec![DecodedCall::new("0xbb", "pause")]),
        ])))
    }

    #[test]
    fn test_all_at_parameter_level_orders_inputs_before_outputs() {
        let paths = NodePath::all_at(&tree(), TreeLevel::Parameter);
        assert_eq!(
            paths,
            vec![
                NodePath::Parameter { batch: 0, call: 0, direction: ParameterDirection::Input, index: 0 },
                NodePath::Parameter { batch: 0, call: 0, direction: ParameterDirection::Output, index: 0 },
            ]
        );
        assert_eq!(NodePath::all_at(&tree(), TreeLevel::Call).len(), 2);
        assert_eq!(NodePath::all_at(&tree(), TreeLevel::BatchOperation).len(), 2);
        assert_eq!(NodePath::all_at(&tree(), TreeLevel::Proposal), vec![NodePath::Proposal]);
    }

    #[test]
    fn test_subtree_lists_children_first() {
        let subtree = NodePath::BatchOperation { batch: 0 }.subtree(&tree());
        assert_eq!(subtree.len(), 4);
        assert_eq!(subtree.last(), Some(&NodePath::BatchOperation { batch: 0 }));
        assert_eq!(subtree[2], NodePath::Call { batch: 0, call: 0 });
        assert_eq!(NodePath::Proposal.subtree(&tree()).len(), 7);
    }

    #[test]
    fn test_node_mut_appends_to_addressed_node() {
        let mut tree = tree();
        let path = NodePath::Parameter {
            batch: 0,
            call: 0,
            direction: ParameterDirection::Output,
            index: 0,
        };
        path.node_mut(&mut tree).unwrap().add_annotations(vec![Annotation::new("seen", "bool", true)]);

        assert_eq!(tree.batch_operations()[0].calls()[0].outputs()[0].annotations().len(), 1);
        assert_eq!(path.node(&tree).unwrap().annotations().len(), 1);
        assert!(NodePath::Call { batch: 5, call: 0 }.node_mut(&mut tree).is_none());
    }

    #[test]
    fn test_resolve_scope() {
        let tree = tree();
        let (scope, target) = NodeScope::resolve(
            &tree,
            NodePath::Parameter {
                batch: 0,
                call: 0,
                direction: ParameterDirection::Input,
                index: 0,
            },
        )
        .unwrap();

        assert_eq!(target.level(), TreeLevel::Parameter);
        assert_eq!(scope.chain_selector(), Some(111));
        assert_eq!(scope.call_name(), Some("transfer"));
        assert_eq!(scope.parameter_name(), Some("amount"));
        assert_eq!(scope.to_string(), "batch[0].call[0].input[0] chain_selector=111 call=transfer parameter=amount");

        assert!(NodeScope::resolve(&tree, NodePath::BatchOperation { batch: 9 }).is_none());
    }
}
