pub mod document;
pub mod node;
pub mod seed;
mod validate;

use std::collections::HashMap;

use log::debug;

use crate::error::{Error, Result};
use document::{NextDoc, NodeDoc, ScenarioDocument};
use node::{Choice, Node, NodeId, NodeKind};

/// A fully loaded scenario: an arena of nodes plus the root id.
///
/// Built only through [`Scenario::from_document`], so every instance has
/// passed validation: references resolve and the `next` graph is acyclic.
#[derive(Debug, Clone)]
pub struct Scenario {
    title: String,
    root: NodeId,
    nodes: Vec<Node>,
}

impl Scenario {
    pub fn from_document(doc: &ScenarioDocument) -> Result<Self> {
        let mut hydrator = Hydrator::default();
        let root = hydrator.add(&doc.root, "root")?;
        let nodes = hydrator.finish()?;

        let scenario = Self {
            title: doc.title.trim().to_string(),
            root,
            nodes,
        };
        validate::validate(&scenario)?;

        debug!(
            "Hydrated scenario '{}' ({} nodes)",
            scenario.title,
            scenario.nodes.len()
        );
        Ok(scenario)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn root_id(&self) -> NodeId {
        self.root
    }

    pub fn root(&self) -> &Node {
        &self.nodes[self.root.0]
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Number of decision nodes on the longest path from the root
    /// (the most steps a student can be asked to make).
    pub fn total_steps(&self) -> usize {
        let mut memo = vec![None; self.nodes.len()];
        self.longest_path(self.root, &mut memo)
    }

    fn longest_path(&self, id: NodeId, memo: &mut [Option<usize>]) -> usize {
        if let Some(known) = memo[id.0] {
            return known;
        }
        let node = &self.nodes[id.0];
        // Reaching an outcome ends a session; only a root outcome is presented.
        let ends_here = node.kind == NodeKind::Outcome && id != self.root;
        let steps = if node.choices.is_empty() || ends_here {
            0
        } else {
            let max_child = node
                .choices
                .iter()
                .filter_map(|c| c.next)
                .map(|next| self.longest_path(next, memo))
                .max()
                .unwrap_or(0);
            1 + max_child
        };
        memo[id.0] = Some(steps);
        steps
    }
}

struct PendingRef {
    node: NodeId,
    choice: usize,
    key: String,
    path: String,
}

/// Turns nested documents into the arena, one node per document occurrence.
#[derive(Default)]
struct Hydrator {
    nodes: Vec<Node>,
    keys: HashMap<String, NodeId>,
    refs: Vec<PendingRef>,
}

impl Hydrator {
    fn add(&mut self, doc: &NodeDoc, path: &str) -> Result<NodeId> {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            kind: doc.kind,
            prompt: doc.prompt.clone(),
            info: doc.info.clone().unwrap_or_default(),
            choices: Vec::new(),
            end: doc.end,
        });

        if let Some(key) = doc.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            if self.keys.insert(key.to_string(), id).is_some() {
                return Err(Error::Validation(format!(
                    "Node key '{key}' at '{path}' is used more than once."
                )));
            }
        }

        let mut choices = Vec::with_capacity(doc.choices.len());
        for (i, choice) in doc.choices.iter().enumerate() {
            let label = choice.label.trim();
            let child_path = if label.is_empty() {
                format!("{path} → #{}", i + 1)
            } else {
                format!("{path} → {label}")
            };

            let next = match &choice.next {
                None => None,
                Some(NextDoc::Node(child)) => Some(self.add(child, &child_path)?),
                Some(NextDoc::Ref(key)) => {
                    self.refs.push(PendingRef {
                        node: id,
                        choice: i,
                        key: key.trim().to_string(),
                        path: child_path,
                    });
                    None
                }
            };

            choices.push(Choice {
                label: label.to_string(),
                text: choice.text.clone(),
                is_correct: choice.is_correct,
                feedback: choice.feedback.clone(),
                next,
            });
        }
        self.nodes[id.0].choices = choices;

        Ok(id)
    }

    fn finish(mut self) -> Result<Vec<Node>> {
        for pending in std::mem::take(&mut self.refs) {
            let target = self.keys.get(&pending.key).copied().ok_or_else(|| {
                Error::Validation(format!(
                    "Choice at '{}' refers to unknown node '{}'.",
                    pending.path, pending.key
                ))
            })?;
            self.nodes[pending.node.0].choices[pending.choice].next = Some(target);
        }
        Ok(self.nodes)
    }
}
