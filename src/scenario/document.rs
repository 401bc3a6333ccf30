use serde::{Deserialize, Serialize};

use crate::scenario::node::{NodeInfo, NodeKind};

/// On-disk form of a scenario: nested nodes, with optional string references
/// to keyed nodes so that several choices can lead to the same place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDocument {
    #[serde(default)]
    pub title: String,
    pub root: NodeDoc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDoc {
    /// Name other choices can use in `next` to point at this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<NodeInfo>,
    #[serde(default)]
    pub choices: Vec<ChoiceDoc>,
    #[serde(default)]
    pub end: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceDoc {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<NextDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NextDoc {
    /// Key of a node defined elsewhere in the same document.
    Ref(String),
    Node(Box<NodeDoc>),
}

impl NodeDoc {
    pub fn new(kind: NodeKind, prompt: impl Into<String>) -> Self {
        Self {
            key: None,
            kind,
            prompt: Some(prompt.into()),
            info: None,
            choices: Vec::new(),
            end: false,
        }
    }

    /// An outcome node that ends the scenario.
    pub fn outcome(prompt: impl Into<String>) -> Self {
        Self {
            end: true,
            ..Self::new(NodeKind::Outcome, prompt)
        }
    }

    pub fn keyed(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn narration(mut self, text: impl Into<String>) -> Self {
        self.info.get_or_insert_with(NodeInfo::default).narration = Some(text.into());
        self
    }

    pub fn choice(mut self, choice: ChoiceDoc) -> Self {
        self.choices.push(choice);
        self
    }
}

impl ChoiceDoc {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
            is_correct: false,
            feedback: None,
            next: None,
        }
    }

    pub fn correct(mut self) -> Self {
        self.is_correct = true;
        self
    }

    pub fn feedback(mut self, text: impl Into<String>) -> Self {
        self.feedback = Some(text.into());
        self
    }

    pub fn leads_to(mut self, node: NodeDoc) -> Self {
        self.next = Some(NextDoc::Node(Box::new(node)));
        self
    }

    pub fn leads_to_key(mut self, key: impl Into<String>) -> Self {
        self.next = Some(NextDoc::Ref(key.into()));
        self
    }
}
