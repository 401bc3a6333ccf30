use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Labels match trimmed and ASCII case-insensitively.
pub fn same_label(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Index of a node inside its scenario's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Multiple-choice decision point.
    Mcq,
    /// Result of a path; reaching one ends the session.
    Outcome,
    /// Narrative-only node.
    #[default]
    Info,
}

/// Free-form node metadata. `narration` is the only field the engine reads;
/// everything else an editor puts here is carried through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narration: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NodeInfo {
    /// Narration text, if present and not blank.
    pub fn narration(&self) -> Option<&str> {
        self.narration
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A single point in a scenario where narration and/or a decision is shown.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub prompt: Option<String>,
    pub info: NodeInfo,
    /// Ordered; labels are unique (case-insensitively) within the node.
    pub choices: Vec<Choice>,
    /// Marked as an end point by the author.
    pub end: bool,
}

impl Node {
    /// No choices and flagged as an end point.
    pub fn is_terminal(&self) -> bool {
        self.end && self.choices.is_empty()
    }

    pub fn prompt_text(&self) -> &str {
        self.prompt.as_deref().unwrap_or("")
    }

    /// Position of the choice with this student-facing label.
    pub fn choice_index(&self, label: &str) -> Option<usize> {
        self.choices.iter().position(|c| same_label(&c.label, label))
    }

    pub fn choice(&self, label: &str) -> Option<&Choice> {
        self.choice_index(label).map(|i| &self.choices[i])
    }

    /// First choice marked correct, in authoring order.
    pub fn recommended_choice(&self) -> Option<&Choice> {
        self.choices.iter().find(|c| c.is_correct)
    }
}

/// One selectable option at a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub label: String,
    pub text: String,
    pub is_correct: bool,
    pub feedback: Option<String>,
    /// May be shared with other choices (convergent paths).
    pub next: Option<NodeId>,
}

impl Choice {
    pub fn feedback_text(&self) -> &str {
        self.feedback.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice(label: &str, correct: bool) -> Choice {
        Choice {
            label: label.into(),
            text: format!("option {label}"),
            is_correct: correct,
            feedback: None,
            next: None,
        }
    }

    fn node(choices: Vec<Choice>, end: bool) -> Node {
        Node {
            id: NodeId(0),
            kind: NodeKind::Mcq,
            prompt: None,
            info: NodeInfo::default(),
            choices,
            end,
        }
    }

    #[test]
    fn test_choice_lookup_ignores_case_and_whitespace() {
        let n = node(vec![choice("A", false), choice("B", true)], false);
        assert_eq!(n.choice(" b ").map(|c| c.label.as_str()), Some("B"));
        assert!(n.choice("C").is_none());
        assert_eq!(n.choice_index("b"), Some(1));
    }

    #[test]
    fn test_labels_fold_ascii_case_only() {
        assert!(same_label(" a", "A "));
        assert!(!same_label("Ä", "ä"));
    }

    #[test]
    fn test_recommended_choice_is_first_correct() {
        let n = node(
            vec![choice("A", false), choice("B", true), choice("C", true)],
            false,
        );
        assert_eq!(n.recommended_choice().map(|c| c.label.as_str()), Some("B"));
    }

    #[test]
    fn test_terminal_requires_end_and_no_choices() {
        assert!(node(vec![], true).is_terminal());
        assert!(!node(vec![], false).is_terminal());
        assert!(!node(vec![choice("A", true)], true).is_terminal());
    }

    #[test]
    fn test_info_keeps_unknown_fields() {
        let info: NodeInfo =
            serde_json::from_str(r#"{"narration": "  It is late. ", "score": 10}"#).unwrap();
        assert_eq!(info.narration(), Some("It is late."));
        assert_eq!(info.extra.get("score"), Some(&Value::from(10)));

        let back = serde_json::to_value(&info).unwrap();
        assert_eq!(back["score"], Value::from(10));
    }

    #[test]
    fn test_blank_narration_is_ignored() {
        let info = NodeInfo {
            narration: Some("   ".into()),
            extra: Map::new(),
        };
        assert_eq!(info.narration(), None);
    }
}
