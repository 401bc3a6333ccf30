use log::{debug, info, warn};

use crate::report::{ComparisonReport, StepRecord};
use crate::scenario::node::{Choice, Node, NodeId, NodeKind};
use crate::scenario::Scenario;

pub const NO_STEPS_SUMMARY: &str = "This scenario has no decision steps.";
pub const COMPLETED_SUMMARY: &str =
    "You completed the encounter. Review how your decisions compared to the recommended sequence.";
pub const UNEXPECTED_END_SUMMARY: &str = "The scenario ended unexpectedly.";

/// Where a session is in its select → submit → continue cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for a selection and reasoning on this node.
    Presenting(NodeId),
    /// A choice was recorded; `pending` is where continuing leads.
    Submitted {
        node: NodeId,
        choice: usize,
        pending: Option<NodeId>,
    },
    Complete,
}

/// One student's run through a scenario.
///
/// The session only reads the scenario. Each operation either moves the
/// state machine forward or does nothing; none of them fail.
#[derive(Debug, Clone)]
pub struct Session<'a> {
    scenario: &'a Scenario,
    phase: Phase,
    current: NodeId,
    step: usize,
    selected: Option<String>,
    reasoning: String,
    last_response: String,
    narration: Vec<String>,
    history: Vec<StepRecord>,
    outcome: Option<NodeId>,
    report: Option<ComparisonReport>,
}

/// Everything a presentation needs to draw the current state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView<'s> {
    pub title: &'s str,
    pub step_title: String,
    pub prompt: &'s str,
    pub narration: &'s [String],
    pub choices: &'s [Choice],
    pub selected: Option<&'s str>,
    pub reasoning: &'s str,
    pub can_submit: bool,
    pub submitted: bool,
    pub last_response: &'s str,
    pub complete: bool,
    pub report: Option<&'s ComparisonReport>,
}

impl<'a> Session<'a> {
    pub fn start(scenario: &'a Scenario) -> Self {
        let root = scenario.root();
        let mut session = Self {
            scenario,
            phase: Phase::Presenting(root.id),
            current: root.id,
            step: 0,
            selected: None,
            reasoning: String::new(),
            last_response: String::new(),
            narration: Vec::new(),
            history: Vec::new(),
            outcome: None,
            report: None,
        };

        info!("Session started: '{}'", scenario.title());

        if root.choices.is_empty() {
            debug!("Root node has no choices (terminal={})", root.is_terminal());
            session.complete(NO_STEPS_SUMMARY.to_string(), None);
            return session;
        }

        session.push_narration(root);
        session
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Records the pending selection. Ignored once this step is submitted.
    pub fn select_option(&mut self, label: &str) -> bool {
        if !matches!(self.phase, Phase::Presenting(_)) {
            debug!("select_option('{label}') ignored in {:?}", self.phase);
            return false;
        }
        let label = label.trim();
        if label.is_empty() {
            return false;
        }
        self.selected = Some(label.to_string());
        true
    }

    /// Free-text justification for the pending selection.
    pub fn set_reasoning(&mut self, text: &str) {
        if matches!(self.phase, Phase::Presenting(_)) {
            self.reasoning = text.to_string();
        }
    }

    pub fn can_submit(&self) -> bool {
        matches!(self.phase, Phase::Presenting(_))
            && self.selected.is_some()
            && !self.reasoning.trim().is_empty()
            && !self.current_node().choices.is_empty()
    }

    /// Locks in the selection for this step.
    pub fn submit(&mut self) -> bool {
        if !self.can_submit() {
            debug!("submit ignored: not ready in {:?}", self.phase);
            return false;
        }

        let node = self.current_node();
        let label = self.selected.as_deref().unwrap_or_default();
        let Some(index) = node.choice_index(label) else {
            warn!(
                "Label '{label}' is not a choice on node {} ({:?}); ignoring submit",
                node.id,
                node.choices.iter().map(|c| &c.label).collect::<Vec<_>>()
            );
            return false;
        };

        let scenario = self.scenario;
        let choice = &node.choices[index];
        let pending = choice.next;
        self.last_response = pending
            .and_then(|id| scenario.node(id))
            .map(|n| n.prompt_text().to_string())
            .unwrap_or_default();

        let step_title = self.step_title();
        info!(
            "Presenting -> Submitted: {step_title} chose '{}' (correct={})",
            choice.label, choice.is_correct
        );
        let reasoning = self.reasoning.trim().to_string();
        self.history.push(StepRecord {
            step_title,
            node: node.id,
            choice: index,
            reasoning,
        });

        self.phase = Phase::Submitted {
            node: node.id,
            choice: index,
            pending,
        };
        true
    }

    /// The "continue" action: moves to the next node or finishes.
    pub fn advance(&mut self) -> bool {
        let Phase::Submitted { pending, .. } = self.phase else {
            debug!("advance ignored in {:?}", self.phase);
            return false;
        };

        let Some(next_id) = pending else {
            self.complete(COMPLETED_SUMMARY.to_string(), None);
            return true;
        };

        let scenario = self.scenario;
        let Some(next) = scenario.node(next_id) else {
            warn!("Pending node {next_id} does not exist; ending session");
            self.complete(UNEXPECTED_END_SUMMARY.to_string(), None);
            return true;
        };

        if next.kind == NodeKind::Outcome || next.choices.is_empty() {
            let summary = next
                .prompt
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(COMPLETED_SUMMARY)
                .to_string();
            self.complete(summary, Some(next_id));
            return true;
        }

        self.current = next_id;
        self.push_narration(next);
        self.selected = None;
        self.reasoning.clear();
        self.last_response.clear();
        self.step += 1;
        self.phase = Phase::Presenting(next_id);

        info!("Submitted -> Presenting: {} at node {next_id}", self.step_title());
        true
    }

    fn complete(&mut self, summary: String, outcome: Option<NodeId>) {
        self.selected = None;
        self.reasoning.clear();
        self.last_response.clear();
        self.outcome = outcome;
        self.report = Some(ComparisonReport::build(
            self.scenario,
            summary,
            &self.history,
        ));
        self.phase = Phase::Complete;
        info!(
            "Session complete after {} decision(s)",
            self.history.len()
        );
    }

    fn push_narration(&mut self, node: &Node) {
        if let Some(text) = node.info.narration() {
            self.narration.push(text.to_string());
        }
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_node(&self) -> &'a Node {
        let scenario: &'a Scenario = self.scenario;
        scenario.node(self.current).unwrap_or_else(|| scenario.root())
    }

    pub fn current_prompt(&self) -> &'a str {
        self.current_node().prompt_text()
    }

    pub fn current_choices(&self) -> &'a [Choice] {
        &self.current_node().choices
    }

    pub fn narration_log(&self) -> &[String] {
        &self.narration
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.phase, Phase::Submitted { .. })
    }

    pub fn comparison_report(&self) -> Option<&ComparisonReport> {
        self.report.as_ref()
    }

    /// Zero-based index of the current step.
    pub fn step_count(&self) -> usize {
        self.step
    }

    pub fn step_title(&self) -> String {
        format!("Step {}", self.step + 1)
    }

    pub fn selected_label(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn last_response(&self) -> &str {
        &self.last_response
    }

    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    /// The outcome node the session finished on, if it finished on one.
    pub fn outcome(&self) -> Option<&'a Node> {
        let scenario: &'a Scenario = self.scenario;
        self.outcome.and_then(|id| scenario.node(id))
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            title: self.scenario.title(),
            step_title: self.step_title(),
            prompt: self.current_prompt(),
            narration: &self.narration,
            choices: self.current_choices(),
            selected: self.selected_label(),
            reasoning: self.reasoning(),
            can_submit: self.can_submit(),
            submitted: self.is_submitted(),
            last_response: &self.last_response,
            complete: self.is_complete(),
            report: self.report.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::NO_RECOMMENDATION;
    use crate::scenario::document::ScenarioDocument;
    use crate::scenario::seed::anaphylaxis_scenario;
    use serde_json::json;

    fn load(value: serde_json::Value) -> Scenario {
        let doc: ScenarioDocument = serde_json::from_value(value).unwrap();
        Scenario::from_document(&doc).unwrap()
    }

    fn two_choice() -> Scenario {
        load(json!({
            "title": "Two choices",
            "root": {"type": "mcq", "prompt": "Pick", "choices": [
                {"label": "A", "text": "Check vitals", "isCorrect": true, "feedback": "Right.",
                 "next": {"type": "outcome", "prompt": "Stable.", "end": true}},
                {"label": "B", "text": "Order EKG", "isCorrect": false, "feedback": "Too early.",
                 "next": null}
            ]}
        }))
    }

    fn answer(session: &mut Session<'_>, label: &str) {
        assert!(session.select_option(label));
        session.set_reasoning("because");
        assert!(session.submit());
    }

    #[test]
    fn test_terminal_root_completes_immediately() {
        let scenario = load(json!({"title": "Nothing", "root": {"type": "outcome", "end": true}}));
        let session = Session::start(&scenario);
        assert!(session.is_complete());
        assert!(session.history().is_empty());
        let report = session.comparison_report().unwrap();
        assert!(report.rows.is_empty());
        assert_eq!(report.summary, NO_STEPS_SUMMARY);
    }

    #[test]
    fn test_correct_path_to_outcome() {
        let scenario = two_choice();
        let mut session = Session::start(&scenario);
        answer(&mut session, "A");
        assert_eq!(session.last_response(), "Stable.");
        assert!(session.advance());

        assert!(session.is_complete());
        let report = session.comparison_report().unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].recommended_choice_text, "Check vitals");
        assert_eq!(report.summary, "Stable.");
        assert_eq!(session.outcome().map(|n| n.kind), Some(NodeKind::Outcome));
    }

    #[test]
    fn test_null_next_completes() {
        let scenario = two_choice();
        let mut session = Session::start(&scenario);
        answer(&mut session, "B");
        assert_eq!(session.last_response(), "");
        assert!(matches!(
            session.phase(),
            Phase::Submitted { pending: None, .. }
        ));
        assert!(session.advance());

        assert!(session.is_complete());
        let report = session.comparison_report().unwrap();
        assert_eq!(report.summary, COMPLETED_SUMMARY);
        assert_eq!(report.rows[0].student_choice_text, "Order EKG");
        assert_eq!(report.rows[0].result_text, "Too early.");
        assert_eq!(report.rows[0].recommended_rationale, "Right.");
        assert!(session.outcome().is_none());
    }

    #[test]
    fn test_cannot_submit_without_selection_or_reasoning() {
        let scenario = two_choice();
        let mut session = Session::start(&scenario);
        assert!(!session.can_submit());
        assert!(!session.submit());

        session.select_option("A");
        assert!(!session.can_submit());
        session.set_reasoning("   ");
        assert!(!session.can_submit());
        session.set_reasoning("vitals first");
        assert!(session.can_submit());
    }

    #[test]
    fn test_reselect_overwrites_and_second_submit_is_noop() {
        let scenario = two_choice();
        let mut session = Session::start(&scenario);
        session.select_option("B");
        session.select_option("a");
        assert_eq!(session.selected_label(), Some("a"));
        session.set_reasoning("why not");
        assert!(session.submit());

        assert!(!session.submit());
        assert!(!session.select_option("B"));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].choice, 0);
    }

    #[test]
    fn test_unknown_label_is_noop() {
        let scenario = two_choice();
        let mut session = Session::start(&scenario);
        session.select_option("Z");
        session.set_reasoning("guess");
        assert!(!session.submit());
        assert!(matches!(session.phase(), Phase::Presenting(_)));
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_advance_requires_submission() {
        let scenario = two_choice();
        let mut session = Session::start(&scenario);
        assert!(!session.advance());
        assert_eq!(session.step_count(), 0);
    }

    #[test]
    fn test_walks_convergent_scenario() {
        let scenario = Scenario::from_document(&anaphylaxis_scenario()).unwrap();
        let mut session = Session::start(&scenario);
        assert_eq!(session.narration_log().len(), 1);

        for (i, label) in ["A", "B", "D"].into_iter().enumerate() {
            assert_eq!(session.step_count(), i);
            assert_eq!(session.view().step_title, format!("Step {}", i + 1));
            answer(&mut session, label);
            assert!(session.advance());
        }

        assert!(session.is_complete());
        assert_eq!(session.narration_log().len(), 3);
        let report = session.comparison_report().unwrap();
        let chosen: Vec<_> = report
            .rows
            .iter()
            .map(|r| r.student_choice_label.as_str())
            .collect();
        assert_eq!(chosen, vec!["A", "B", "D"]);
        assert_eq!(report.score(), (1, 3));
        assert!(report.summary.starts_with("EMS arrives"));
    }

    #[test]
    fn test_step_advances_by_one() {
        let scenario = load(json!({
            "title": "Chain",
            "root": {"type": "mcq", "choices": [
                {"label": "A", "text": "Next", "next": {"type": "info", "prompt": "More", "choices": [
                    {"label": "A", "text": "Done"}
                ]}}
            ]}
        }));
        let mut session = Session::start(&scenario);
        answer(&mut session, "A");
        assert_eq!(session.last_response(), "More");
        session.advance();
        assert_eq!(session.step_count(), 1);
        assert_eq!(session.current_prompt(), "More");
        assert!(session.selected_label().is_none());
        assert!(session.reasoning().is_empty());
        assert!(!session.is_submitted());

        answer(&mut session, "A");
        session.advance();
        assert!(session.is_complete());
        assert_eq!(session.step_count(), 1);
        let report = session.comparison_report().unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[1].recommended_choice_text, NO_RECOMMENDATION);
    }

    #[test]
    fn test_view_reflects_state() {
        let scenario = two_choice();
        let mut session = Session::start(&scenario);
        session.select_option("A");
        session.set_reasoning("vitals");

        let view = session.view();
        assert_eq!(view.title, "Two choices");
        assert_eq!(view.prompt, "Pick");
        assert_eq!(view.choices.len(), 2);
        assert_eq!(view.selected, Some("A"));
        assert!(view.can_submit);
        assert!(!view.submitted);
        assert!(view.report.is_none());
    }
}
