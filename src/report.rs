use serde::Serialize;

use crate::scenario::node::NodeId;
use crate::scenario::Scenario;

/// Shown as the recommendation when a step has no choice marked correct.
pub const NO_RECOMMENDATION: &str = "No recommended choice is defined for this step.";

/// One submitted decision.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step_title: String,
    pub node: NodeId,
    /// Index into the node's choices.
    pub choice: usize,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRow {
    pub step_title: String,
    pub student_choice_label: String,
    pub student_choice_text: String,
    pub student_reasoning: String,
    pub student_was_correct: bool,
    pub recommended_choice_label: Option<String>,
    pub recommended_choice_text: String,
    pub recommended_rationale: String,
    /// Feedback attached to the student's own choice.
    pub result_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub summary: String,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonReport {
    /// Rows in decision order. The recommendation for a step is the first
    /// choice on that node marked correct.
    pub fn build(scenario: &Scenario, summary: impl Into<String>, history: &[StepRecord]) -> Self {
        let rows = history
            .iter()
            .filter_map(|record| {
                let node = scenario.node(record.node)?;
                let chosen = node.choices.get(record.choice)?;
                let recommended = node.recommended_choice();

                Some(ComparisonRow {
                    step_title: record.step_title.clone(),
                    student_choice_label: chosen.label.clone(),
                    student_choice_text: chosen.text.clone(),
                    student_reasoning: record.reasoning.clone(),
                    student_was_correct: chosen.is_correct,
                    recommended_choice_label: recommended.map(|c| c.label.clone()),
                    recommended_choice_text: recommended
                        .map_or_else(|| NO_RECOMMENDATION.to_string(), |c| c.text.clone()),
                    recommended_rationale: recommended
                        .map(|c| c.feedback_text().to_string())
                        .unwrap_or_default(),
                    result_text: chosen.feedback_text().to_string(),
                })
            })
            .collect();

        Self {
            summary: summary.into(),
            rows,
        }
    }

    /// `(correct decisions, decisions made)`.
    pub fn score(&self) -> (usize, usize) {
        let correct = self.rows.iter().filter(|r| r.student_was_correct).count();
        (correct, self.rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::document::ScenarioDocument;
    use serde_json::json;

    fn scenario() -> Scenario {
        let doc: ScenarioDocument = serde_json::from_value(json!({
            "title": "Report",
            "root": {"type": "mcq", "choices": [
                {"label": "A", "text": "Wrong", "feedback": "Too slow."},
                {"label": "B", "text": "Right", "isCorrect": true, "feedback": "Fast and safe."},
                {"label": "C", "text": "Also right", "isCorrect": true, "feedback": "Fine too."}
            ]}
        }))
        .unwrap();
        Scenario::from_document(&doc).unwrap()
    }

    fn record(choice: usize) -> StepRecord {
        StepRecord {
            step_title: "Step 1".into(),
            node: NodeId(0),
            choice,
            reasoning: "because".into(),
        }
    }

    #[test]
    fn test_row_compares_with_first_correct_choice() {
        let report = ComparisonReport::build(&scenario(), "done", &[record(0)]);
        let row = &report.rows[0];
        assert_eq!(row.student_choice_text, "Wrong");
        assert_eq!(row.recommended_choice_label.as_deref(), Some("B"));
        assert_eq!(row.recommended_choice_text, "Right");
        assert_eq!(row.recommended_rationale, "Fast and safe.");
        assert_eq!(row.result_text, "Too slow.");
        assert_eq!(report.score(), (0, 1));
    }

    #[test]
    fn test_placeholder_without_correct_choice() {
        let doc: ScenarioDocument = serde_json::from_value(json!({
            "title": "Open",
            "root": {"type": "mcq", "choices": [{"label": "A", "text": "Only"}]}
        }))
        .unwrap();
        let scenario = Scenario::from_document(&doc).unwrap();
        let report = ComparisonReport::build(&scenario, "done", &[record(0)]);
        assert_eq!(report.rows[0].recommended_choice_text, NO_RECOMMENDATION);
        assert_eq!(report.rows[0].recommended_rationale, "");
        assert_eq!(report.rows[0].recommended_choice_label, None);
    }

    #[test]
    fn test_rows_keep_history_order() {
        let mut second = record(2);
        second.step_title = "Step 2".into();
        let report = ComparisonReport::build(&scenario(), "done", &[record(1), second]);
        let titles: Vec<_> = report.rows.iter().map(|r| r.step_title.as_str()).collect();
        assert_eq!(titles, vec!["Step 1", "Step 2"]);
        assert_eq!(report.score(), (2, 2));
    }
}
