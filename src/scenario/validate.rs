use crate::error::{Error, Result};
use crate::scenario::node::{NodeId, NodeKind};
use crate::scenario::Scenario;

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Checks authoring rules over the hydrated arena. Paths in messages follow
/// choice labels from the root, e.g. `root → B → A`.
pub(crate) fn validate(scenario: &Scenario) -> Result<()> {
    if scenario.title().is_empty() {
        return Err(Error::Validation("Scenario must have a title.".into()));
    }

    let mut marks = vec![Mark::Unvisited; scenario.nodes().len()];
    visit(scenario, scenario.root_id(), "root", &mut marks)
}

fn visit(scenario: &Scenario, id: NodeId, path: &str, marks: &mut [Mark]) -> Result<()> {
    match marks[id.0] {
        Mark::Done => return Ok(()),
        Mark::OnPath => {
            return Err(Error::Validation(format!(
                "Choices at '{path}' loop back to an earlier node."
            )))
        }
        Mark::Unvisited => {}
    }
    marks[id.0] = Mark::OnPath;

    let node = &scenario.nodes()[id.0];

    if node.kind == NodeKind::Mcq && node.choices.is_empty() {
        return Err(Error::Validation(format!(
            "MCQ node at '{path}' must have at least one choice."
        )));
    }

    for (i, choice) in node.choices.iter().enumerate() {
        if choice.label.is_empty() {
            return Err(Error::Validation(format!(
                "Choice {} at '{path}' must have a label.",
                i + 1
            )));
        }
        if choice.text.trim().is_empty() {
            return Err(Error::Validation(format!(
                "Choice '{}' at '{path}' must have text.",
                choice.label
            )));
        }
        if node.choice_index(&choice.label) != Some(i) {
            return Err(Error::Validation(format!(
                "Choice label '{}' appears more than once at '{path}'.",
                choice.label
            )));
        }
    }

    for choice in &node.choices {
        if let Some(next) = choice.next {
            visit(scenario, next, &format!("{path} → {}", choice.label), marks)?;
        }
    }

    marks[id.0] = Mark::Done;
    Ok(())
}
