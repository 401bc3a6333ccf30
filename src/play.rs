use std::collections::HashSet;
use std::io::{BufRead, Write};

use anyhow::{bail, Result};
use log::{debug, info};

use crate::access::gate::AccessGrant;
use crate::report::ComparisonReport;
use crate::scenario::node::{NodeId, NodeKind};
use crate::scenario::Scenario;
use crate::session::Session;
use crate::store::ScenarioSource;

/// Checks the grant, then loads the id as the grant spells it. Unknown ids
/// the caller cannot see are reported as access denied, not as missing.
pub fn open_scenario(
    source: &dyn ScenarioSource,
    grant: &AccessGrant,
    id: &str,
) -> crate::error::Result<Scenario> {
    let stored = grant.ensure_allowed(id)?;
    source.load_scenario(stored)
}

// ---------------------------------------------------------------------------
// Line input
// ---------------------------------------------------------------------------

/// `None` on end of input.
fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn ask<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> Result<Option<String>> {
    write!(out, "{prompt}")?;
    out.flush()?;
    read_line(input)
}

fn is_quit(text: &str) -> bool {
    text.eq_ignore_ascii_case("quit") || text.eq_ignore_ascii_case("exit")
}

// ---------------------------------------------------------------------------
// Case review screen
// ---------------------------------------------------------------------------

/// Outcome of a single run through the scenario.
enum RoundOutcome {
    Finished(ComparisonReport),
    /// Student typed quit (or input ended) mid-round.
    Quit,
}

fn show_review<W: Write>(out: &mut W, outcome: &RoundOutcome, total_steps: usize) -> Result<()> {
    writeln!(out, "\n========================================")?;
    writeln!(out, "             CASE REVIEW")?;
    writeln!(out, "========================================")?;

    match outcome {
        RoundOutcome::Finished(report) => {
            writeln!(out, "{}", report.summary)?;
            let (correct, made) = report.score();
            writeln!(
                out,
                "  Score: {correct} / {made} recommended decisions (longest path: {total_steps} steps)"
            )?;

            for row in &report.rows {
                writeln!(out, "\n--- {} ---", row.step_title)?;
                writeln!(
                    out,
                    "  You chose      : {}. {}",
                    row.student_choice_label, row.student_choice_text
                )?;
                writeln!(out, "  Your reasoning : {}", row.student_reasoning)?;
                match &row.recommended_choice_label {
                    Some(label) => writeln!(
                        out,
                        "  Recommended    : {label}. {}",
                        row.recommended_choice_text
                    )?,
                    None => writeln!(out, "  Recommended    : {}", row.recommended_choice_text)?,
                }
                if !row.recommended_rationale.is_empty() {
                    writeln!(out, "  Why            : {}", row.recommended_rationale)?;
                }
                if !row.result_text.is_empty() {
                    writeln!(out, "  What happened  : {}", row.result_text)?;
                }
            }
        }
        RoundOutcome::Quit => {
            writeln!(out, "  You stepped away from the patient.")?;
        }
    }

    writeln!(out, "========================================\n")?;
    writeln!(out, "  [r] Restart    [q] Quit\n")?;
    Ok(())
}

/// Returns `true` to restart, `false` to quit.
fn prompt_restart<R: BufRead, W: Write>(input: &mut R, out: &mut W) -> Result<bool> {
    loop {
        let Some(answer) = ask(input, out, "> ")? else {
            return Ok(false);
        };
        match answer.to_lowercase().as_str() {
            "r" => return Ok(true),
            "q" => return Ok(false),
            _ => writeln!(out, "  Press [r] to restart or [q] to quit.")?,
        }
    }
}

// ---------------------------------------------------------------------------
// Single round
// ---------------------------------------------------------------------------

fn play_round<R: BufRead, W: Write>(
    scenario: &Scenario,
    input: &mut R,
    out: &mut W,
) -> Result<RoundOutcome> {
    let mut session = Session::start(scenario);
    let mut narrated = 0;

    loop {
        let view = session.view();
        if view.complete {
            debug!(
                "Finished on {:?}",
                session.outcome().map(|node| node.id)
            );
            let Some(report) = view.report else {
                bail!("session for '{}' completed without a report", view.title);
            };
            return Ok(RoundOutcome::Finished(report.clone()));
        }

        for line in &view.narration[narrated..] {
            writeln!(out, "\n  {line}")?;
        }
        narrated = view.narration.len();

        writeln!(out, "\n[{}] {}", view.step_title, view.prompt)?;
        for choice in view.choices {
            writeln!(out, "  {}. {}", choice.label, choice.text)?;
        }
        let labels: Vec<&str> = session
            .current_choices()
            .iter()
            .map(|c| c.label.as_str())
            .collect();

        loop {
            let Some(answer) = ask(input, out, "\nYour choice: ")? else {
                return Ok(RoundOutcome::Quit);
            };
            if is_quit(&answer) {
                return Ok(RoundOutcome::Quit);
            }
            if session.current_node().choice(&answer).is_none() {
                writeln!(out, "(Pick one of: {})", labels.join(", "))?;
                continue;
            }
            session.select_option(&answer);
            break;
        }

        loop {
            let Some(reasoning) = ask(input, out, "Why? ")? else {
                return Ok(RoundOutcome::Quit);
            };
            if is_quit(&reasoning) {
                return Ok(RoundOutcome::Quit);
            }
            session.set_reasoning(&reasoning);
            if session.view().can_submit {
                break;
            }
            writeln!(out, "(Please explain your choice.)")?;
        }

        if !session.submit() {
            continue;
        }

        let view = session.view();
        debug!(
            "{} submitted '{}' ({} decision(s) so far)",
            view.title,
            view.selected.unwrap_or_default(),
            session.history().len()
        );
        if view.submitted && !view.last_response.is_empty() {
            writeln!(out, "\n> {}", view.last_response)?;
        }
        if ask(input, out, "\n(Press Enter to continue)")?.is_none() {
            return Ok(RoundOutcome::Quit);
        }
        session.advance();
    }
}

// ---------------------------------------------------------------------------
// Public entry point: runs rounds until the student quits
// ---------------------------------------------------------------------------

pub fn run<R: BufRead, W: Write>(scenario: &Scenario, input: &mut R, out: &mut W) -> Result<()> {
    let total_steps = scenario.total_steps();

    loop {
        writeln!(out, "\n========================================")?;
        writeln!(out, "   {}", scenario.title())?;
        writeln!(out, "========================================")?;
        writeln!(out, "Make the next best decision at each step.")?;
        writeln!(out, "Type 'quit' at any prompt to stop.")?;

        let outcome = play_round(scenario, input, out)?;
        show_review(out, &outcome, total_steps)?;

        if !prompt_restart(input, out)? {
            writeln!(out, "Thanks for practising!")?;
            break;
        }

        info!("Student chose to restart '{}'", scenario.title());
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// Indented tree of the scenario. Nodes reached a second time through a
/// shared reference are printed as a pointer instead of being expanded again.
pub fn outline(scenario: &Scenario) -> String {
    let mut text = format!(
        "{} ({} nodes, up to {} steps)\n",
        scenario.title(),
        scenario.nodes().len(),
        scenario.total_steps()
    );
    let mut seen = HashSet::new();
    outline_node(scenario, scenario.root_id(), 1, &mut seen, &mut text);
    text
}

fn outline_node(
    scenario: &Scenario,
    id: NodeId,
    depth: usize,
    seen: &mut HashSet<NodeId>,
    text: &mut String,
) {
    let Some(node) = scenario.node(id) else {
        return;
    };
    let indent = "  ".repeat(depth);

    if !seen.insert(id) {
        text.push_str(&format!("{indent}(see {id} above)\n"));
        return;
    }

    let kind = match node.kind {
        NodeKind::Mcq => "mcq",
        NodeKind::Outcome => "outcome",
        NodeKind::Info => "info",
    };
    let end = if node.end { ", end" } else { "" };
    text.push_str(&format!("{indent}{id} [{kind}{end}] {}\n", node.prompt_text()));

    for choice in &node.choices {
        let mark = if choice.is_correct { "*" } else { " " };
        text.push_str(&format!("{indent} {mark}{}. {}\n", choice.label, choice.text));
        if let Some(next) = choice.next {
            outline_node(scenario, next, depth + 2, seen, text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::profile::Theme;
    use crate::error::Error;
    use crate::scenario::seed::{anaphylaxis_scenario, chest_pain_scenario};
    use std::io::Cursor;

    fn play(scenario: &Scenario, script: &str) -> String {
        let mut input = Cursor::new(script.as_bytes().to_vec());
        let mut out = Vec::new();
        run(scenario, &mut input, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_full_round_prints_review() {
        let scenario = Scenario::from_document(&chest_pain_scenario()).unwrap();
        let output = play(&scenario, "A\nvitals first\n\nq\n");

        assert!(output.contains("Chest Pain Assessment"));
        assert!(output.contains("A. Check vital signs"));
        assert!(output.contains("> Good job!"));
        assert!(output.contains("CASE REVIEW"));
        assert!(output.contains("Score: 1 / 1"));
        assert!(output.contains("Your reasoning : vitals first"));
        assert!(output.contains("Thanks for practising!"));
    }

    #[test]
    fn test_reprompts_for_bad_label_and_empty_reasoning() {
        let scenario = Scenario::from_document(&chest_pain_scenario()).unwrap();
        let output = play(&scenario, "Z\nb\n\n   \nEKG is quick\n\nq\n");

        assert!(output.contains("(Pick one of: A, B)"));
        assert!(output.contains("(Please explain your choice.)"));
        assert!(output.contains("You chose      : B. Order an EKG immediately"));
        assert!(output.contains("Recommended    : A. Check vital signs"));
        assert!(output.contains("Score: 0 / 1"));
    }

    #[test]
    fn test_quit_mid_round_then_restart() {
        let scenario = Scenario::from_document(&anaphylaxis_scenario()).unwrap();
        let output = play(&scenario, "quit\nr\nB\nairway\n\nquit\nq\n");

        assert_eq!(output.matches("You stepped away").count(), 2);
        assert!(output.contains("The patient walks in looking anxious."));
        assert!(output.contains("You notice hives"));
    }

    #[test]
    fn test_scenario_without_steps_reviews_session_summary() {
        let doc: crate::scenario::document::ScenarioDocument = serde_json::from_value(
            serde_json::json!({"title": "Briefing", "root": {"type": "outcome", "end": true}}),
        )
        .unwrap();
        let scenario = Scenario::from_document(&doc).unwrap();
        let output = play(&scenario, "q\n");

        assert!(output.contains(crate::session::NO_STEPS_SUMMARY));
        assert!(output.contains("Score: 0 / 0"));
    }

    #[test]
    fn test_end_of_input_stops_cleanly() {
        let scenario = Scenario::from_document(&chest_pain_scenario()).unwrap();
        let output = play(&scenario, "A\n");
        assert!(output.contains("You stepped away"));
        assert!(output.ends_with("Thanks for practising!\n"));
    }

    #[test]
    fn test_outline_marks_shared_nodes() {
        let scenario = Scenario::from_document(&anaphylaxis_scenario()).unwrap();
        let text = outline(&scenario);
        assert!(text.starts_with("Allergic Reaction in Clinic (4 nodes, up to 3 steps)"));
        assert!(text.contains("(see #1 above)"));
        assert!(text.contains("*B. Assess airway and breathing right now"));
    }

    struct OneScenario;

    impl ScenarioSource for OneScenario {
        fn scenario_ids(&self) -> crate::error::Result<Vec<String>> {
            Ok(vec!["chest-pain".into()])
        }

        fn load_scenario(&self, id: &str) -> crate::error::Result<Scenario> {
            if id == "chest-pain" {
                Scenario::from_document(&chest_pain_scenario())
            } else {
                Err(Error::NotFound(format!("Scenario '{id}' not found.")))
            }
        }
    }

    fn grant(ids: &[&str]) -> AccessGrant {
        AccessGrant {
            email: "s@ua.edu".into(),
            is_admin: false,
            allowed_scenario_ids: ids.iter().map(|s| s.to_string()).collect(),
            theme: Theme::Light,
        }
    }

    #[test]
    fn test_open_scenario_checks_grant_first() {
        assert!(open_scenario(&OneScenario, &grant(&["chest-pain"]), "chest-pain").is_ok());
        assert!(matches!(
            open_scenario(&OneScenario, &grant(&[]), "chest-pain"),
            Err(Error::AccessDenied(_))
        ));
        assert!(matches!(
            open_scenario(&OneScenario, &grant(&["ghost"]), "ghost"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_open_scenario_uses_stored_spelling() {
        let scenario =
            open_scenario(&OneScenario, &grant(&["chest-pain"]), " CHEST-PAIN ").unwrap();
        assert_eq!(scenario.title(), "Chest Pain Assessment");
    }
}
