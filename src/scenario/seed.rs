use crate::scenario::document::{ChoiceDoc, NodeDoc, ScenarioDocument};
use crate::scenario::node::NodeKind;

/// Scenarios written to an empty data directory by `bedside seed`.
pub fn default_scenarios() -> Vec<(&'static str, ScenarioDocument)> {
    vec![
        ("chest-pain", chest_pain_scenario()),
        ("anaphylaxis", anaphylaxis_scenario()),
    ]
}

// ---------------------------------------------------------------------------
// Chest pain triage
// ---------------------------------------------------------------------------

pub fn chest_pain_scenario() -> ScenarioDocument {
    let good = NodeDoc::outcome("Good job! You correctly assessed the patient's vital signs first.");
    let bad = NodeDoc::outcome("Incorrect. Always check vital signs before ordering tests.");

    ScenarioDocument {
        title: "Chest Pain Assessment".into(),
        root: NodeDoc::new(
            NodeKind::Mcq,
            "A 45-year-old patient presents with chest pain. What is your first action?",
        )
        .choice(
            ChoiceDoc::new("A", "Check vital signs")
                .correct()
                .feedback("Correct! Vital signs are the priority.")
                .leads_to(good),
        )
        .choice(
            ChoiceDoc::new("B", "Order an EKG immediately")
                .feedback("Not the first step. Always assess the patient first.")
                .leads_to(bad),
        ),
    }
}

// ---------------------------------------------------------------------------
// Anaphylaxis: three decisions, every option converges on the next step
// ---------------------------------------------------------------------------

pub fn anaphylaxis_scenario() -> ScenarioDocument {
    let transport = NodeDoc::outcome(
        "EMS arrives and the patient is transported for monitoring. The key risk was a rapidly \
         progressing allergic emergency with airway and blood pressure involvement.",
    );

    let step3 = NodeDoc::new(
        NodeKind::Mcq,
        "Several minutes later, symptoms return. What would you do next?",
    )
    .keyed("recurrence")
    .narration("They look fatigued. The throat tightness seems to come and go.")
    .choice(
        ChoiceDoc::new("A", "Wait for EMS since medication was already given")
            .feedback("Waiting can allow airway edema and hypotension to worsen again.")
            .leads_to(transport.keyed("transport")),
    )
    .choice(
        ChoiceDoc::new("B", "Give a second IM epinephrine dose")
            .correct()
            .feedback(
                "Recurring symptoms can require repeat epinephrine before transfer of care. \
                 Repeating it can stabilize symptoms while awaiting definitive care.",
            )
            .leads_to_key("transport"),
    )
    .choice(
        ChoiceDoc::new("C", "Give oral fluids for low blood pressure")
            .feedback(
                "Oral fluids are unsafe with nausea and airway symptoms and do not treat the \
                 underlying reaction.",
            )
            .leads_to_key("transport"),
    )
    .choice(
        ChoiceDoc::new("D", "Give an antihistamine only")
            .feedback("Antihistamines do not address airway compromise or hypotension.")
            .leads_to_key("transport"),
    );

    let step2 = NodeDoc::new(
        NodeKind::Mcq,
        "The patient looks worse. What would you do next?",
    )
    .keyed("deterioration")
    .narration("You notice hives on their skin and their breathing is rapid.")
    .choice(
        ChoiceDoc::new("A", "Give oral antihistamine and monitor")
            .feedback(
                "Skin symptoms may improve, but airway swelling and low blood pressure are not \
                 treated.",
            )
            .leads_to(step3),
    )
    .choice(
        ChoiceDoc::new("B", "Activate EMS and give IM epinephrine")
            .correct()
            .feedback(
                "IM epinephrine is first line when you suspect anaphylaxis with airway symptoms \
                 or hypotension. Activating EMS early reduces risk if the patient deteriorates.",
            )
            .leads_to_key("recurrence"),
    )
    .choice(
        ChoiceDoc::new("C", "Give oxygen and reassess before medication")
            .feedback("Oxygen can help saturation but does not treat airway swelling or shock.")
            .leads_to_key("recurrence"),
    )
    .choice(
        ChoiceDoc::new("D", "Have them use an asthma inhaler")
            .feedback("It can help bronchospasm but does not treat systemic anaphylaxis.")
            .leads_to_key("recurrence"),
    );

    let root = NodeDoc::new(NodeKind::Mcq, "What would you do next?")
        .narration(
            "The patient walks in looking anxious. They say they feel itchy and their throat \
             feels tight. They seem short of breath.",
        )
        .choice(
            ChoiceDoc::new("A", "Ask what changed right before symptoms started")
                .feedback(
                    "You learn the likely trigger, but you have not yet assessed how unstable \
                     the patient is right now.",
                )
                .leads_to(step2),
        )
        .choice(
            ChoiceDoc::new("B", "Assess airway and breathing right now")
                .correct()
                .feedback(
                    "Airway and breathing threats can progress quickly. Your first job is to \
                     identify immediate instability before anything else.",
                )
                .leads_to_key("deterioration"),
        )
        .choice(
            ChoiceDoc::new("C", "Offer water and have them sit upright")
                .feedback(
                    "Oral intake is not appropriate when nausea and airway tightness are \
                     present, and it delays assessment.",
                )
                .leads_to_key("deterioration"),
        )
        .choice(
            ChoiceDoc::new("D", "Ask about past medical history first")
                .feedback(
                    "Background history matters, but delaying airway assessment can miss rapid \
                     deterioration.",
                )
                .leads_to_key("deterioration"),
        );

    ScenarioDocument {
        title: "Allergic Reaction in Clinic".into(),
        root,
    }
}
