//! Closed sets of writing tips and edit strategies
//!
//! Both enums are selected round-robin by slot index, so a batch of `n`
//! requests cycles through every variant before repeating one.

use serde::Serialize;

// ============================================================================
// Instruction-writing tips (initial proposals)
// ============================================================================

/// Advice attached to one initial-proposal request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstructionTip {
    Framing,
    Concise,
    Descriptive,
    Persona,
    EdgeCases,
    Assumptions,
}

impl InstructionTip {
    pub const ALL: [InstructionTip; 6] = [
        InstructionTip::Framing,
        InstructionTip::Concise,
        InstructionTip::Descriptive,
        InstructionTip::Persona,
        InstructionTip::EdgeCases,
        InstructionTip::Assumptions,
    ];

    /// Tip for slot `index`, cycling through [`Self::ALL`]
    pub fn nth(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            InstructionTip::Framing => "framing",
            InstructionTip::Concise => "concise",
            InstructionTip::Descriptive => "descriptive",
            InstructionTip::Persona => "persona",
            InstructionTip::EdgeCases => "edge-cases",
            InstructionTip::Assumptions => "assumptions",
        }
    }

    pub fn text(&self) -> &'static str {
        match self {
            InstructionTip::Framing => framing_tip(),
            InstructionTip::Concise => concise_tip(),
            InstructionTip::Descriptive => descriptive_tip(),
            InstructionTip::Persona => persona_tip(),
            InstructionTip::EdgeCases => edge_case_tip(),
            InstructionTip::Assumptions => assumptions_tip(),
        }
    }
}

fn framing_tip() -> &'static str {
    "Open by framing the task: say what the input is and what a good answer achieves."
}

fn concise_tip() -> &'static str {
    "Keep the instruction short. Every sentence must change how the task is solved."
}

fn descriptive_tip() -> &'static str {
    "Be descriptive: spell out the steps to follow and the criteria for choosing an answer."
}

fn persona_tip() -> &'static str {
    "Address the reader as a specific expert whose background fits this kind of input."
}

fn edge_case_tip() -> &'static str {
    "Name the tricky or ambiguous inputs this data contains and say how to handle each."
}

fn assumptions_tip() -> &'static str {
    "State the assumptions the solver should make when the input leaves something unsaid."
}

// ============================================================================
// Mutation strategies
// ============================================================================

/// Edit applied to a champion instruction to produce an offspring
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationStrategy {
    ExpandAndClarify,
    MinimalParaphrase,
    AddWorkedExamples,
    ShiftEmphasis,
}

impl MutationStrategy {
    pub const ALL: [MutationStrategy; 4] = [
        MutationStrategy::ExpandAndClarify,
        MutationStrategy::MinimalParaphrase,
        MutationStrategy::AddWorkedExamples,
        MutationStrategy::ShiftEmphasis,
    ];

    pub fn nth(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            MutationStrategy::ExpandAndClarify => "expand-and-clarify",
            MutationStrategy::MinimalParaphrase => "minimal-paraphrase",
            MutationStrategy::AddWorkedExamples => "add-worked-examples",
            MutationStrategy::ShiftEmphasis => "shift-emphasis",
        }
    }

    pub fn directive(&self) -> &'static str {
        match self {
            MutationStrategy::ExpandAndClarify => expand_and_clarify(),
            MutationStrategy::MinimalParaphrase => minimal_paraphrase(),
            MutationStrategy::AddWorkedExamples => add_worked_examples(),
            MutationStrategy::ShiftEmphasis => shift_emphasis(),
        }
    }
}

fn expand_and_clarify() -> &'static str {
    "Expand the instruction: clarify vague wording, add missing steps and make the \
     decision criteria explicit. Keep everything that already works."
}

fn minimal_paraphrase() -> &'static str {
    "Paraphrase the instruction with minimal changes. Keep its meaning and length; \
     only improve word choice and sentence order."
}

fn add_worked_examples() -> &'static str {
    "Add one or two short worked examples that show the reasoning the instruction expects."
}

fn shift_emphasis() -> &'static str {
    "Shift the emphasis: move the most important requirement to the front and cut \
     text that distracts from it."
}
