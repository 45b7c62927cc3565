//! Duel execution - turn scheduled pairs into answered (pair, example) units
//!
//! Every unit produces two requests, first duelist then second. All
//! requests of a round go out as one ordered batch and come back in the
//! same order, so responses are consumed two at a time per unit.

use promptduel_core::{
    dispatch_with_schema_fallback, extract_json, split_labels, Dataset, EngineConfig,
    EngineError, Generator, Label, ParseError, PerformanceRecord, Pool, ResponseSchema,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

/// One scheduled pair evaluated on one example
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DuelUnit {
    pub pair: (usize, usize),
    pub example: usize,
}

/// Expand each pair into `per_duel` random examples (all of them if fewer exist)
pub fn plan_duel_units<R: Rng>(
    pairs: &[(usize, usize)],
    n_examples: usize,
    per_duel: usize,
    rng: &mut R,
) -> Vec<DuelUnit> {
    let take = per_duel.min(n_examples);
    let mut units = Vec::with_capacity(pairs.len() * take);
    for &pair in pairs {
        let mut examples = rand::seq::index::sample(rng, n_examples, take).into_vec();
        examples.sort_unstable();
        units.extend(examples.into_iter().map(|example| DuelUnit { pair, example }));
    }
    units
}

/// A candidate's answer: a short justification plus one choice
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub reasoning: String,
    pub answer: String,
}

impl StructuredAnswer {
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let value = extract_json(text)?;
        let Value::Object(map) = value else {
            return Err(ParseError::UnexpectedShape(
                "expected answer object".to_string(),
            ));
        };
        let field = |name: &'static str| match map.get(name) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Null) | None => Err(ParseError::MissingField(name)),
            Some(other) => Ok(other.to_string()),
        };
        Ok(Self {
            reasoning: field("reasoning")?,
            answer: field("answer")?,
        })
    }

    /// Fallback for responses that are not structured: the whole text is
    /// kept as reasoning and no choice is recorded
    pub fn unparsed(text: &str) -> Self {
        Self {
            reasoning: text.trim().to_string(),
            answer: String::new(),
        }
    }
}

/// Both answers of one unit, in pair order
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DuelOutcome {
    pub unit: DuelUnit,
    pub first: StructuredAnswer,
    pub second: StructuredAnswer,
    /// Supervised scores for (first, second), only when the example is labeled
    pub performance: Option<(PerformanceRecord, PerformanceRecord)>,
}

pub fn build_answer_prompt(instruction: &str, example: &str, choices: &[String]) -> String {
    format!(
        "## Instruction\n{instruction}\n\n\
         ## Input\n{example}\n\n\
         ## Allowed answers\n{}\n\n\
         Follow the instruction for the input above. Respond with a JSON object \
         {{\"reasoning\": \"<short justification>\", \"answer\": \"<one of the allowed answers>\"}}.",
        choices.join(", ")
    )
}

pub fn answer_schema() -> ResponseSchema {
    ResponseSchema::new(
        "structured_answer",
        json!({
            "type": "object",
            "properties": {
                "reasoning": { "type": "string" },
                "answer": { "type": "string" }
            },
            "required": ["reasoning", "answer"],
            "additionalProperties": false
        }),
    )
}

/// Answer every unit with both of its candidates (Level 1)
pub async fn execute_duels(
    generator: &dyn Generator,
    pool: &Pool,
    dataset: &Dataset,
    units: &[DuelUnit],
    config: &EngineConfig,
) -> Result<Vec<DuelOutcome>, EngineError> {
    let mut prompts = Vec::with_capacity(units.len() * 2);
    for unit in units {
        let example = dataset.example(unit.example).ok_or_else(|| {
            EngineError::Invariant(format!("example {} out of range", unit.example))
        })?;
        let choices = dataset.choices_for(unit.example, &config.default_choices);
        for candidate in [unit.pair.0, unit.pair.1] {
            prompts.push(build_answer_prompt(
                pool.instruction(candidate)?,
                example,
                choices,
            ));
        }
    }

    debug!("Dispatching {} answer requests for {} units", prompts.len(), units.len());
    let responses = dispatch_with_schema_fallback(
        generator,
        &prompts,
        config.max_concurrency,
        &config.answer,
        &answer_schema(),
    )
    .await?;

    let outcomes = units
        .iter()
        .zip(responses.chunks_exact(2))
        .map(|(unit, pair)| {
            let first = parse_answer(&pair[0], unit.pair.0);
            let second = parse_answer(&pair[1], unit.pair.1);
            let performance = dataset.label(unit.example).map(|label| {
                (
                    score_or_zero(&first, label, unit.example),
                    score_or_zero(&second, label, unit.example),
                )
            });
            DuelOutcome {
                unit: *unit,
                first,
                second,
                performance,
            }
        })
        .collect();

    Ok(outcomes)
}

/// Store the supervised scores carried by `outcomes`
pub fn record_performance(pool: &mut Pool, outcomes: &[DuelOutcome]) -> Result<(), EngineError> {
    for outcome in outcomes {
        if let Some((first, second)) = outcome.performance {
            pool.record_performance(outcome.unit.pair.0, first)?;
            pool.record_performance(outcome.unit.pair.1, second)?;
        }
    }
    Ok(())
}

fn parse_answer(text: &str, candidate: usize) -> StructuredAnswer {
    StructuredAnswer::parse(text).unwrap_or_else(|e| {
        warn!("Unstructured answer from candidate {}: {}", candidate, e);
        StructuredAnswer::unparsed(text)
    })
}

// ============================================================================
// Supervised scoring
// ============================================================================

/// Precision, recall and F1 of the answer's label set against the expected set
pub fn score_answer(
    answer: &StructuredAnswer,
    label: &Label,
    example_index: usize,
) -> Result<PerformanceRecord, ParseError> {
    let expected = label.expected_labels()?;
    let predicted = split_labels(&answer.answer);

    let hits = predicted.intersection(&expected).count() as f64;
    let ratio = |den: usize| if den == 0 { 0.0 } else { hits / den as f64 };
    let precision = ratio(predicted.len());
    let recall = ratio(expected.len());
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    Ok(PerformanceRecord {
        precision,
        recall,
        f1,
        example_index,
    })
}

fn score_or_zero(answer: &StructuredAnswer, label: &Label, example_index: usize) -> PerformanceRecord {
    score_answer(answer, label, example_index).unwrap_or_else(|e| {
        warn!("Cannot score example {}: {}", example_index, e);
        PerformanceRecord::zero(example_index)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use promptduel_core::{Candidate, GenerationError, GenerationParams};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::time::Duration;

    fn section<'a>(prompt: &'a str, start: &str, end: &str) -> &'a str {
        let from = prompt.find(start).map(|i| i + start.len()).unwrap_or(0);
        let to = prompt[from..].find(end).map(|i| from + i).unwrap_or(prompt.len());
        &prompt[from..to]
    }

    /// Echoes the instruction as reasoning and the input as answer,
    /// finishing later for shorter prompts to scramble completion order
    struct EchoGenerator;

    #[async_trait]
    impl Generator for EchoGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, GenerationError> {
            let delay = 300u64.saturating_sub(prompt.len() as u64);
            tokio::time::sleep(Duration::from_millis(delay % 20)).await;
            let instruction = section(prompt, "## Instruction\n", "\n\n## Input");
            let input = section(prompt, "## Input\n", "\n\n## Allowed");
            Ok(json!({ "reasoning": instruction, "answer": input }).to_string())
        }
    }

    struct ProseGenerator;

    #[async_trait]
    impl Generator for ProseGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, GenerationError> {
            Ok("  I think it is B.  ".to_string())
        }
    }

    fn pool() -> Pool {
        Pool::new(
            ["alpha", "bravo-bravo", "charlie", "d"]
                .into_iter()
                .map(Candidate::initial)
                .collect(),
        )
    }

    #[test]
    fn test_plan_duel_units_caps_examples() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let units = plan_duel_units(&[(0, 1), (2, 3)], 2, 5, &mut rng);
        assert_eq!(units.len(), 4);
        assert_eq!(units[0], DuelUnit { pair: (0, 1), example: 0 });
        assert_eq!(units[1], DuelUnit { pair: (0, 1), example: 1 });
        assert!(units[2..].iter().all(|u| u.pair == (2, 3)));
    }

    #[test]
    fn test_plan_duel_units_distinct_examples() {
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let units = plan_duel_units(&[(1, 0)], 10, 3, &mut rng);
        assert_eq!(units.len(), 3);
        assert!(units.windows(2).all(|w| w[0].example < w[1].example));
    }

    #[test]
    fn test_structured_answer_parse() {
        let parsed =
            StructuredAnswer::parse("Sure:\n```json\n{\"reasoning\": \"r\", \"answer\": \"C\"}\n```")
                .unwrap();
        assert_eq!(parsed.answer, "C");
        assert_eq!(
            StructuredAnswer::parse("{\"reasoning\": \"r\"}"),
            Err(ParseError::MissingField("answer"))
        );
    }

    #[test]
    fn test_answer_prompt_lists_choices() {
        let choices = vec!["yes".to_string(), "no".to_string()];
        let prompt = build_answer_prompt("Be brief.", "Is water wet?", &choices);
        assert!(prompt.starts_with("## Instruction\nBe brief.\n\n## Input\nIs water wet?"));
        assert!(prompt.contains("## Allowed answers\nyes, no"));
    }

    #[tokio::test]
    async fn test_responses_map_back_to_units() {
        let pool = pool();
        let dataset = Dataset::new((0..6).map(|i| format!("example-{i}")).collect()).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let units = plan_duel_units(&[(0, 1), (3, 2), (1, 3)], dataset.len(), 2, &mut rng);
        let config = EngineConfig {
            max_concurrency: 3,
            ..EngineConfig::default()
        };

        let outcomes = execute_duels(&EchoGenerator, &pool, &dataset, &units, &config)
            .await
            .unwrap();

        assert_eq!(outcomes.len(), units.len());
        for (outcome, unit) in outcomes.iter().zip(&units) {
            assert_eq!(outcome.unit, *unit);
            assert_eq!(outcome.first.reasoning, pool.instruction(unit.pair.0).unwrap());
            assert_eq!(outcome.second.reasoning, pool.instruction(unit.pair.1).unwrap());
            assert_eq!(outcome.first.answer, format!("example-{}", unit.example));
            assert!(outcome.performance.is_none());
        }
    }

    #[tokio::test]
    async fn test_prose_answers_fall_back_and_score_zero() {
        let mut pool = pool();
        let dataset =
            Dataset::with_labels(vec!["q".to_string()], vec![Label::Text("B".to_string())])
                .unwrap();
        let units = vec![DuelUnit { pair: (0, 1), example: 0 }];

        let outcomes = execute_duels(&ProseGenerator, &pool, &dataset, &units, &EngineConfig::default())
            .await
            .unwrap();

        assert_eq!(outcomes[0].first, StructuredAnswer::unparsed("I think it is B."));
        let (first, _) = outcomes[0].performance.unwrap();
        assert_eq!(first.f1, 0.0);

        record_performance(&mut pool, &outcomes).unwrap();
        assert_eq!(pool.performance(0).len(), 1);
        assert_eq!(pool.performance(1).len(), 1);
        assert!(pool.performance(2).is_empty());
    }

    #[test]
    fn test_score_answer_partial_overlap() {
        let answer = StructuredAnswer {
            reasoning: String::new(),
            answer: "A, b".to_string(),
        };
        let label = Label::Text("b; C".to_string());
        let record = score_answer(&answer, &label, 4).unwrap();
        assert_eq!(record.precision, 0.5);
        assert_eq!(record.recall, 0.5);
        assert_eq!(record.f1, 0.5);
        assert_eq!(record.example_index, 4);
    }

    #[test]
    fn test_score_answer_missing_expected() {
        let label: Label = serde_json::from_str(r#"{"choices": ["x", "y"]}"#).unwrap();
        let answer = StructuredAnswer::unparsed("x");
        assert_eq!(
            score_answer(&answer, &label, 0),
            Err(ParseError::MissingField("answer"))
        );
        assert_eq!(score_or_zero(&answer, &label, 0), PerformanceRecord::zero(0));
    }
}
