//! Pairwise judging with randomized presentation order
//!
//! Each unit's two answers are shown as Response X and Response Y, swapped
//! with probability 1/2 so a judge's preference for the first slot cancels
//! out. The verdict is mapped back through the swap flag before it touches
//! the win matrix. The judge never sees which candidate wrote which side.

use promptduel_core::{
    dispatch_with_schema_fallback, extract_json, Dataset, EngineConfig, EngineError, Generator,
    ParseError, Pool, ResponseSchema,
};
use rand::Rng;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::duel::{DuelOutcome, DuelUnit, StructuredAnswer};

/// Which presented side the judge preferred
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Verdict {
    X,
    Y,
}

/// Read a verdict from `{"winner": "X"}` or a bare `X` / `Y`
pub fn parse_verdict(text: &str) -> Result<Verdict, ParseError> {
    let raw = match extract_json(text) {
        Ok(Value::Object(map)) => match map.get("winner") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => return Err(ParseError::MissingField("winner")),
        },
        Ok(_) => {
            return Err(ParseError::UnexpectedShape(
                "expected verdict object".to_string(),
            ))
        }
        Err(ParseError::NoJson) => text.to_string(),
        Err(e) => return Err(e),
    };

    let token = raw
        .trim()
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_ascii_uppercase();
    let token = token.strip_prefix("RESPONSE ").unwrap_or(&token);
    match token {
        "X" => Ok(Verdict::X),
        "Y" => Ok(Verdict::Y),
        _ => Err(ParseError::UnknownVerdict(raw.trim().chars().take(40).collect())),
    }
}

pub fn build_judge_prompt(example: &str, x: &StructuredAnswer, y: &StructuredAnswer) -> String {
    format!(
        "You are an impartial judge. Two responses answer the same task. \
         Pick the better one based on correctness first, then on the quality \
         of its reasoning. Ignore the order in which they appear.\n\n\
         ## Task\n{example}\n\n\
         ### Response X\nReasoning: {}\nAnswer: {}\n\n\
         ### Response Y\nReasoning: {}\nAnswer: {}\n\n\
         Reply with a JSON object {{\"winner\": \"X\"}} or {{\"winner\": \"Y\"}}.",
        x.reasoning, x.answer, y.reasoning, y.answer
    )
}

pub fn verdict_schema() -> ResponseSchema {
    ResponseSchema::new(
        "pairwise_verdict",
        json!({
            "type": "object",
            "properties": {
                "winner": { "type": "string", "enum": ["X", "Y"] }
            },
            "required": ["winner"],
            "additionalProperties": false
        }),
    )
}

/// A judged unit, already mapped back to candidate indices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct JudgedDuel {
    pub unit: DuelUnit,
    /// Second duelist was presented as X
    pub swapped: bool,
    pub winner: usize,
    pub loser: usize,
    /// Verdict was unreadable and the unswapped-left side was declared winner
    pub fallback: bool,
}

/// Judge every outcome with a fresh random swap per unit (Level 1)
pub async fn judge_duels<R: Rng>(
    generator: &dyn Generator,
    dataset: &Dataset,
    outcomes: &[DuelOutcome],
    config: &EngineConfig,
    rng: &mut R,
) -> Result<Vec<JudgedDuel>, EngineError> {
    let swaps: Vec<bool> = outcomes.iter().map(|_| rng.gen_bool(0.5)).collect();
    judge_duels_with_swaps(generator, dataset, outcomes, &swaps, config).await
}

/// Judge with caller-chosen swap flags, one per outcome
pub async fn judge_duels_with_swaps(
    generator: &dyn Generator,
    dataset: &Dataset,
    outcomes: &[DuelOutcome],
    swaps: &[bool],
    config: &EngineConfig,
) -> Result<Vec<JudgedDuel>, EngineError> {
    if swaps.len() != outcomes.len() {
        return Err(EngineError::Invariant(format!(
            "{} swap flags for {} duels",
            swaps.len(),
            outcomes.len()
        )));
    }

    let mut prompts = Vec::with_capacity(outcomes.len());
    for (outcome, &swapped) in outcomes.iter().zip(swaps) {
        let example = dataset.example(outcome.unit.example).ok_or_else(|| {
            EngineError::Invariant(format!("example {} out of range", outcome.unit.example))
        })?;
        let (x, y) = if swapped {
            (&outcome.second, &outcome.first)
        } else {
            (&outcome.first, &outcome.second)
        };
        prompts.push(build_judge_prompt(example, x, y));
    }

    let responses = dispatch_with_schema_fallback(
        generator,
        &prompts,
        config.max_concurrency,
        &config.judge,
        &verdict_schema(),
    )
    .await?;

    let judged = outcomes
        .iter()
        .zip(swaps)
        .zip(&responses)
        .map(|((outcome, &swapped), response)| resolve(outcome.unit, swapped, response))
        .collect();

    Ok(judged)
}

fn resolve(unit: DuelUnit, swapped: bool, response: &str) -> JudgedDuel {
    let (a, b) = unit.pair;
    match parse_verdict(response) {
        Ok(verdict) => {
            let first_wins = (verdict == Verdict::X) != swapped;
            let (winner, loser) = if first_wins { (a, b) } else { (b, a) };
            JudgedDuel {
                unit,
                swapped,
                winner,
                loser,
                fallback: false,
            }
        }
        Err(e) => {
            warn!(
                "Unreadable verdict for {} vs {} on example {} ({}), left side wins",
                a, b, unit.example, e
            );
            JudgedDuel {
                unit,
                swapped,
                winner: a,
                loser: b,
                fallback: true,
            }
        }
    }
}

/// Record every judged duel in the pool's win matrix
pub fn apply_verdicts(pool: &mut Pool, judged: &[JudgedDuel]) -> Result<(), EngineError> {
    for duel in judged {
        pool.record_win(duel.winner, duel.loser)?;
    }
    debug!("Applied {} verdicts", judged.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use promptduel_core::{Candidate, GenerationError, GenerationParams};

    fn reasoning_of<'a>(prompt: &'a str, header: &str) -> &'a str {
        let start = prompt.find(header).map(|i| i + header.len()).unwrap_or(0);
        let rest = &prompt[start..];
        let end = rest.find("\nAnswer:").unwrap_or(rest.len());
        &rest[..end]
    }

    /// Prefers whichever side wrote more reasoning
    struct DetailJudge;

    #[async_trait]
    impl Generator for DetailJudge {
        async fn generate(
            &self,
            prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, GenerationError> {
            let x = reasoning_of(prompt, "### Response X\nReasoning: ");
            let y = reasoning_of(prompt, "### Response Y\nReasoning: ");
            let winner = if x.len() >= y.len() { "X" } else { "Y" };
            Ok(json!({ "winner": winner }).to_string())
        }
    }

    struct MumblingJudge;

    #[async_trait]
    impl Generator for MumblingJudge {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, GenerationError> {
            Ok("both are fine".to_string())
        }
    }

    fn outcome(pair: (usize, usize), first: &str, second: &str) -> DuelOutcome {
        let answer = |reasoning: &str| StructuredAnswer {
            reasoning: reasoning.to_string(),
            answer: "A".to_string(),
        };
        DuelOutcome {
            unit: DuelUnit { pair, example: 0 },
            first: answer(first),
            second: answer(second),
            performance: None,
        }
    }

    fn pool() -> Pool {
        Pool::new(vec![Candidate::initial("p"), Candidate::initial("q")])
    }

    fn dataset() -> Dataset {
        Dataset::new(vec!["2 + 2?".to_string()]).unwrap()
    }

    #[test]
    fn test_parse_verdict_forms() {
        assert_eq!(parse_verdict(r#"{"winner": "Y"}"#), Ok(Verdict::Y));
        assert_eq!(parse_verdict("x"), Ok(Verdict::X));
        assert_eq!(parse_verdict("Response Y."), Ok(Verdict::Y));
        assert_eq!(
            parse_verdict(r#"{"reason": "close"}"#),
            Err(ParseError::MissingField("winner"))
        );
        assert!(matches!(
            parse_verdict("neither"),
            Err(ParseError::UnknownVerdict(_))
        ));
    }

    #[test]
    fn test_resolve_maps_through_swap() {
        let unit = DuelUnit { pair: (3, 5), example: 0 };
        let plain = resolve(unit, false, r#"{"winner": "Y"}"#);
        assert_eq!((plain.winner, plain.loser), (5, 3));
        let swapped = resolve(unit, true, r#"{"winner": "Y"}"#);
        assert_eq!((swapped.winner, swapped.loser), (3, 5));
    }

    #[test]
    fn test_judge_prompt_hides_candidates() {
        let o = outcome((0, 1), "short", "much longer reasoning");
        let prompt = build_judge_prompt("task", &o.first, &o.second);
        assert!(prompt.contains("### Response X\nReasoning: short\nAnswer: A"));
        assert!(prompt.contains("### Response Y\nReasoning: much longer reasoning"));
        assert!(!prompt.contains("candidate"));
    }

    #[tokio::test]
    async fn test_swap_symmetry() {
        let outcomes = vec![outcome((0, 1), "brief", "a much more detailed answer")];
        let config = EngineConfig::default();

        let mut results = Vec::new();
        for swapped in [false, true] {
            let judged = judge_duels_with_swaps(&DetailJudge, &dataset(), &outcomes, &[swapped], &config)
                .await
                .unwrap();
            let mut pool = pool();
            apply_verdicts(&mut pool, &judged).unwrap();
            assert_eq!(judged[0].swapped, swapped);
            results.push(pool.matrix().clone());
        }

        assert_eq!(results[0], results[1]);
        assert_eq!(results[0].wins(1, 0), 1);
        assert_eq!(results[0].wins(0, 1), 0);
    }

    #[tokio::test]
    async fn test_unreadable_verdict_declares_unswapped_left() {
        let outcomes = vec![outcome((1, 0), "x", "y")];
        let judged = judge_duels_with_swaps(
            &MumblingJudge,
            &dataset(),
            &outcomes,
            &[true],
            &EngineConfig::default(),
        )
        .await
        .unwrap();

        assert!(judged[0].fallback);
        assert_eq!((judged[0].winner, judged[0].loser), (1, 0));
    }

    #[tokio::test]
    async fn test_swap_count_must_match() {
        let outcomes = vec![outcome((0, 1), "a", "b")];
        let result =
            judge_duels_with_swaps(&DetailJudge, &dataset(), &outcomes, &[], &EngineConfig::default())
                .await;
        assert!(matches!(result, Err(EngineError::Invariant(_))));
    }
}
