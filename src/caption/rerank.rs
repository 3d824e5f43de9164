// Reranker ("super mode"): narrow many candidates down to the best three.

use super::fallback::FallbackPicker;
use super::sanitize::{normalize_captions, parse_json_object};
use super::vibe::VibeAnalysis;
use crate::model::GenerativeModel;
use crate::prompts::{PROMPTS, Prompt};
use serde_json::Value;
use tracing::warn;

pub const TOP_N: usize = 3;
pub const RERANK_MAX_TOKENS: u32 = 200;

pub fn build_prompt(candidates: &[String], analysis: &VibeAnalysis) -> String {
    let listed = candidates
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}. {}", i + 1, c))
        .collect::<Vec<_>>()
        .join("\n");
    let tags = analysis.tags.join(", ");
    PROMPTS.render(
        Prompt::Rerank,
        &[
            ("mood", analysis.mood.as_str()),
            ("scene", analysis.scene.as_str()),
            ("tags", tags.as_str()),
            ("candidates", listed.as_str()),
        ],
    )
}

// Some(best three) only when at least three picks name one of `candidates`.
// Picks are matched case-insensitively and replaced by the candidate's own text.
pub fn parse_best(text: &str, candidates: &[String]) -> Option<Vec<String>> {
    let map = parse_json_object(text)?;
    let Some(Value::Array(items)) = map.get("best") else {
        return None;
    };
    let best: Vec<String> = normalize_captions(items, items.len())
        .iter()
        .filter_map(|pick| {
            let key = pick.to_lowercase();
            candidates.iter().find(|c| c.to_lowercase() == key).cloned()
        })
        .take(TOP_N)
        .collect();
    (best.len() == TOP_N).then_some(best)
}

/// First three raw candidates, padded from the fallback pool.
pub fn first_three(candidates: &[String], fallback: &FallbackPicker, user_id: i64) -> Vec<String> {
    let mut out: Vec<String> = candidates.iter().take(TOP_N).cloned().collect();
    fallback.pad(user_id, &mut out, TOP_N);
    out
}

/// Always returns exactly three non-empty captions.
pub async fn rerank(
    model: &dyn GenerativeModel,
    candidates: &[String],
    analysis: &VibeAnalysis,
    fallback: &FallbackPicker,
    user_id: i64,
) -> Vec<String> {
    if candidates.len() < TOP_N {
        return first_three(candidates, fallback, user_id);
    }

    let prompt = build_prompt(candidates, analysis);
    match model.complete(&prompt, None, RERANK_MAX_TOKENS).await {
        Ok(text) => match parse_best(&text, candidates) {
            Some(best) => best,
            None => {
                warn!("Rerank output unusable, keeping generation order");
                first_three(candidates, fallback, user_id)
            }
        },
        Err(e) => {
            warn!("Rerank call failed: {e}");
            first_three(candidates, fallback, user_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ModelError, testing::ScriptedModel};

    fn cands(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("caption {i}")).collect()
    }

    #[tokio::test]
    async fn accepts_three_valid_picks() {
        let model = ScriptedModel::ok(&[r#"{"best": ["caption 4", "caption 2", "caption 9"]}"#]);
        let out = rerank(&model, &cands(10), &VibeAnalysis::neutral(), &FallbackPicker::new(), 1).await;
        assert_eq!(out, vec!["caption 4", "caption 2", "caption 9"]);
    }

    #[tokio::test]
    async fn too_few_picks_fall_back_to_first_three() {
        let model = ScriptedModel::ok(&[r#"{"best": ["caption 4", "", 3]}"#]);
        let out = rerank(&model, &cands(10), &VibeAnalysis::neutral(), &FallbackPicker::new(), 1).await;
        assert_eq!(out, vec!["caption 1", "caption 2", "caption 3"]);
    }

    #[tokio::test]
    async fn picks_outside_the_candidates_are_rejected() {
        let model = ScriptedModel::ok(&[r#"{"best": ["invented one", "invented two", "invented three"]}"#]);
        let out = rerank(&model, &cands(10), &VibeAnalysis::neutral(), &FallbackPicker::new(), 1).await;
        assert_eq!(out, vec!["caption 1", "caption 2", "caption 3"]);
    }

    #[test]
    fn picks_take_the_candidate_spelling_and_skip_strangers() {
        let text = r#"{"best": ["CAPTION 7", "made up", "caption 3", "Caption 1"]}"#;
        assert_eq!(
            parse_best(text, &cands(10)),
            Some(vec!["caption 7".to_string(), "caption 3".to_string(), "caption 1".to_string()])
        );
        assert_eq!(parse_best(r#"{"best": ["caption 1", "made up", "caption 2"]}"#, &cands(10)), None);
    }

    #[tokio::test]
    async fn failed_call_falls_back_to_first_three() {
        let model = ScriptedModel::new(vec![Err(ModelError::Transport("down".into()))]);
        let out = rerank(&model, &cands(5), &VibeAnalysis::neutral(), &FallbackPicker::new(), 1).await;
        assert_eq!(out, vec!["caption 1", "caption 2", "caption 3"]);
    }

    #[tokio::test]
    async fn short_input_skips_model_and_pads() {
        let model = ScriptedModel::ok(&[]);
        let out = rerank(&model, &cands(1), &VibeAnalysis::neutral(), &FallbackPicker::new(), 1).await;
        assert_eq!(model.calls(), 0);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0], "caption 1");
        assert!(out.iter().all(|c| !c.is_empty()));
    }

    #[test]
    fn prompt_lists_candidates_numbered() {
        let p = build_prompt(&cands(2), &VibeAnalysis::neutral());
        assert!(p.contains("1. caption 1\n2. caption 2"));
    }
}
