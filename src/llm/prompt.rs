//! Prompt templates and structured-output recovery
//!
//! Builds the user prompts for every analysis level and turns the model's
//! JSON answer into a [`StructuredProfile`], filling and coercing fields
//! where the model deviated from the requested shape.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{LlmError, LlmResult};

/// System prompt for batch analysis (free text)
pub const BATCH_SYSTEM_PROMPT: &str = "You are a user behaviour analyst. Read the player reviews carefully, \
separate praise from criticism, extract the players' own tags and keywords, and write a structured \
plain-text analysis of this group of players.";

/// System prompt for entity aggregation (JSON)
pub const ENTITY_SYSTEM_PROMPT: &str = "You are a user behaviour analyst. Merge the batch analyses into one \
user profile and answer with a JSON object containing the fields summary, pros, cons and tags. \
Report only what the analyses support.";

/// System prompt for global aggregation (JSON)
pub const GLOBAL_SYSTEM_PROMPT: &str = "You are a user behaviour analyst. Compare the per-game user profiles \
and build one overall user profile as a JSON object containing the fields summary, pros, cons and tags. \
Report only what the profiles support.";

/// System prompt for single-review analysis (JSON)
pub const REVIEW_SYSTEM_PROMPT: &str = "You are a game review analyst. Answer with a JSON object containing \
the fields summary, pros, cons and tags.";

/// Prompt template for one batch of reviews
pub const BATCH_PROMPT_TEMPLATE: &str = r#"Below are several user reviews of one game. Extract the main preferences of the players in this batch.

Game: {entity}
Batch: {batch_index} ({review_count} reviews)

## What to extract
1. Summary: 3-5 full sentences covering the main opinions and the emotional arc of the players.
2. Strengths: every positive point the players raise (story, characters, presentation, music, emotional impact, ...), keeping their concrete examples.
3. Weaknesses: every complaint or suggestion, explicit or implied.
4. Tags: 0-8 short tags in the players' own words.

## User profile
- Overall sentiment (positive / negative / neutral) and how it shows
- Core elements the players care about
- Emotional or psychological traits
- Praise and criticism points

## Reviews
{reviews}

Be specific, keep praise and criticism apart, and only write "no usable content" when a review is truly empty."#;

/// Prompt template for entity aggregation
pub const ENTITY_PROMPT_TEMPLATE: &str = r#"Below are user profile summaries from several batches of reviews of the same game. Merge them into one profile for the game.

Game: {entity}
Total reviews: {total_reviews}

## Batch analyses
{analyses}

## Output
Return a JSON object with exactly these fields:
{
  "summary": "overall assessment of the game by its players",
  "pros": ["strength stated by players", "..."],
  "cons": ["complaint or suggestion stated by players", "..."],
  "tags": ["tag taken from the reviews", "..."]
}
List as many items as the analyses support and do not invent content."#;

/// Prompt template for global aggregation
pub const GLOBAL_PROMPT_TEMPLATE: &str = r#"Below are the user profiles of several different games. Analyse what their players have in common and where they differ, and build an overall user profile.

Games: {entity_count}
Total reviews: {total_reviews}

## Per-game profiles
{profiles}

## Output
Return a JSON object with exactly these fields:
{
  "summary": "overall user profile: preferences and behaviour",
  "pros": ["strength players of different games agree on", "..."],
  "cons": ["problem players of different games report", "..."],
  "tags": ["frequent user tag", "..."]
}
List as many items as the profiles support and do not invent content."#;

/// Prompt template for a single review
pub const REVIEW_PROMPT_TEMPLATE: &str = r#"Analyse this review of the game "{entity}".

Review:
{review}

Return a JSON object with the fields summary (one or two sentences), pros (list), cons (list) and tags (list, 0-8 short tags)."#;

/// Maximum review length passed to the single-review prompt, in characters
pub const MAX_REVIEW_CHARS: usize = 2000;

/// Keys every structured answer must carry
pub const REQUIRED_KEYS: [&str; 4] = ["summary", "pros", "cons", "tags"];

/// One successful batch analysis as input to entity aggregation
#[derive(Debug, Clone, Copy)]
pub struct BatchDigest<'a> {
    pub batch_index: usize,
    pub review_count: usize,
    pub analysis: &'a str,
}

/// One successful entity profile as input to global aggregation
#[derive(Debug, Clone, Copy)]
pub struct EntityDigest<'a> {
    pub entity: &'a str,
    pub total_reviews: usize,
    pub summary: &'a str,
    pub pros: &'a [String],
    pub cons: &'a [String],
    pub tags: &'a [String],
}

/// Build the prompt for one batch
///
/// Reviews are numbered from 1 in their original order.
pub fn batch_prompt(entity: &str, batch_index: usize, reviews: &[String]) -> String {
    let numbered = reviews
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}", i + 1, r))
        .collect::<Vec<_>>()
        .join("\n");

    BATCH_PROMPT_TEMPLATE
        .replace("{entity}", entity)
        .replace("{batch_index}", &batch_index.to_string())
        .replace("{review_count}", &reviews.len().to_string())
        .replace("{reviews}", &numbered)
}

/// Build the entity aggregation prompt from successful batch analyses
pub fn entity_prompt(entity: &str, batches: &[BatchDigest<'_>]) -> String {
    let total: usize = batches.iter().map(|b| b.review_count).sum();
    let analyses = batches
        .iter()
        .map(|b| {
            format!(
                "Batch {} ({} reviews):\n{}",
                b.batch_index, b.review_count, b.analysis
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    ENTITY_PROMPT_TEMPLATE
        .replace("{entity}", entity)
        .replace("{total_reviews}", &total.to_string())
        .replace("{analyses}", &analyses)
}

/// Build the global aggregation prompt from successful entity profiles
pub fn global_prompt(entities: &[EntityDigest<'_>]) -> String {
    let total: usize = entities.iter().map(|e| e.total_reviews).sum();
    let profiles = entities
        .iter()
        .map(|e| {
            format!(
                "Game: {} ({} reviews)\nSummary: {}\nPros: {}\nCons: {}\nTags: {}",
                e.entity,
                e.total_reviews,
                e.summary,
                e.pros.join(", "),
                e.cons.join(", "),
                e.tags.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    GLOBAL_PROMPT_TEMPLATE
        .replace("{entity_count}", &entities.len().to_string())
        .replace("{total_reviews}", &total.to_string())
        .replace("{profiles}", &profiles)
}

/// Build the prompt for a single review, truncating long text
pub fn review_prompt(entity: &str, review: &str) -> String {
    REVIEW_PROMPT_TEMPLATE
        .replace("{entity}", entity)
        .replace("{review}", truncate_chars(review, MAX_REVIEW_CHARS))
}

/// Truncate to at most `max` characters on a char boundary
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// A validated `{summary, pros, cons, tags}` answer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredProfile {
    pub summary: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub tags: Vec<String>,
    /// Keys that were missing (or null) and filled with empty values
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filled_keys: Vec<String>,
}

/// Parse a raw model answer into a [`StructuredProfile`]
///
/// The raw text is parsed as JSON. If that fails, a single fenced code block
/// is stripped and parsing is retried once. A parsed value that is not an
/// object is a validation failure.
pub fn parse_structured(raw: &str) -> LlmResult<StructuredProfile> {
    let value = match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => value,
        Err(first) => match strip_code_fence(raw) {
            Some(inner) => serde_json::from_str::<Value>(inner)?,
            None => return Err(first.into()),
        },
    };

    match value {
        Value::Object(map) => Ok(coerce_profile(map)),
        other => Err(LlmError::ValidationError(format!(
            "expected a JSON object, got {}",
            value_kind(&other)
        ))),
    }
}

/// Strip one fenced code block (```` ```json ```` or a bare fence)
///
/// Returns the trimmed block content, or `None` when there is no complete fence.
pub fn strip_code_fence(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    let start = trimmed.find("```")?;
    let after = &trimmed[start + 3..];

    // Skip language identifier if present
    let body_start = match after.find('\n') {
        Some(n) if after[..n].trim().chars().all(|c| c.is_ascii_alphanumeric()) => n + 1,
        _ => 0,
    };
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

fn coerce_profile(mut map: Map<String, Value>) -> StructuredProfile {
    let mut filled_keys = Vec::new();

    let summary = match map.remove("summary") {
        None | Some(Value::Null) => {
            filled_keys.push("summary".to_string());
            String::new()
        }
        Some(value) => scalar_to_string(value),
    };

    let mut list = |key: &str| match map.remove(key) {
        None | Some(Value::Null) => {
            filled_keys.push(key.to_string());
            Vec::new()
        }
        Some(value) => coerce_list(value),
    };

    let pros = list("pros");
    let cons = list("cons");
    let tags = list("tags");

    StructuredProfile {
        summary,
        pros,
        cons,
        tags,
        filled_keys,
    }
}

fn coerce_list(value: Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter(|v| !v.is_null())
            .map(scalar_to_string)
            .collect(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        other => vec![scalar_to_string(other)],
    }
}

fn scalar_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
