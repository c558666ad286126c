//! Decoding pipeline

use tracing::{debug, warn};

use crate::error::DecodeResult;
use crate::normalize::{
    flashcards_from_object, normalize_flashcards, quiz_from_object, DEFAULT_CATEGORY,
};
use crate::payload::{Card, FlashcardSet, Quiz, StructuredPayload, TargetKind};
use crate::stages::{extract_and_repair, parse_direct, scrape_cards, strip_fences, JsonObject};

const FALLBACK_TITLE: &str = "Study Session Flashcards";
const FALLBACK_DESCRIPTION: &str = "Flashcards to help you review your study session";
const FALLBACK_QUESTION: &str = "What are the key concepts from this study session?";
const FALLBACK_ANSWER: &str =
    "Review your study session notes and summarize the main ideas in your own words.";

/// Decode raw model output into the requested payload kind.
///
/// Only the quiz kind can fail. Flashcards always come back with exactly
/// `target_count` cards (at least one).
pub fn decode(raw: &str, kind: TargetKind, target_count: usize) -> DecodeResult<StructuredPayload> {
    match kind {
        TargetKind::Quiz => decode_quiz(raw).map(StructuredPayload::Quiz),
        TargetKind::Flashcards => Ok(StructuredPayload::Flashcards(decode_flashcards(
            raw,
            target_count,
        ))),
    }
}

/// Decode a quiz. Fails with `DecodeError::InvalidJson` when no object can be
/// recovered; there is no scraping fallback for quizzes.
pub fn decode_quiz(raw: &str) -> DecodeResult<Quiz> {
    let object = recover_object(raw).inspect_err(|err| {
        warn!(error = %err, raw_len = raw.len(), "quiz output has no recoverable JSON object");
    })?;
    Ok(quiz_from_object(&object))
}

/// Decode a flashcard set and normalize it to exactly `target_count` cards.
pub fn decode_flashcards(raw: &str, target_count: usize) -> FlashcardSet {
    let target_count = if target_count == 0 {
        debug!("flashcard target count of zero raised to one");
        1
    } else {
        target_count
    };

    let set = match recover_object(raw) {
        Ok(object) => flashcards_from_object(&object),
        Err(err) => {
            debug!(error = %err, "falling back to scraping flashcard fields");
            scrape_fallback(raw)
        }
    };

    normalize_flashcards(set, target_count)
}

/// Fence stripping, direct parse, then bracket extraction with repairs.
fn recover_object(raw: &str) -> DecodeResult<JsonObject> {
    let stripped = strip_fences(raw);
    parse_direct(&stripped).or_else(|direct_err| {
        debug!(error = %direct_err, "direct parse failed, extracting outer braces");
        extract_and_repair(&stripped)
    })
}

fn scrape_fallback(raw: &str) -> FlashcardSet {
    let mut cards = scrape_cards(raw, DEFAULT_CATEGORY);
    if cards.is_empty() {
        warn!("no flashcard fields found in model output, using placeholder card");
        cards.push(Card {
            question: FALLBACK_QUESTION.to_string(),
            answer: FALLBACK_ANSWER.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
        });
    } else {
        debug!(scraped = cards.len(), "scraped flashcards from malformed output");
    }

    FlashcardSet {
        title: Some(FALLBACK_TITLE.to_string()),
        description: Some(FALLBACK_DESCRIPTION.to_string()),
        cards,
    }
}
