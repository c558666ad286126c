//! Shape validation and cardinality normalization

use serde_json::Value;
use tracing::{debug, warn};

use crate::payload::{Card, FlashcardSet, Question, Quiz};
use crate::stages::JsonObject;

pub const MAX_QUESTION_CHARS: usize = 500;
pub const MAX_ANSWER_CHARS: usize = 1000;
pub const MAX_CATEGORY_CHARS: usize = 100;
pub const DEFAULT_CATEGORY: &str = "General";
pub const FILLER_CATEGORY: &str = "Additional";
pub const DEFAULT_QUIZ_TITLE: &str = "Generated Quiz";

const FILLER_ANSWER: &str =
    "Review your study materials and notes on this topic to work out the answer.";

/// Build a quiz from a decoded object, dropping questions that cannot be
/// repaired into a valid variant. The question count is passed through.
pub fn quiz_from_object(object: &JsonObject) -> Quiz {
    let title = string_field(object, "title").unwrap_or_else(|| DEFAULT_QUIZ_TITLE.to_string());
    let description = string_field(object, "description");

    let raw_questions = object
        .get("questions")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let questions: Vec<Question> = raw_questions.iter().filter_map(question_from_value).collect();
    let dropped = raw_questions.len() - questions.len();
    if dropped > 0 {
        warn!(dropped, kept = questions.len(), "dropped malformed quiz questions");
    }

    Quiz {
        title,
        description,
        questions,
    }
}

/// Repair one question object into a tagged variant.
pub fn question_from_value(value: &Value) -> Option<Question> {
    let object = value.as_object()?;
    let question = string_field(object, "question")?;
    let explanation = string_field(object, "explanation");
    let options = object.get("options").and_then(Value::as_array);
    let answer = object.get("correctAnswer");

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map(normalize_type_tag);

    let is_multiple_choice = match kind.as_deref() {
        Some("multiple-choice" | "multiplechoice" | "mcq") => true,
        Some("true-false" | "truefalse" | "boolean") => false,
        Some(_) => return None,
        None => options.is_some(),
    };

    if is_multiple_choice {
        let options: Vec<String> = options?.iter().filter_map(scalar_to_string).collect();
        let options: [String; 4] = options.try_into().ok()?;
        let correct_answer = multiple_choice_answer(answer?, &options)?;
        Some(Question::MultipleChoice {
            question,
            options,
            correct_answer,
            explanation,
        })
    } else {
        Some(Question::TrueFalse {
            question,
            correct_answer: true_false_answer(answer?)?,
            explanation,
        })
    }
}

/// Build a flashcard set from a decoded object. Cards missing a question or
/// answer are skipped.
pub fn flashcards_from_object(object: &JsonObject) -> FlashcardSet {
    let cards = object
        .get("cards")
        .or_else(|| object.get("flashcards"))
        .and_then(Value::as_array)
        .map(|cards| {
            cards
                .iter()
                .filter_map(|card| {
                    let card = card.as_object()?;
                    Some(Card {
                        question: string_field(card, "question")?,
                        answer: string_field(card, "answer")?,
                        category: string_field(card, "category").unwrap_or_default(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    FlashcardSet {
        title: string_field(object, "title"),
        description: string_field(object, "description"),
        cards,
    }
}

/// Escape and truncate card fields, then pad or truncate to exactly
/// `target_count` cards.
pub fn normalize_flashcards(mut set: FlashcardSet, target_count: usize) -> FlashcardSet {
    for card in &mut set.cards {
        card.question = truncate_chars(&escape_quotes(&card.question), MAX_QUESTION_CHARS);
        card.answer = truncate_chars(&escape_quotes(&card.answer), MAX_ANSWER_CHARS);
        card.category = if card.category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            truncate_chars(&escape_quotes(&card.category), MAX_CATEGORY_CHARS)
        };
    }

    let decoded = set.cards.len();
    if decoded < target_count {
        for i in decoded..target_count {
            set.cards.push(filler_card(i));
        }
        debug!(decoded, target_count, "padded flashcards with filler cards");
    } else if decoded > target_count {
        set.cards.truncate(target_count);
        debug!(decoded, target_count, "truncated surplus flashcards");
    }

    set
}

fn filler_card(index: usize) -> Card {
    Card {
        question: format!("Additional question {} about the topic?", index + 1),
        answer: FILLER_ANSWER.to_string(),
        category: FILLER_CATEGORY.to_string(),
    }
}

fn multiple_choice_answer(answer: &Value, options: &[String; 4]) -> Option<String> {
    let answer = scalar_to_string(answer)?;
    if options.contains(&answer) {
        return Some(answer);
    }
    let trimmed = answer.trim();
    if let Some(option) = options.iter().find(|option| option.trim() == trimmed) {
        return Some(option.clone());
    }

    // Models often answer with the option letter instead of its text.
    let letter_index = match trimmed.to_ascii_uppercase().as_str() {
        "A" => Some(0),
        "B" => Some(1),
        "C" => Some(2),
        "D" => Some(3),
        _ => None,
    };
    Some(letter_index.map_or_else(|| trimmed.to_string(), |i| options[i].clone()))
}

fn true_false_answer(answer: &Value) -> Option<String> {
    let truth = match answer {
        Value::Bool(value) => *value,
        Value::String(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(if truth { "True" } else { "False" }.to_string())
}

fn normalize_type_tag(tag: &str) -> String {
    tag.trim().to_ascii_lowercase().replace(['_', ' '], "-")
}

fn string_field(object: &JsonObject, key: &str) -> Option<String> {
    object
        .get(key)
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn escape_quotes(text: &str) -> String {
    text.replace('"', "\\\"")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
