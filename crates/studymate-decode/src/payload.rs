//! Decoded quiz and flashcard payloads

use serde::{Deserialize, Serialize};

/// Which payload shape the model was asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Quiz,
    Flashcards,
}

/// A quiz question, tagged by its `type` field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Question {
    #[serde(rename = "multiple-choice", rename_all = "camelCase")]
    MultipleChoice {
        question: String,
        options: [String; 4],
        correct_answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
    #[serde(rename = "true-false", rename_all = "camelCase")]
    TrueFalse {
        question: String,
        /// Always `"True"` or `"False"`
        correct_answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        explanation: Option<String>,
    },
}

impl Question {
    pub fn prompt(&self) -> &str {
        match self {
            Question::MultipleChoice { question, .. } | Question::TrueFalse { question, .. } => {
                question
            }
        }
    }

    pub fn correct_answer(&self) -> &str {
        match self {
            Question::MultipleChoice { correct_answer, .. }
            | Question::TrueFalse { correct_answer, .. } => correct_answer,
        }
    }
}

/// Titled list of validated questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quiz {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questions: Vec<Question>,
}

/// One flashcard; `category` is never empty after decoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub question: String,
    pub answer: String,
    pub category: String,
}

/// Flashcards normalized to the requested count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub cards: Vec<Card>,
}

/// Either decoded shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StructuredPayload {
    Quiz(Quiz),
    Flashcards(FlashcardSet),
}

impl StructuredPayload {
    /// Kind this payload was decoded as
    pub fn kind(&self) -> TargetKind {
        match self {
            StructuredPayload::Quiz(_) => TargetKind::Quiz,
            StructuredPayload::Flashcards(_) => TargetKind::Flashcards,
        }
    }

    /// The quiz, or `None` for a flashcard payload
    pub fn into_quiz(self) -> Option<Quiz> {
        match self {
            StructuredPayload::Quiz(quiz) => Some(quiz),
            StructuredPayload::Flashcards(_) => None,
        }
    }

    /// The flashcard set, or `None` for a quiz payload
    pub fn into_flashcards(self) -> Option<FlashcardSet> {
        match self {
            StructuredPayload::Flashcards(set) => Some(set),
            StructuredPayload::Quiz(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_wire_format_uses_type_tag_and_camel_case() {
        let question = Question::TrueFalse {
            question: "Water boils at 100C at sea level".to_string(),
            correct_answer: "True".to_string(),
            explanation: None,
        };

        assert_eq!(
            serde_json::to_value(&question).unwrap(),
            json!({
                "type": "true-false",
                "question": "Water boils at 100C at sea level",
                "correctAnswer": "True"
            })
        );
    }

    #[test]
    fn multiple_choice_requires_four_options() {
        let three = json!({
            "type": "multiple-choice",
            "question": "q",
            "options": ["a", "b", "c"],
            "correctAnswer": "a"
        });
        assert!(serde_json::from_value::<Question>(three).is_err());
    }
}
