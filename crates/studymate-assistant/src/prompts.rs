//! Prompt builders for quiz and flashcard generation

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AssistantError;

pub const DEFAULT_TUTOR_PROMPT: &str = "You are Studymate, a patient study tutor. \
Explain concepts step by step, check the student's understanding with short questions, \
and keep answers focused on what the student is learning.";

pub const GENERATOR_PROMPT: &str = "You create study material. \
Respond with a single valid JSON object and nothing else: no markdown, no commentary.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    fn guidance(self) -> &'static str {
        match self {
            Difficulty::Easy => "Focus on definitions and basic recall.",
            Difficulty::Medium => "Mix recall with questions that apply the concepts.",
            Difficulty::Hard => {
                "Prefer analysis and multi-step reasoning over recall; distractors should be plausible."
            }
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = AssistantError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" | "normal" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            _ => Err(AssistantError::InvalidRequest(format!(
                "unknown difficulty '{value}', expected easy, medium or hard"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizRequest {
    pub topic: String,
    /// Study material to base the questions on
    pub material: Option<String>,
    pub question_count: usize,
    pub difficulty: Difficulty,
}

impl QuizRequest {
    pub fn new(topic: impl Into<String>, question_count: usize) -> Self {
        Self {
            topic: topic.into(),
            material: None,
            question_count,
            difficulty: Difficulty::default(),
        }
    }

    pub fn with_material(mut self, material: impl Into<String>) -> Self {
        self.material = Some(material.into());
        self
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardRequest {
    /// Notes, a chapter, or a session transcript to turn into cards
    pub material: String,
    pub card_count: usize,
    pub difficulty: Difficulty,
}

impl FlashcardRequest {
    pub fn new(material: impl Into<String>, card_count: usize) -> Self {
        Self {
            material: material.into(),
            card_count,
            difficulty: Difficulty::default(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }
}

pub fn quiz_prompt(req: &QuizRequest) -> String {
    let mut prompt = format!(
        "Create a {difficulty} quiz about \"{topic}\" with exactly {count} questions.\n{guidance}\n",
        difficulty = req.difficulty,
        topic = req.topic.trim(),
        count = req.question_count,
        guidance = req.difficulty.guidance(),
    );

    if let Some(material) = req.material.as_deref().filter(|m| !m.trim().is_empty()) {
        prompt.push_str("Base every question on this material:\n---\n");
        prompt.push_str(material.trim());
        prompt.push_str("\n---\n");
    }

    prompt.push_str(
        r#"Use "multiple-choice" questions with exactly 4 options and "true-false" questions.
For true-false questions omit "options" and use "True" or "False" as the correct answer.
Return JSON in exactly this shape:
{
  "title": "Quiz title",
  "description": "One sentence about the quiz",
  "questions": [
    {
      "question": "Question text",
      "type": "multiple-choice",
      "options": ["A", "B", "C", "D"],
      "correctAnswer": "The correct option text",
      "explanation": "Why the answer is correct"
    }
  ]
}"#,
    );
    prompt
}

pub fn flashcard_prompt(req: &FlashcardRequest) -> String {
    format!(
        r#"Create exactly {count} {difficulty} flashcards from the material below.
Keep each question under 500 characters and each answer under 1000 characters.
Group cards with a short category name.
---
{material}
---
Return JSON in exactly this shape:
{{
  "title": "Set title",
  "description": "One sentence about the set",
  "cards": [
    {{"question": "Front of the card", "answer": "Back of the card", "category": "Category"}}
  ]
}}"#,
        count = req.card_count,
        difficulty = req.difficulty,
        material = req.material.trim(),
    )
}
