//! Studymate Decode - resilient parsing of model-generated study payloads
//!
//! Language models asked for JSON often wrap it in markdown fences, add prose,
//! or leave trailing commas. This crate recovers quizzes and flashcard sets
//! from such output:
//!
//! - fence stripping, direct parse, then outer-brace extraction with repairs
//! - a field-scraping fallback for flashcards
//! - tagged question variants validated at the boundary
//! - flashcard sets normalized to an exact card count
//!
//! # Example
//!
//! ```
//! use studymate_decode::{decode, TargetKind};
//!
//! let raw = "```json\n{\"cards\": [{\"question\": \"2+2?\", \"answer\": \"4\",}]}\n```";
//! let set = decode(raw, TargetKind::Flashcards, 3).unwrap().into_flashcards().unwrap();
//! assert_eq!(set.cards.len(), 3);
//! assert_eq!(set.cards[0].category, "General");
//! ```

pub mod decoder;
pub mod error;
pub mod normalize;
pub mod payload;
pub mod stages;

pub use decoder::{decode, decode_flashcards, decode_quiz};
pub use error::{DecodeError, DecodeResult};
pub use payload::{Card, FlashcardSet, Question, Quiz, StructuredPayload, TargetKind};

/// Prelude for common imports
pub mod prelude {
    pub use crate::decoder::{decode, decode_flashcards, decode_quiz};
    pub use crate::error::{DecodeError, DecodeResult};
    pub use crate::payload::{Card, FlashcardSet, Question, Quiz, StructuredPayload, TargetKind};
}
