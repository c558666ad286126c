//! Study assistant: chat, quiz and flashcard generation over a model backend

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use studymate_context::{ConversationTurn, ConversationWindow, SessionManager};
use studymate_decode::{decode_flashcards, decode_quiz, FlashcardSet, Question, Quiz};
use studymate_runtime::{BackendError, ChatRequest, ChatResponse, ModelBackend};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AssistantConfig;
use crate::error::{AssistantError, AssistantResult};
use crate::prompts::{flashcard_prompt, quiz_prompt, FlashcardRequest, QuizRequest, GENERATOR_PROMPT};

const PLACEHOLDER_QUESTION_LIMIT: usize = 10;

/// Assistant reply to a chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub content: String,
    pub tokens_used: u32,
}

pub struct StudyAssistant {
    backend: Option<Arc<dyn ModelBackend>>,
    sessions: SessionManager,
    config: AssistantConfig,
}

impl StudyAssistant {
    pub fn new(backend: Option<Arc<dyn ModelBackend>>, config: AssistantConfig) -> Self {
        Self {
            backend,
            sessions: SessionManager::new(),
            config,
        }
    }

    /// Share a session store with other components
    pub fn with_sessions(mut self, sessions: SessionManager) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn config(&self) -> &AssistantConfig {
        &self.config
    }

    pub fn backend_name(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|backend| backend.name())
    }

    /// Answer `message` given the prior turns of the conversation.
    pub async fn chat(
        &self,
        prior_turns: &[ConversationTurn],
        message: &str,
    ) -> AssistantResult<ChatReply> {
        self.chat_with_prompt(&self.config.system_prompt, prior_turns, message)
            .await
    }

    /// Answer `message` inside a stored session and record both turns.
    pub async fn chat_in_session(&self, session_id: Uuid, message: &str) -> AssistantResult<ChatReply> {
        if message.trim().is_empty() {
            return Err(AssistantError::InvalidRequest("message is empty".to_string()));
        }

        let session = self.sessions.get_session(session_id).await?;
        let system_prompt = match session.subject.as_deref() {
            Some(subject) => format!(
                "{}\nThe student is currently studying: {subject}.",
                self.config.system_prompt
            ),
            None => self.config.system_prompt.clone(),
        };

        let reply = self
            .chat_with_prompt(&system_prompt, &session.turns, message)
            .await?;
        if reply.content.trim().is_empty() {
            warn!(%session_id, "empty reply from model backend, session left unchanged");
            return Err(AssistantError::EmptyReply);
        }

        self.sessions
            .append_turns(
                session_id,
                [
                    ConversationTurn::user(message),
                    ConversationTurn::assistant(reply.content.clone()),
                ],
            )
            .await?;

        Ok(reply)
    }

    /// Generate a quiz. Without a backend this returns a placeholder quiz;
    /// with one, unrecoverable model output is an error, never a made-up quiz.
    pub async fn generate_quiz(&self, req: &QuizRequest) -> AssistantResult<Quiz> {
        validate_count("question_count", req.question_count)?;
        if req.topic.trim().is_empty() {
            return Err(AssistantError::InvalidRequest("quiz topic is empty".to_string()));
        }

        if self.backend.is_none() {
            warn!(topic = %req.topic, "no model backend configured, returning placeholder quiz");
            return Ok(placeholder_quiz(req));
        }

        let raw = self.generate_raw(&quiz_prompt(req)).await?;
        let quiz = decode_quiz(&raw)?;
        if quiz.questions.is_empty() {
            return Err(AssistantError::EmptyQuiz);
        }

        info!(
            topic = %req.topic,
            requested = req.question_count,
            generated = quiz.questions.len(),
            "quiz generated"
        );
        Ok(quiz)
    }

    /// Generate exactly `card_count` flashcards from study material.
    pub async fn generate_flashcards(&self, req: &FlashcardRequest) -> AssistantResult<FlashcardSet> {
        validate_count("card_count", req.card_count)?;
        if req.material.trim().is_empty() {
            return Err(AssistantError::InvalidRequest(
                "flashcard material is empty".to_string(),
            ));
        }

        let raw = self.generate_raw(&flashcard_prompt(req)).await?;
        let set = decode_flashcards(&raw, req.card_count);

        info!(cards = set.cards.len(), "flashcards generated");
        Ok(set)
    }

    /// Generate flashcards that review a stored study session.
    pub async fn flashcards_from_session(
        &self,
        session_id: Uuid,
        card_count: usize,
    ) -> AssistantResult<FlashcardSet> {
        let session = self.sessions.get_session(session_id).await?;
        let transcript = session.transcript();
        if transcript.is_empty() {
            return Err(AssistantError::EmptySession(session_id));
        }

        let material = match session.subject {
            Some(subject) => format!("Study session on {subject}:\n{transcript}"),
            None => format!("Study session:\n{transcript}"),
        };
        self.generate_flashcards(&FlashcardRequest::new(material, card_count))
            .await
    }

    async fn chat_with_prompt(
        &self,
        system_prompt: &str,
        prior_turns: &[ConversationTurn],
        message: &str,
    ) -> AssistantResult<ChatReply> {
        if message.trim().is_empty() {
            return Err(AssistantError::InvalidRequest("message is empty".to_string()));
        }

        let window = self.config.window.build(system_prompt, prior_turns, message);
        let request = ChatRequest::new(window)
            .with_max_tokens(self.config.chat_max_tokens)
            .with_temperature(self.config.chat_temperature);

        let response = self.complete(request).await?;
        Ok(ChatReply {
            content: response.content,
            tokens_used: response.tokens_used,
        })
    }

    async fn generate_raw(&self, prompt: &str) -> AssistantResult<String> {
        let window = self.config.window.build(GENERATOR_PROMPT, &[], prompt);
        let request = ChatRequest::new(window)
            .with_max_tokens(self.config.generation_max_tokens)
            .with_temperature(self.config.generation_temperature)
            .expect_json();

        Ok(self.complete(request).await?.content)
    }

    /// One backend call under the configured deadline.
    async fn complete(&self, request: ChatRequest) -> AssistantResult<ChatResponse> {
        let backend = self
            .backend
            .as_ref()
            .ok_or(AssistantError::BackendUnavailable)?;
        let deadline = self.config.request_timeout;
        let turns = request.messages.len();
        let started = Instant::now();

        let outcome = tokio::time::timeout(deadline, backend.chat(request)).await;
        let elapsed_ms = started.elapsed().as_millis();

        match outcome {
            Err(_) => {
                warn!(backend = backend.name(), ?deadline, "model backend timed out");
                Err(AssistantError::BackendTimeout(deadline))
            }
            Ok(Err(BackendError::Timeout(after))) => {
                warn!(backend = backend.name(), ?after, "model backend request timed out");
                Err(AssistantError::BackendTimeout(after))
            }
            Ok(Err(err)) => {
                warn!(backend = backend.name(), error = %err, elapsed_ms, "model backend failed");
                Err(err.into())
            }
            Ok(Ok(response)) => {
                debug!(
                    backend = backend.name(),
                    turns,
                    tokens_used = response.tokens_used,
                    elapsed_ms,
                    "model backend answered"
                );
                Ok(response)
            }
        }
    }
}

fn validate_count(field: &str, count: usize) -> AssistantResult<()> {
    if count == 0 {
        return Err(AssistantError::InvalidRequest(format!(
            "{field} must be a positive integer"
        )));
    }
    Ok(())
}

/// Quiz served when no API key is configured. Never used for failed decodes.
pub fn placeholder_quiz(req: &QuizRequest) -> Quiz {
    let topic = req.topic.trim();
    let count = req.question_count.clamp(1, PLACEHOLDER_QUESTION_LIMIT);

    let questions = (1..=count)
        .map(|n| Question::TrueFalse {
            question: format!("Sample question {n} about {topic}: this quiz is a placeholder."),
            correct_answer: "True".to_string(),
            explanation: Some(
                "Configure a model backend API key to generate real questions.".to_string(),
            ),
        })
        .collect();

    Quiz {
        title: format!("{topic} Quiz"),
        description: Some("Sample quiz generated without an AI backend".to_string()),
        questions,
    }
}

impl std::fmt::Debug for StudyAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StudyAssistant")
            .field("backend", &self.backend_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Window the assistant would send for a chat message, for inspection.
pub fn preview_window(
    config: &AssistantConfig,
    prior_turns: &[ConversationTurn],
    message: &str,
) -> ConversationWindow {
    config
        .window
        .build(&config.system_prompt, prior_turns, message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use studymate_context::TurnRole;
    use studymate_runtime::ScriptedBackend;

    fn assistant_with(backend: &Arc<ScriptedBackend>) -> StudyAssistant {
        StudyAssistant::new(
            Some(backend.clone() as Arc<dyn ModelBackend>),
            AssistantConfig::default(),
        )
    }

    fn history(count: usize) -> Vec<ConversationTurn> {
        (0..count)
            .map(|i| ConversationTurn::user(format!("turn {i}")))
            .collect()
    }

    #[tokio::test]
    async fn chat_sends_trimmed_window() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_text("Photosynthesis turns light into chemical energy.");
        let assistant = assistant_with(&backend);

        let reply = assistant.chat(&history(30), "What is photosynthesis?").await.unwrap();

        assert_eq!(reply.content, "Photosynthesis turns light into chemical energy.");
        let received = backend.received();
        let sent = &received[0];
        assert_eq!(sent.messages.len(), 21);
        assert_eq!(sent.messages[0].role, TurnRole::System);
        assert_eq!(sent.messages[1].content, "turn 11");
        assert!(!sent.json_output);
    }

    #[tokio::test]
    async fn chat_in_session_records_both_turns() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_text("Osmosis is water diffusion.");
        backend.enqueue_text("Yes, through a semi-permeable membrane.");
        let assistant = assistant_with(&backend);
        let id = assistant.sessions().create_session(Some("Biology".to_string())).await;

        assistant.chat_in_session(id, "What is osmosis?").await.unwrap();
        assistant.chat_in_session(id, "Across a membrane?").await.unwrap();

        let history = assistant.sessions().history(id).await.unwrap();
        assert_eq!(history.len(), 4);
        let received = backend.received();
        let second = &received[1];
        assert_eq!(second.messages.len(), 4);
        assert!(second.messages[0].content.contains("Biology"));
    }

    #[tokio::test]
    async fn empty_reply_keeps_session_unchanged() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_text("");
        backend.enqueue_text("Hello! What are we studying?");
        let assistant = assistant_with(&backend);
        let id = assistant.sessions().create_session(None).await;

        let err = assistant.chat_in_session(id, "hello").await.unwrap_err();
        assert!(matches!(err, AssistantError::EmptyReply));
        assert!(assistant.sessions().history(id).await.unwrap().is_empty());

        assistant.chat_in_session(id, "hello").await.unwrap();
        let history = assistant.sessions().history(id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1].role, TurnRole::Assistant);
    }

    #[tokio::test]
    async fn chat_times_out_with_deadline() {
        let backend = Arc::new(ScriptedBackend::new().with_delay(Duration::from_millis(500)));
        backend.enqueue_text("too late");
        let assistant = StudyAssistant::new(
            Some(backend as Arc<dyn ModelBackend>),
            AssistantConfig::default().with_request_timeout(Duration::from_millis(20)),
        );

        let err = assistant.chat(&[], "hello").await.unwrap_err();

        assert!(matches!(err, AssistantError::BackendTimeout(d) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn backend_timeout_error_maps_to_timeout() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue(Err(BackendError::Timeout(Duration::from_secs(60))));
        let assistant = assistant_with(&backend);

        let err = assistant.chat(&[], "hello").await.unwrap_err();

        assert!(matches!(err, AssistantError::BackendTimeout(_)));
    }

    #[tokio::test]
    async fn quiz_is_decoded_from_fenced_output() {
        let backend = Arc::new(ScriptedBackend::new());
        let body = json!({
            "title": "Fractions",
            "questions": [{
                "question": "1/2 + 1/4?",
                "type": "multiple-choice",
                "options": ["3/4", "2/6", "1/8", "1"],
                "correctAnswer": "3/4",
            }]
        });
        backend.enqueue_text(format!("```json\n{body}\n```"));
        let assistant = assistant_with(&backend);

        let quiz = assistant
            .generate_quiz(&QuizRequest::new("Fractions", 1))
            .await
            .unwrap();

        assert_eq!(quiz.title, "Fractions");
        assert_eq!(quiz.questions[0].correct_answer(), "3/4");
        let received = backend.received();
        let sent = &received[0];
        assert!(sent.json_output);
        assert_eq!(sent.messages[0].content, GENERATOR_PROMPT);
    }

    #[tokio::test]
    async fn unparseable_quiz_is_an_error() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_text("I cannot help with that.");
        let assistant = assistant_with(&backend);

        let err = assistant
            .generate_quiz(&QuizRequest::new("History", 3))
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::QuizDecode(_)));
        assert!(err.to_string().starts_with("failed to generate quiz"));
    }

    #[tokio::test]
    async fn quiz_without_valid_questions_is_an_error() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_text(r#"{"title": "Empty", "questions": []}"#);
        let assistant = assistant_with(&backend);

        let err = assistant
            .generate_quiz(&QuizRequest::new("History", 3))
            .await
            .unwrap_err();

        assert!(matches!(err, AssistantError::EmptyQuiz));
    }

    #[tokio::test]
    async fn placeholder_quiz_only_without_backend() {
        let assistant = StudyAssistant::new(None, AssistantConfig::default());

        let quiz = assistant
            .generate_quiz(&QuizRequest::new("Geometry", 3))
            .await
            .unwrap();

        assert_eq!(quiz.title, "Geometry Quiz");
        assert_eq!(quiz.questions.len(), 3);
    }

    #[tokio::test]
    async fn chat_and_flashcards_need_a_backend() {
        let assistant = StudyAssistant::new(None, AssistantConfig::default());

        assert!(matches!(
            assistant.chat(&[], "hi").await,
            Err(AssistantError::BackendUnavailable)
        ));
        assert!(matches!(
            assistant
                .generate_flashcards(&FlashcardRequest::new("notes", 3))
                .await,
            Err(AssistantError::BackendUnavailable)
        ));
    }

    #[tokio::test]
    async fn flashcards_are_normalized_to_requested_count() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_text(
            r#"{"cards": [{"question": "H2O?", "answer": "Water", "category": "Chemistry"},]}"#,
        );
        let assistant = assistant_with(&backend);

        let set = assistant
            .generate_flashcards(&FlashcardRequest::new("Water is H2O.", 4))
            .await
            .unwrap();

        assert_eq!(set.cards.len(), 4);
        assert_eq!(set.cards[0].category, "Chemistry");
        assert_eq!(set.cards[3].category, "Additional");
    }

    #[tokio::test]
    async fn session_flashcards_use_transcript() {
        let backend = Arc::new(ScriptedBackend::new());
        backend.enqueue_text("garbage without json");
        let assistant = assistant_with(&backend);
        let id = assistant.sessions().create_session(Some("Physics".to_string())).await;
        assistant
            .sessions()
            .append_turns(
                id,
                [
                    ConversationTurn::user("What is inertia?"),
                    ConversationTurn::assistant("Resistance to changes in motion."),
                ],
            )
            .await
            .unwrap();

        let set = assistant.flashcards_from_session(id, 2).await.unwrap();

        assert_eq!(set.cards.len(), 2);
        let received = backend.received();
        let prompt = &received[0].messages[1].content;
        assert!(prompt.contains("Study session on Physics"));
        assert!(prompt.contains("user: What is inertia?"));
    }

    #[tokio::test]
    async fn empty_session_cannot_make_flashcards() {
        let backend = Arc::new(ScriptedBackend::new());
        let assistant = assistant_with(&backend);
        let id = assistant.sessions().create_session(None).await;

        let err = assistant.flashcards_from_session(id, 5).await.unwrap_err();

        assert!(matches!(err, AssistantError::EmptySession(_)));
        assert!(backend.received().is_empty());
    }

    #[tokio::test]
    async fn zero_counts_are_rejected() {
        let assistant = StudyAssistant::new(None, AssistantConfig::default());

        assert!(matches!(
            assistant.generate_quiz(&QuizRequest::new("Math", 0)).await,
            Err(AssistantError::InvalidRequest(_))
        ));
    }

    #[test]
    fn preview_window_uses_tutor_prompt() {
        let config = AssistantConfig::default().with_max_turns(3);
        let window = preview_window(&config, &history(5), "next");

        assert_eq!(window.len(), 3);
        assert_eq!(window.turns()[1].content, "turn 4");
    }
}
