use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use studymate_assistant::{
    AssistantConfig, AssistantError, Difficulty, FlashcardRequest, QuizRequest, StudyAssistant,
};
use studymate_decode::{decode, DecodeError, TargetKind};
use studymate_providers::BackendSettings;
use studymate_runtime::BackendError;
use thiserror::Error;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "studymate",
    version,
    about = "Studymate study assistant",
    long_about = "Studymate study assistant: tutoring chat, quiz and flashcard generation, and offline decoding of model output. Run without a command for interactive mode."
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        help = "Seconds to wait for the model backend (overrides STUDYMATE_REQUEST_TIMEOUT_SECS)"
    )]
    pub timeout: Option<u64>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Ask the tutor a single question")]
    Chat {
        #[arg(help = "Message to send")]
        message: String,
    },
    #[command(about = "Generate a quiz and print it as JSON")]
    Quiz {
        #[arg(help = "Quiz topic")]
        topic: String,
        #[arg(short, long, default_value_t = 5, help = "Number of questions")]
        count: usize,
        #[arg(short, long, default_value = "medium", help = "easy, medium or hard")]
        difficulty: Difficulty,
        #[arg(long, help = "File with study material to base the quiz on")]
        material: Option<PathBuf>,
    },
    #[command(about = "Generate flashcards from study material and print them as JSON")]
    Flashcards {
        #[arg(help = "Material file (reads stdin when omitted)")]
        file: Option<PathBuf>,
        #[arg(short, long, default_value_t = 10, help = "Number of cards")]
        count: usize,
        #[arg(short, long, default_value = "medium", help = "easy, medium or hard")]
        difficulty: Difficulty,
    },
    #[command(about = "Decode raw model output into a quiz or flashcard set")]
    Decode {
        #[arg(short, long, value_enum, help = "Payload to decode")]
        kind: DecodeKind,
        #[arg(
            short,
            long,
            default_value_t = 10,
            help = "Flashcard count to normalize to (ignored for quizzes)"
        )]
        count: usize,
        #[arg(help = "File with raw model output (reads stdin when omitted)")]
        file: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DecodeKind {
    Quiz,
    Flashcards,
}

impl From<DecodeKind> for TargetKind {
    fn from(kind: DecodeKind) -> Self {
        match kind {
            DecodeKind::Quiz => TargetKind::Quiz,
            DecodeKind::Flashcards => TargetKind::Flashcards,
        }
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Assistant(#[from] AssistantError),
    #[error("{0}")]
    Decode(#[from] DecodeError),
    #[error("json encode error: {0}")]
    Encode(String),
}

impl From<BackendError> for CliError {
    fn from(err: BackendError) -> Self {
        CliError::Config(err.to_string())
    }
}

/// Build the assistant from `STUDYMATE_*` and provider environment variables.
///
/// A missing API key is not an error: the assistant runs without a backend.
pub fn build_assistant(timeout_secs: Option<u64>) -> Result<StudyAssistant, CliError> {
    let mut config = AssistantConfig::from_env().map_err(|err| CliError::Config(err.to_string()))?;
    if let Some(secs) = timeout_secs {
        if secs == 0 {
            return Err(CliError::InvalidArgument(
                "--timeout must be greater than zero".to_string(),
            ));
        }
        config = config.with_request_timeout(Duration::from_secs(secs));
    }

    let backend = BackendSettings::from_env()?
        .with_timeout(config.request_timeout)
        .into_backend();
    Ok(StudyAssistant::new(backend, config))
}

pub async fn run(cli: Cli) -> Result<String, CliError> {
    if let Commands::Decode { kind, count, file } = cli.command {
        return decode_command(kind, count, file.as_deref());
    }

    let assistant = build_assistant(cli.timeout)?;
    execute(cli.command, &assistant).await
}

/// Run a command against an already configured assistant.
pub async fn execute(command: Commands, assistant: &StudyAssistant) -> Result<String, CliError> {
    match command {
        Commands::Chat { message } => {
            let reply = assistant.chat(&[], &message).await?;
            Ok(reply.content)
        }
        Commands::Quiz {
            topic,
            count,
            difficulty,
            material,
        } => {
            let mut request = QuizRequest::new(topic, count).with_difficulty(difficulty);
            if let Some(path) = material {
                request = request.with_material(read_input(Some(&path))?);
            }
            let quiz = assistant.generate_quiz(&request).await?;
            to_json(&quiz)
        }
        Commands::Flashcards {
            file,
            count,
            difficulty,
        } => {
            let material = read_input(file.as_deref())?;
            let request = FlashcardRequest::new(material, count).with_difficulty(difficulty);
            let set = assistant.generate_flashcards(&request).await?;
            to_json(&set)
        }
        Commands::Decode { kind, count, file } => decode_command(kind, count, file.as_deref()),
    }
}

fn decode_command(kind: DecodeKind, count: usize, file: Option<&Path>) -> Result<String, CliError> {
    if kind == DecodeKind::Flashcards && count == 0 {
        return Err(CliError::InvalidArgument(
            "--count must be a positive integer for flashcards".to_string(),
        ));
    }
    let raw = read_input(file)?;
    let payload = decode(&raw, kind.into(), count)?;
    to_json(&payload)
}

fn read_input(path: Option<&Path>) -> Result<String, CliError> {
    match path {
        Some(path) => std::fs::read_to_string(path).map_err(|err| CliError::Io {
            path: path.display().to_string(),
            message: err.to_string(),
        }),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|err| CliError::Io {
                    path: "stdin".to_string(),
                    message: err.to_string(),
                })?;
            Ok(buffer)
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, CliError> {
    serde_json::to_string_pretty(value).map_err(|err| CliError::Encode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{decode_command, execute, Cli, CliError, Commands, DecodeKind};
    use clap::Parser;
    use std::io::Write;
    use std::sync::Arc;
    use studymate_assistant::{AssistantConfig, AssistantError, Difficulty, StudyAssistant};
    use studymate_runtime::{ModelBackend, ScriptedBackend};
    use tempfile::NamedTempFile;

    fn scripted_assistant(replies: &[&str]) -> StudyAssistant {
        let backend = Arc::new(ScriptedBackend::new());
        for reply in replies {
            backend.enqueue_text(*reply);
        }
        StudyAssistant::new(
            Some(backend as Arc<dyn ModelBackend>),
            AssistantConfig::default(),
        )
    }

    fn temp_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn cli_parses_quiz_command() {
        let cli = Cli::parse_from([
            "studymate", "quiz", "Photosynthesis", "--count", "3", "--difficulty", "hard",
        ]);
        match cli.command {
            Commands::Quiz {
                topic,
                count,
                difficulty,
                material,
            } => {
                assert_eq!(topic, "Photosynthesis");
                assert_eq!(count, 3);
                assert_eq!(difficulty, Difficulty::Hard);
                assert!(material.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_decode_command_with_global_timeout() {
        let cli = Cli::parse_from([
            "studymate", "decode", "--kind", "flashcards", "-c", "4", "out.txt", "--timeout", "9",
        ]);
        assert_eq!(cli.timeout, Some(9));
        match cli.command {
            Commands::Decode { kind, count, file } => {
                assert_eq!(kind, DecodeKind::Flashcards);
                assert_eq!(count, 4);
                assert_eq!(file.unwrap().to_str(), Some("out.txt"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_unknown_difficulty() {
        assert!(Cli::try_parse_from(["studymate", "quiz", "x", "-d", "brutal"]).is_err());
    }

    #[test]
    fn decode_command_normalizes_flashcards() {
        let file = temp_file(
            "```json\n{\"cards\": [{\"question\": \"Q1\", \"answer\": \"A1\"},]}\n```",
        );

        let output = decode_command(DecodeKind::Flashcards, 2, Some(file.path())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["cards"].as_array().unwrap().len(), 2);
        assert_eq!(value["cards"][0]["category"], "General");
    }

    #[test]
    fn decode_command_reports_invalid_quiz() {
        let file = temp_file("no json here");

        let err = decode_command(DecodeKind::Quiz, 10, Some(file.path())).unwrap_err();

        assert!(matches!(err, CliError::Decode(_)));
        assert!(err.to_string().starts_with("invalid-json"));
    }

    #[test]
    fn decode_command_rejects_zero_flashcards() {
        let file = temp_file(r#"{"cards": [{"question": "Q1", "answer": "A1"}]}"#);

        let err = decode_command(DecodeKind::Flashcards, 0, Some(file.path())).unwrap_err();

        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn missing_input_file_is_io_error() {
        let missing = std::path::Path::new("/nonexistent/studymate/input.txt");
        let err = decode_command(DecodeKind::Quiz, 1, Some(missing)).unwrap_err();
        assert!(matches!(err, CliError::Io { .. }));
    }

    #[tokio::test]
    async fn chat_command_prints_reply() {
        let assistant = scripted_assistant(&["Mitochondria make ATP."]);

        let output = execute(
            Commands::Chat {
                message: "What do mitochondria do?".to_string(),
            },
            &assistant,
        )
        .await
        .unwrap();

        assert_eq!(output, "Mitochondria make ATP.");
    }

    #[tokio::test]
    async fn quiz_command_prints_json() {
        let assistant = scripted_assistant(&[
            r#"{"title": "Cells", "questions": [{"question": "Cells have walls", "type": "true-false", "correctAnswer": "False"}]}"#,
        ]);

        let output = execute(
            Commands::Quiz {
                topic: "Cells".to_string(),
                count: 1,
                difficulty: Difficulty::Easy,
                material: None,
            },
            &assistant,
        )
        .await
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["title"], "Cells");
        assert_eq!(value["questions"][0]["type"], "true-false");
        assert_eq!(value["questions"][0]["correctAnswer"], "False");
    }

    #[tokio::test]
    async fn chat_without_backend_fails() {
        let assistant = StudyAssistant::new(None, AssistantConfig::default());

        let err = execute(
            Commands::Chat {
                message: "hi".to_string(),
            },
            &assistant,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            CliError::Assistant(AssistantError::BackendUnavailable)
        ));
    }
}
