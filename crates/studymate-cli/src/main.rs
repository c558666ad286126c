use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use studymate_assistant::{AssistantError, QuizRequest, StudyAssistant};
use studymate_cli::CliError;
use studymate_decode::{FlashcardSet, Question, Quiz};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

const REPL_COMMANDS: &[&str] = &[
    "subject", "quiz", "cards", "history", "reset", "help", "exit", "quit",
];

#[derive(Debug, Clone, PartialEq, Eq)]
enum ReplCommand {
    Subject(String),
    Quiz(String, usize),
    Cards(usize),
    History,
    Reset,
    Help,
    Exit,
    Empty,
    Ask(String),
    Unknown(String),
}

#[derive(Default)]
struct ReplHelper;

impl Helper for ReplHelper {}
impl Hinter for ReplHelper {
    type Hint = String;
}
impl Highlighter for ReplHelper {}
impl Validator for ReplHelper {}

impl Completer for ReplHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let pos = pos.min(line.len());
        let input = &line[..pos];
        if !input.starts_with('/') || input.contains(char::is_whitespace) {
            return Ok((pos, Vec::new()));
        }

        let pairs = complete_candidates(&input[1..])
            .into_iter()
            .map(|candidate| Pair {
                display: format!("/{candidate}"),
                replacement: format!("/{candidate}"),
            })
            .collect();
        Ok((0, pairs))
    }
}

/// Lines starting with `/` are commands; anything else is a question for the tutor.
fn parse_command(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Empty;
    }
    let Some(command_line) = line.strip_prefix('/') else {
        return ReplCommand::Ask(line.to_string());
    };

    let mut parts = command_line.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let tail = parts.next().map(str::trim).unwrap_or_default();

    match command {
        "exit" | "quit" => ReplCommand::Exit,
        "help" | "?" => ReplCommand::Help,
        "history" => ReplCommand::History,
        "reset" => ReplCommand::Reset,
        "subject" if !tail.is_empty() => ReplCommand::Subject(tail.to_string()),
        "subject" => ReplCommand::Unknown("usage: /subject <name>".to_string()),
        "quiz" => parse_quiz(tail),
        "cards" if tail.is_empty() => ReplCommand::Cards(5),
        "cards" => match tail.parse::<usize>() {
            Ok(count) if count > 0 => ReplCommand::Cards(count),
            _ => ReplCommand::Unknown("usage: /cards [count]".to_string()),
        },
        _ => ReplCommand::Unknown(format!("unknown command: {line}")),
    }
}

/// `/quiz [count] <topic>`
fn parse_quiz(tail: &str) -> ReplCommand {
    let usage = || ReplCommand::Unknown("usage: /quiz [count] <topic>".to_string());
    let mut parts = tail.splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or_default();

    match first.parse::<usize>() {
        Ok(0) => usage(),
        Ok(count) => match parts.next().map(str::trim).filter(|t| !t.is_empty()) {
            Some(topic) => ReplCommand::Quiz(topic.to_string(), count),
            None => usage(),
        },
        Err(_) if !tail.is_empty() => ReplCommand::Quiz(tail.to_string(), 5),
        Err(_) => usage(),
    }
}

fn help_text() -> String {
    [
        "Type a question to ask the tutor, or a command:",
        "  /subject <name>        Start a new session on a subject",
        "  /quiz [count] <topic>  Generate a quiz",
        "  /cards [count]         Flashcards from this session",
        "  /history               Show the conversation so far",
        "  /reset                 Forget the conversation",
        "  /help                  Show this help",
        "  /exit | /quit          Exit",
    ]
    .join("\n")
}

struct ReplState {
    assistant: StudyAssistant,
    session_id: Uuid,
}

impl ReplState {
    async fn new(assistant: StudyAssistant) -> Self {
        let session_id = assistant.sessions().create_session(None).await;
        Self {
            assistant,
            session_id,
        }
    }

    async fn restart(&mut self, subject: Option<String>) -> Result<(), CliError> {
        let sessions = self.assistant.sessions();
        sessions
            .delete_session(self.session_id)
            .await
            .map_err(AssistantError::from)?;
        self.session_id = sessions.create_session(subject).await;
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "studymate=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if std::env::args().count() > 1 {
        let cli = studymate_cli::Cli::parse();
        match studymate_cli::run(cli).await {
            Ok(output) => println!("{output}"),
            Err(err) => {
                eprintln!("{} {err}", "error:".red());
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let assistant = studymate_cli::build_assistant(None)?;
    tracing::info!(
        "Starting Studymate v{} (backend: {})",
        env!("CARGO_PKG_VERSION"),
        assistant.backend_name().unwrap_or("none")
    );

    let mut editor = Editor::<ReplHelper, rustyline::history::DefaultHistory>::new()?;
    editor.set_helper(Some(ReplHelper));
    let history = history_file();
    let _ = editor.load_history(&history);

    let mut state = ReplState::new(assistant).await;
    println!(
        "{}",
        "Studymate interactive mode. Ask a question or type `/help`.".bright_green()
    );
    if state.assistant.backend_name().is_none() {
        println!(
            "{} no API key configured, chat is unavailable and quizzes are placeholders",
            "warning:".yellow()
        );
    }

    loop {
        match editor.readline("studymate> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(trimmed);
                match run_repl_command(&mut state, parse_command(trimmed)).await {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(err) => eprintln!("{} {}", "error:".red(), err),
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted)
            | Err(rustyline::error::ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                eprintln!("{} {err}", "error:".red());
                break;
            }
        }
    }

    if let Err(err) = editor.save_history(&history) {
        eprintln!("{} failed to save history: {err}", "warning:".yellow());
    }
    Ok(())
}

async fn run_repl_command(state: &mut ReplState, command: ReplCommand) -> Result<bool, CliError> {
    match command {
        ReplCommand::Ask(message) => {
            let reply = state
                .assistant
                .chat_in_session(state.session_id, &message)
                .await?;
            println!("{}", "tutor:".bright_magenta());
            println!("{}", reply.content);
            println!("{}", format!("({} tokens)", reply.tokens_used).dimmed());
        }
        ReplCommand::Subject(subject) => {
            state.restart(Some(subject.clone())).await?;
            println!("{} {}", "studying".green(), subject.cyan());
        }
        ReplCommand::Quiz(topic, count) => {
            let quiz = state
                .assistant
                .generate_quiz(&QuizRequest::new(topic, count))
                .await?;
            print_quiz(&quiz);
        }
        ReplCommand::Cards(count) => {
            let set = state
                .assistant
                .flashcards_from_session(state.session_id, count)
                .await?;
            print_flashcards(&set);
        }
        ReplCommand::History => {
            let turns = state
                .assistant
                .sessions()
                .history(state.session_id)
                .await
                .map_err(AssistantError::from)?;
            if turns.is_empty() {
                println!("{}", "no conversation yet".yellow());
            }
            for turn in turns {
                println!("{} {}", format!("{}:", turn.role.as_str()).cyan(), turn.content);
            }
        }
        ReplCommand::Reset => {
            state.restart(None).await?;
            println!("{}", "conversation cleared".green());
        }
        ReplCommand::Help => {
            println!("{}", help_text().bright_blue());
        }
        ReplCommand::Exit => {
            println!("{}", "bye".bright_green());
            return Ok(true);
        }
        ReplCommand::Empty => {}
        ReplCommand::Unknown(message) => {
            println!("{} {message}", "warning:".yellow());
            println!("{}", "Type `/help` for available commands.".yellow());
        }
    }

    Ok(false)
}

fn print_quiz(quiz: &Quiz) {
    println!("{}", quiz.title.bright_blue().bold());
    if let Some(description) = &quiz.description {
        println!("{}", description.dimmed());
    }
    for (i, question) in quiz.questions.iter().enumerate() {
        println!("{}. {}", (i + 1).to_string().cyan(), question.prompt());
        match question {
            Question::MultipleChoice { options, .. } => {
                for (letter, option) in ['A', 'B', 'C', 'D'].iter().zip(options) {
                    println!("   {letter}) {option}");
                }
            }
            Question::TrueFalse { .. } => println!("   True / False"),
        }
        println!("   {}", format!("answer: {}", question.correct_answer()).green());
    }
}

fn print_flashcards(set: &FlashcardSet) {
    if let Some(title) = &set.title {
        println!("{}", title.bright_blue().bold());
    }
    for (i, card) in set.cards.iter().enumerate() {
        println!(
            "{}. [{}] {}",
            (i + 1).to_string().cyan(),
            card.category.dimmed(),
            card.question
        );
        println!("   {}", card.answer.green());
    }
}

fn history_file() -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".studymate-history");
    }
    PathBuf::from(".studymate-history")
}

fn complete_candidates(prefix: &str) -> BTreeSet<&'static str> {
    REPL_COMMANDS
        .iter()
        .copied()
        .filter(|command| command.starts_with(prefix))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{complete_candidates, help_text, parse_command, ReplCommand};

    #[test]
    fn plain_text_is_a_question() {
        let command = parse_command("what is osmosis?");
        assert_eq!(command, ReplCommand::Ask("what is osmosis?".to_string()));
    }

    #[test]
    fn parse_quiz_with_and_without_count() {
        assert_eq!(
            parse_command("/quiz 3 cell biology"),
            ReplCommand::Quiz("cell biology".to_string(), 3)
        );
        assert_eq!(
            parse_command("/quiz fractions"),
            ReplCommand::Quiz("fractions".to_string(), 5)
        );
        assert_eq!(
            parse_command("/quiz"),
            ReplCommand::Unknown("usage: /quiz [count] <topic>".to_string())
        );
    }

    #[test]
    fn parse_cards_count() {
        assert_eq!(parse_command("/cards"), ReplCommand::Cards(5));
        assert_eq!(parse_command("/cards 12"), ReplCommand::Cards(12));
        assert_eq!(
            parse_command("/cards lots"),
            ReplCommand::Unknown("usage: /cards [count]".to_string())
        );
    }

    #[test]
    fn parse_subject_requires_name() {
        assert_eq!(
            parse_command("/subject"),
            ReplCommand::Unknown("usage: /subject <name>".to_string())
        );
        assert_eq!(
            parse_command("/subject Organic chemistry"),
            ReplCommand::Subject("Organic chemistry".to_string())
        );
    }

    #[test]
    fn complete_candidates_matches_prefix() {
        let candidates = complete_candidates("h");
        assert!(candidates.contains("help"));
        assert!(candidates.contains("history"));
        assert!(!candidates.contains("quiz"));
    }

    #[test]
    fn help_text_lists_core_commands() {
        let help = help_text();
        for command in ["/subject <name>", "/quiz [count] <topic>", "/cards [count]", "/reset"] {
            assert!(help.contains(command), "help text missing `{command}`");
        }
    }
}
