use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use regex::Regex;
use tokio::task::JoinSet;

use crate::api::ImageUpload;
use crate::cli::render;
use crate::models::{Credential, QuestionId};
use crate::tracker::SessionTracker;

const MAX_CMD_LENGTH: usize = 12;

static COMMAND_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*$").expect("command pattern is a valid regex")
});

/// What the terminal loop should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Quit,
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

struct CommandInstance<'a> {
    tracker: &'a SessionTracker,
    input: &'a str,
    command: &'a str,
    parameters: &'a [&'a str],
    in_flight: &'a mut JoinSet<()>,
}

pub struct Commands;
impl Commands {
    /// Runs one line of input. Answers and uploads keep going after this
    /// returns; their tasks are added to `in_flight`.
    pub async fn run_command(
        tracker: &SessionTracker,
        input: &str,
        in_flight: &mut JoinSet<()>,
    ) -> Result<Reply> {
        // Split the input (on whitespace) into:
        // - The command (first token)
        // - Its parameters (all tokens afterwards)
        let split_tokens = input.split_whitespace().collect::<Vec<_>>();
        let Some((&command, parameters)) = split_tokens.split_first() else {
            return Ok(Reply::Text(String::new()));
        };

        let mut cmd = CommandInstance { tracker, input, command, parameters, in_flight };

        let result: String = match command.to_lowercase().as_str() {
                "login" => cmd.login().await?,
            "questions" => cmd.questions().await?,
               "answer" => cmd.answer().await?,
               "upload" => cmd.upload().await?,
                "board" => cmd.board().await?,
               "status" => cmd.status().await?,
               "logout" => cmd.logout().await?,
                 "help" => Self::get_help(),
         "quit" | "exit" => return Ok(Reply::Quit),
            _ => {
                if Commands::is_valid_cmd(command) {
                    log::info!("User submitted unknown command: {}", command);
                    return Err(anyhow!("No such command found: {}, see help for commands.", command));
                } else {
                    log::info!("User submitted invalid command: {}", command);
                    return Err(anyhow!("Invalid command syntax."));
                }
            }
        };

        Ok(result.into())
    }
}

impl CommandInstance<'_> {
    async fn login(&self) -> Result<String> {
        let [username, password] = self.parameters else {
            return Err(anyhow!("Expected usage: `login <username> <password>`"));
        };

        self.tracker.login(Credential::new(*username, *password)).await?;

        let snapshot = self.tracker.snapshot().await;
        Ok(format!("Welcome, {username}!\n{}", render::questions(&snapshot)))
    }

    async fn questions(&self) -> Result<String> {
        let snapshot = self.tracker.snapshot().await;
        self.require_login(snapshot.is_authenticated())?;

        Ok(render::questions(&snapshot))
    }

    async fn answer(&mut self) -> Result<String> {
        let id = self.parameters
            .first()
            .context("Expected usage: `answer <question id> <choice>`")?;
        let id = parse_question_id(id)?;

        // Options may contain runs of whitespace, so take the line as typed.
        let choice = rest_after_tokens(self.input, 2);
        if choice.is_empty() {
            return Err(anyhow!("Expected a choice for question {id}."));
        }

        // Marked answered now; the request finishes in the background.
        let pending = self.tracker.begin_answer(id, choice).await?;
        self.in_flight.spawn(async move {
            match pending.send().await {
                Ok(ack) => println!("\n{}", render::answer_ack(id, ack)),
                Err(err) => println!("\nError: answer for question {id} was not recorded: {err}"),
            }
        });

        Ok(format!("Answer for question {id} sent."))
    }

    async fn upload(&mut self) -> Result<String> {
        let [id, path] = self.parameters else {
            return Err(anyhow!("Expected usage: `upload <question id> <path to image>`"));
        };
        let id = parse_question_id(id)?;

        let image = ImageUpload::from_path(*path)
            .await
            .with_context(|| format!("Could not read {path}"))?;

        let pending = self.tracker.begin_image_answer(id, image).await?;
        self.in_flight.spawn(async move {
            match pending.send().await {
                Ok(()) => println!("\nPhoto for question {id} uploaded."),
                Err(err) => println!("\nError: photo for question {id} was not recorded: {err}"),
            }
        });

        Ok(format!("Uploading photo for question {id}..."))
    }

    async fn board(&self) -> Result<String> {
        let snapshot = self.tracker.snapshot().await;
        self.require_login(snapshot.is_authenticated())?;

        Ok(snapshot.leaderboard.to_string())
    }

    async fn status(&self) -> Result<String> {
        Ok(render::status(&self.tracker.snapshot().await))
    }

    fn require_login(&self, authenticated: bool) -> Result<()> {
        if authenticated {
            Ok(())
        } else {
            Err(anyhow!("`{}` needs a session. Log in first: `login <username> <password>`",
                        self.command))
        }
    }

    async fn logout(&self) -> Result<String> {
        if !self.tracker.is_authenticated().await {
            return Ok(String::from("Not logged in."));
        }

        self.tracker.logout().await;
        Ok(String::from("Logged out."))
    }
}

/// What is left of `input` after skipping `count` whitespace-separated tokens.
fn rest_after_tokens(input: &str, count: usize) -> &str {
    let mut rest = input.trim_start();
    for _ in 0..count {
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        rest = rest[end..].trim_start();
    }
    rest
}

fn parse_question_id(raw: &str) -> Result<QuestionId> {
    raw.trim_start_matches('#')
        .parse::<QuestionId>()
        .with_context(|| format!("Not a question id: {raw}"))
}

/// Non-async helpers
impl Commands {
    /// Ensures that the string slice conforms to C-like identifier regex
    fn is_valid_cmd(s: &str) -> bool {
        s.len() <= MAX_CMD_LENGTH && COMMAND_PATTERN.is_match(s)
    }

    /// Gets a help string. Should be updated after a new command is added
    pub fn get_help() -> String {
        String::from(
r#"
Command List:
`login <username> <password>`:  Log in and load your questions.
`questions`:  Show all questions, their options and uploaded photos.
`answer <question id> <choice>`:  Answer a multiple-choice question.
`upload <question id> <path>`:  Answer a photo question with an image file.
`board`:  Show the leaderboard.
`status`:  Show how many questions you have answered.
`logout`:  Log out and forget this session.
`help`:  Get information on supported commands
`quit`:  Leave the game."#)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_command_names() {
        assert!(Commands::is_valid_cmd("answer"));
        assert!(Commands::is_valid_cmd("dance_party"));
        assert!(!Commands::is_valid_cmd("9lives"));
        assert!(!Commands::is_valid_cmd("who?"));
        assert!(!Commands::is_valid_cmd("averyveryverylongcommand"));
    }

    #[test]
    fn question_ids_accept_hash_prefix() {
        assert_eq!(parse_question_id("7").unwrap(), 7);
        assert_eq!(parse_question_id("#9").unwrap(), 9);
        assert!(parse_question_id("seven").is_err());
    }

    #[test]
    fn rest_keeps_inner_whitespace() {
        assert_eq!(rest_after_tokens("answer 12 New  York", 2), "New  York");
        assert_eq!(rest_after_tokens("answer 12\tTab\there", 2), "Tab\there");
        assert_eq!(rest_after_tokens("  answer   12   Paris", 2), "Paris");
        assert_eq!(rest_after_tokens("answer 12", 2), "");
        assert_eq!(rest_after_tokens("answer", 2), "");
    }

    #[test]
    fn help_lists_every_command() {
        let help = Commands::get_help();
        for cmd in ["login", "questions", "answer", "upload", "board", "status", "logout", "quit"] {
            assert!(help.contains(&format!("`{cmd}")), "missing {cmd}");
        }
    }
}
