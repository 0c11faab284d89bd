mod catalog;
mod config;
mod crop;
mod game;
mod host;

use anyhow::Result;
use async_trait::async_trait;
use catalog::Catalog;
use config::Config;
use game::GameController;
use host::{ReplyPart, Responder};
use log::info;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Stand-in for a bot framework: text goes to stdout, image attachments are
/// written next to the binary.
struct ConsoleResponder;

#[async_trait]
impl Responder for ConsoleResponder {
    async fn send(&self, _session_id: &str, parts: Vec<ReplyPart>) -> Result<()> {
        for part in parts {
            match part {
                ReplyPart::Text(text) => println!("{}", text),
                ReplyPart::Image { filename, data } => {
                    tokio::fs::write(&filename, &data).await?;
                    println!("[image saved to {}]", filename);
                }
            }
        }
        Ok(())
    }
}

const CONSOLE_SESSION: &str = "console";

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::load_or_init(Path::new("config.json"));
    let catalog = Catalog::load(Path::new(&config.image_folder), &config.extra_aliases);
    info!(
        "catalog loaded: {} characters from {}",
        catalog.character_count(),
        config.image_folder
    );

    let controller = GameController::new(config, catalog, Arc::new(ConsoleResponder));

    println!("Commands: /guess starts a round, /guess <answer> submits, /quit exits.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        let Some(rest) = guess_argument(line) else {
            continue;
        };
        if rest.is_empty() {
            controller.start(CONSOLE_SESSION).await?;
        } else {
            controller.answer(CONSOLE_SESSION, rest).await?;
        }
    }

    controller.shutdown().await;
    Ok(())
}

/// The argument of a `/guess` line, empty for a bare `/guess`. `None` for
/// anything else, including other slash-commands such as `/guessbook`.
fn guess_argument(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("/guess")?;
    if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some(rest.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guess_argument_parses_commands() {
        assert_eq!(guess_argument("/guess"), Some(""));
        assert_eq!(guess_argument("/guess miku"), Some("miku"));
        assert_eq!(guess_argument("/guess  初音 "), Some("初音"));
        assert_eq!(guess_argument("/guessbook"), None);
        assert_eq!(guess_argument("hello"), None);
    }
}
