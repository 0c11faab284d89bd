use crate::catalog::{self, Catalog};
use crate::config::Config;
use crate::crop;
use crate::host::{ReplyPart, Responder};
use anyhow::Result;
use log::{error, info, warn};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

struct Round {
    character: String,
    image_path: PathBuf,
    answers: HashSet<String>,
    started_at: Instant,
    timeout: Option<JoinHandle<()>>,
}

enum Outcome {
    NoRound,
    Wrong,
    Solved(Round),
}

const MSG_ALREADY_RUNNING: &str =
    "⏳ A round is already running, answer it or wait for the timeout!";

/// Runs the guessing game: one active round per conversation, each with a
/// reveal timer. All round state lives in the registry owned here; whoever
/// removes a round from the map (answer or timer) is the one that ends it.
pub struct GameController {
    config: Config,
    catalog: Arc<Catalog>,
    responder: Arc<dyn Responder>,
    sessions: Arc<Mutex<HashMap<String, Round>>>,
}

impl GameController {
    pub fn new(config: Config, catalog: Catalog, responder: Arc<dyn Responder>) -> Self {
        GameController {
            config,
            catalog: Arc::new(catalog),
            responder,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts a round for the conversation: picks a character, posts a crop
    /// of its portrait and arms the reveal timer.
    pub async fn start(&self, session_id: &str) -> Result<()> {
        {
            let sessions = self.sessions.lock().await;
            if sessions.contains_key(session_id) {
                drop(sessions);
                return self
                    .responder
                    .send(session_id, vec![ReplyPart::text(MSG_ALREADY_RUNNING)])
                    .await;
            }
        }

        let Some(pick) = self.catalog.pick_random() else {
            return self
                .responder
                .send(
                    session_id,
                    vec![ReplyPart::text(
                        "❌ The image library is empty, ask an admin to add character portraits!",
                    )],
                )
                .await;
        };

        let fragment =
            match crop::crop_fragment(&pick.image_path, self.config.crop_ratio, self.config.min_crop_px)
            {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("crop failed for {}: {:#}", pick.image_path.display(), e);
                    return self
                        .responder
                        .send(
                            session_id,
                            vec![ReplyPart::text("❌ Image processing failed, try again!")],
                        )
                        .await;
                }
            };

        {
            let mut sessions = self.sessions.lock().await;
            // Re-check under the lock: a concurrent start for the same
            // conversation may have inserted while we were cropping, and the
            // first round in wins.
            if sessions.contains_key(session_id) {
                drop(sessions);
                return self
                    .responder
                    .send(session_id, vec![ReplyPart::text(MSG_ALREADY_RUNNING)])
                    .await;
            }
            info!("round started in {}: {}", session_id, pick.character);
            let handle = self.spawn_timeout(session_id);
            sessions.insert(
                session_id.to_string(),
                Round {
                    character: pick.character,
                    image_path: pick.image_path,
                    answers: pick.answers,
                    started_at: Instant::now(),
                    timeout: Some(handle),
                },
            );
        }

        let hint = format!(
            "🎵 Guess the character!\n\
             Name the character from the fragment above.\n\
             You have {} seconds. Full names, short names and abbreviations all count.\n\
             Answer with: /guess <name>",
            self.config.timeout_seconds
        );
        self.responder
            .send(
                session_id,
                vec![
                    ReplyPart::Image {
                        filename: "challenge.png".to_string(),
                        data: fragment,
                    },
                    ReplyPart::text(hint),
                ],
            )
            .await
    }

    /// Checks a guess against the active round. A match ends the round and
    /// reveals the full portrait; a miss leaves the round (and its timer)
    /// untouched.
    pub async fn answer(&self, session_id: &str, guess: &str) -> Result<()> {
        let normalized = catalog::normalize(guess);

        let outcome = {
            let mut sessions = self.sessions.lock().await;
            let is_match = sessions
                .get(session_id)
                .map(|round| round.answers.contains(&normalized));
            match is_match {
                None => Outcome::NoRound,
                Some(false) => Outcome::Wrong,
                Some(true) => match sessions.remove(session_id) {
                    Some(round) => Outcome::Solved(round),
                    None => Outcome::NoRound,
                },
            }
        };

        match outcome {
            Outcome::NoRound => {
                self.responder
                    .send(
                        session_id,
                        vec![ReplyPart::text(
                            "⚠️ No round is running, send /guess to start one",
                        )],
                    )
                    .await
            }
            Outcome::Wrong => {
                self.responder
                    .send(session_id, vec![ReplyPart::text("❌ Not quite, try again!")])
                    .await
            }
            Outcome::Solved(round) => {
                if let Some(handle) = round.timeout {
                    handle.abort();
                }
                info!(
                    "round in {} solved after {:.1}s: {}",
                    session_id,
                    round.started_at.elapsed().as_secs_f32(),
                    round.character
                );
                let mut parts = vec![ReplyPart::text(format!(
                    "🎉 Correct!\nThe answer was: {}\nSend /guess to start a new round",
                    round.character
                ))];
                push_full_image(&mut parts, &round.image_path);
                self.responder.send(session_id, parts).await
            }
        }
    }

    /// Cancels every pending timer and drops all rounds. Called when the
    /// plugin is unloaded.
    pub async fn shutdown(&self) {
        let mut sessions = self.sessions.lock().await;
        for (_, round) in sessions.drain() {
            if let Some(handle) = round.timeout {
                handle.abort();
            }
        }
    }

    pub async fn active_rounds(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn has_round(&self, session_id: &str) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    fn spawn_timeout(&self, session_id: &str) -> JoinHandle<()> {
        let sessions = Arc::clone(&self.sessions);
        let responder = Arc::clone(&self.responder);
        let session_id = session_id.to_string();
        let wait = Duration::from_secs(self.config.timeout_seconds);

        tokio::spawn(async move {
            tokio::time::sleep(wait).await;

            // remove() is the check-and-clear: if the answer path got the
            // round out first, there is nothing left for the timer to do.
            let round = sessions.lock().await.remove(&session_id);
            let Some(round) = round else {
                return;
            };

            info!("round in {} timed out: {}", session_id, round.character);
            let mut parts = vec![ReplyPart::text(format!(
                "⏰ Time is up!\nThe answer was: {}\nSend /guess to start a new round",
                round.character
            ))];
            push_full_image(&mut parts, &round.image_path);
            if let Err(e) = responder.send(&session_id, parts).await {
                error!("failed to deliver timeout reveal: {:#}", e);
            }
        })
    }
}

/// Attaches the full reference portrait; a read failure degrades the reveal
/// to text only.
fn push_full_image(parts: &mut Vec<ReplyPart>, path: &Path) {
    match std::fs::read(path) {
        Ok(data) => {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "answer.png".to_string());
            parts.push(ReplyPart::Image { filename, data });
        }
        Err(e) => warn!("could not read full image {}: {}", path.display(), e),
    }
}
