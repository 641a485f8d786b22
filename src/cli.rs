pub mod commands;
pub mod render;

use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::{JoinHandle, JoinSet};

use crate::tracker::SessionTracker;

use commands::{Commands, Reply};

fn prompt() {
    print!("> ");
    std::io::stdout().flush().ok();
}

/// Prints the reward banner the first time a session has every question answered.
fn spawn_reward_watcher(tracker: SessionTracker) -> JoinHandle<()> {
    let mut revisions = tracker.subscribe();

    tokio::spawn(async move {
        let mut rewarded = false;
        while revisions.changed().await.is_ok() {
            let snapshot = tracker.snapshot().await;
            if !snapshot.is_authenticated() {
                rewarded = false;
            } else if snapshot.all_answered && !rewarded {
                rewarded = true;
                log::info!("{} finished the game", snapshot.username.unwrap_or_default());
                println!("{}", render::REWARD_BANNER);
                prompt();
            }
        }
    })
}

/// Reads commands from stdin until `quit` or end of input.
pub async fn run(tracker: SessionTracker) -> Result<()> {
    println!("Trivia Game. Type `help` for commands.");
    let watcher = spawn_reward_watcher(tracker.clone());

    let mut in_flight = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    while let Some(line) = lines.next_line().await? {
        while in_flight.try_join_next().is_some() {}

        match Commands::run_command(&tracker, line.trim(), &mut in_flight).await {
            Ok(Reply::Quit) => break,
            Ok(Reply::Text(text)) => {
                if !text.is_empty() {
                    println!("{text}");
                }
            }
            Err(err) => println!("Error: {err}"),
        }
        prompt();
    }

    finish_in_flight(&mut in_flight).await;
    tracker.logout().await;
    watcher.abort();
    Ok(())
}

/// Waits for answers and uploads that were already reported as sent.
pub async fn finish_in_flight(in_flight: &mut JoinSet<()>) {
    if !in_flight.is_empty() {
        log::info!("[run] Waiting for {} answer(s) still being sent", in_flight.len());
    }
    while let Some(joined) = in_flight.join_next().await {
        if let Err(err) = joined {
            log::warn!("[run] Answer task failed: {err}");
        }
    }
}
