//! Chess Arbiter - console entry point.
//!
//! Runs matches, lists saved games, and replays them. Console narration
//! subscribes to the driver's event channel; the core never prints.

mod cli;

use anyhow::Result;
use chess_arbiter::{
    GameStore, LlmClient, LlmProposer, MatchConfig, MatchDriver, MatchEvent, MoveProposer,
    ProposerConfig, ReplaySession,
};
use clap::Parser;
use cli::Cli;
use std::io::Write as _;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

type ConsoleInput = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    // Interrupt means clean termination, not a stack trace.
    tokio::select! {
        result = run(cli) => result,
        _ = tokio::signal::ctrl_c() => {
            println!();
            info!("Interrupted, exiting");
            Ok(())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = MatchConfig::load_or_default(&cli.config)?;
    let store = GameStore::new(config.games_dir());
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    if cli.play {
        run_match(&config, &store).await
    } else if let Some(key) = &cli.replay {
        run_replay(&store, key, &mut input).await
    } else if cli.list {
        run_list(&store)
    } else {
        run_menu(&config, &store, &mut input).await
    }
}

/// Runs one full match and saves the record.
#[instrument(skip_all)]
async fn run_match(config: &MatchConfig, store: &GameStore) -> Result<()> {
    let white = build_proposer("White", config.white())?;
    let black = build_proposer("Black", config.black())?;

    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let narrator = spawn_narrator(event_rx);

    let driver = MatchDriver::new(white, black, *config.max_moves(), event_tx);
    let record = driver.run().await;
    narrator.await.ok();

    let path = store.save(&record)?;

    println!("\n=== Game Summary ===");
    println!("Result: {}", record.result);
    println!("Total moves: {}", record.total_moves);
    println!("Saved to: {}", path.display());
    Ok(())
}

fn build_proposer(
    side: &str,
    config: &ProposerConfig,
) -> Result<Box<dyn MoveProposer + Send>> {
    let llm_config = config.create_llm_config()?;
    let client = LlmClient::new(llm_config);
    let name = format!("{} ({})", side, config.label());
    Ok(Box::new(LlmProposer::new(name, client)))
}

/// Prints match progress from the driver's event stream.
fn spawn_narrator(mut events: mpsc::UnboundedReceiver<MatchEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                MatchEvent::MatchStarted { white, black, board } => {
                    println!("Starting new chess game: {} vs {}", white, black);
                    println!("Initial position:\n{}\n", board);
                }
                MatchEvent::TurnStarted { move_number, side } => {
                    println!("Move {}: {}'s turn", move_number, side);
                }
                MatchEvent::MoveRejected { san, attempt, .. } => {
                    println!("  proposed '{}' is illegal (attempt {})", san, attempt);
                }
                MatchEvent::FallbackUsed { san, reason, .. } => {
                    println!("  falling back to '{}': {}", san, reason);
                }
                MatchEvent::MoveApplied {
                    san,
                    evaluation,
                    explanation,
                    board,
                    ..
                } => {
                    println!("  {} - {}", san, explanation);
                    println!("  Evaluation: {}", evaluation);
                    println!("Current position:\n{}\n", board);
                }
                MatchEvent::GameOver {
                    result,
                    total_moves,
                    ..
                } => {
                    println!("Game finished! Result: {}", result);
                    println!("Total moves: {}", total_moves);
                }
            }
        }
    })
}

/// Prints saved matches, newest first.
fn run_list(store: &GameStore) -> Result<()> {
    let names = store.list()?;
    if names.is_empty() {
        println!("No saved games in {}/", store.dir().display());
        return Ok(());
    }
    for (i, name) in names.iter().enumerate() {
        println!("{:>3}. {}", i + 1, name);
    }
    Ok(())
}

/// Steps through a saved match. `key` is a filename or an ordinal from
/// the list output.
#[instrument(skip(store, input))]
async fn run_replay(store: &GameStore, key: &str, input: &mut ConsoleInput) -> Result<()> {
    let name = store.resolve(key)?;
    let record = store.load(&name)?;
    let result = record.result.clone();

    println!(
        "Replaying {} - {} ({} moves, played {})",
        name, record.result, record.total_moves, record.date
    );
    let mut session = ReplaySession::new(record);
    println!("Starting position:\n{}\n", session.board());

    while session.remaining() > 0 {
        if !prompt_step(input).await? {
            println!("Replay aborted.");
            return Ok(());
        }
        match session.next_step() {
            Some(Ok(step)) => {
                println!(
                    "Move {} ({}): {} - {}",
                    step.move_number, step.color, step.san, step.explanation
                );
                println!("  Evaluation: {}", step.evaluation);
                if step.fen_mismatch {
                    println!("  (stored FEN disagrees with the reconstructed position)");
                }
                println!("{}\n", step.board);
            }
            Some(Err(e)) => {
                println!("Replay stopped: {}", e);
                return Ok(());
            }
            None => break,
        }
    }

    println!("End of game. Result: {}", result);
    Ok(())
}

/// Interactive menu offering the same actions as the CLI flags.
async fn run_menu(
    config: &MatchConfig,
    store: &GameStore,
    input: &mut ConsoleInput,
) -> Result<()> {
    loop {
        println!("\n=== Chess Arbiter ===");
        println!("1) Play a new match");
        println!("2) Replay a saved match");
        println!("3) List saved matches");
        println!("4) Exit");
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(choice) = input.next_line().await? else {
            break;
        };

        // Menu actions report their errors and return to the menu; only
        // exit and interrupt terminate the process.
        match choice.trim() {
            "1" => {
                if let Err(e) = run_match(config, store).await {
                    eprintln!("Match failed: {}", e);
                }
            }
            "2" => {
                if let Err(e) = run_list(store) {
                    eprintln!("List failed: {}", e);
                    continue;
                }
                print!("Which game (number or filename)? ");
                std::io::stdout().flush().ok();
                let Some(key) = input.next_line().await? else {
                    break;
                };
                let key = key.trim().to_string();
                if key.is_empty() {
                    continue;
                }
                if let Err(e) = run_replay(store, &key, input).await {
                    eprintln!("Replay failed: {}", e);
                }
            }
            "3" => {
                if let Err(e) = run_list(store) {
                    eprintln!("List failed: {}", e);
                }
            }
            "4" | "q" | "exit" => break,
            "" => {}
            other => println!("Unknown choice '{}'", other),
        }
    }
    Ok(())
}

/// Returns false when the user aborts the replay.
async fn prompt_step(input: &mut ConsoleInput) -> Result<bool> {
    print!("[Enter] next move, q to quit: ");
    std::io::stdout().flush().ok();
    match input.next_line().await? {
        Some(line) => Ok(!line.trim().eq_ignore_ascii_case("q")),
        None => Ok(false),
    }
}
