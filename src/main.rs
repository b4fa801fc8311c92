use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;

use antreiber_coach::audio::AlsaBackend;
use antreiber_coach::net_link::WsConnector;
use antreiber_coach::quiz::{calculate_scores, profile, DriverScores, ScoreLevel, QUESTION_COUNT};
use antreiber_coach::{spawn_session_actor, Config, SessionController, SessionStatus};

#[derive(Parser, Debug)]
#[command(name = "antreiber_coach", about = "Innere Antreiber - Selbsttest mit Sprach-Coach")]
struct Cli {
    /// Ratings 1-5, comma separated, in question order
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = clap::value_parser!(u8).range(1..=5),
        conflicts_with = "answers_file"
    )]
    answers: Vec<u8>,

    /// File with ratings separated by commas or whitespace
    #[arg(long)]
    answers_file: Option<PathBuf>,

    /// Start a voice conversation about the result
    #[arg(long)]
    coach: bool,

    /// Override the endpoint URL from config.toml
    #[arg(long)]
    endpoint: Option<String>,
}

fn read_answers_file(path: &Path) -> Result<Vec<u8>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| -> Result<u8> {
            let rating: u8 = token
                .parse()
                .with_context(|| format!("Invalid rating {:?}", token))?;
            anyhow::ensure!((1..=5).contains(&rating), "Rating out of range: {}", rating);
            Ok(rating)
        })
        .collect()
}

fn print_summary(scores: &DriverScores) {
    println!("Deine Antreiber:");
    for (driver, score) in scores.ranked() {
        println!(
            "  {:<20} {:>2}/50  {}",
            driver.name(),
            score,
            ScoreLevel::of(score).label()
        );
    }

    let (dominant, score) = scores.dominant();
    let p = profile(dominant);
    println!();
    println!("Stärkster Antreiber: {} ({} Punkte)", p.title, score);
    println!("  \"{}\"", p.slogan);
    println!("  Stärke:     {}", p.gift);
    println!("  Gefahr:     {}", p.danger);
    println!("  Tipp:       {}", p.tip);
    println!("  Erlaubnis:  {}", p.permission);
    println!("  Strategie:  {}", p.strategy);
    println!("  Frage:      {}", p.coaching_question);
}

async fn run_coach(config: Config, scores: DriverScores) -> Result<()> {
    let backend = Arc::new(AlsaBackend::new(config.audio()));
    let connector = Arc::new(WsConnector::from_config(&config));
    let controller = SessionController::new(config, backend, connector);
    let (handle, task) = spawn_session_actor(controller);
    let mut status = handle.status();

    if let Err(e) = handle.start(scores).await {
        eprintln!("{}", e.user_message());
        drop(handle);
        let _ = task.await;
        return Err(e.into());
    }
    let initial = status.borrow_and_update().clone();
    println!("{} (Strg+C beendet das Gespräch)", initial.label());

    let mut failure = None;
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                println!("Received Ctrl+C, shutting down...");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                println!("{}", current.label());
                match current {
                    SessionStatus::NotStarted => break,
                    SessionStatus::Error(reason) => {
                        failure = Some(reason);
                        break;
                    }
                    _ => {}
                }
            }
        }
    }

    handle.stop().await;
    drop(handle);
    task.await.context("Session task failed")?;

    match failure {
        Some(reason) => Err(anyhow::anyhow!(reason)),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::new()?;
    if let Some(endpoint) = cli.endpoint {
        config.ws_url = endpoint;
    }
    log::info!("{} v{} started", config.app_name, config.app_version);

    let answers = match &cli.answers_file {
        Some(path) => read_answers_file(path)?,
        None => cli.answers,
    };
    if answers.len() < QUESTION_COUNT {
        log::warn!(
            "Only {} of {} questions answered, the rest count as 0",
            answers.len(),
            QUESTION_COUNT
        );
    }

    let scores = calculate_scores(&answers);
    print_summary(&scores);

    if cli.coach {
        run_coach(config, scores).await?;
    }
    Ok(())
}
