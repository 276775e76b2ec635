//! WORDSIM CLI
//!
//! Operates the ranking core directly: top-100 rankings, pair scores,
//! guess evaluation and a foreground residency-keeper run.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use wordsim::{KeeperConfig, RankingEngine, ResidencyKeeper, StoreLoader, WordSimError};

/// WORDSIM - Word-Embedding Similarity Ranking
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Textual embedding source (word2vec .vec format)
    #[arg(short, long, default_value = "cc.ko.300.vec")]
    embeddings: PathBuf,

    /// Compact binary cache (defaults to the source path with .wsvc)
    #[arg(long)]
    cache: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rank a candidate file against a target word
    Rank {
        /// Target word
        #[arg(short, long)]
        target: String,

        /// File with one candidate word per line
        #[arg(short, long)]
        candidates_file: PathBuf,
    },

    /// Score a single word pair
    Score {
        /// First word
        a: String,
        /// Second word
        b: String,
    },

    /// Evaluate a guess against the target's captured ranking
    Guess {
        /// Target word
        #[arg(short, long)]
        target: String,

        /// File with one candidate word per line
        #[arg(short, long)]
        candidates_file: PathBuf,

        /// The guessed word
        guess: String,
    },

    /// Load the table and run the residency keeper until Ctrl-C
    Warm {
        /// Keeper cycle interval in seconds
        #[arg(long, default_value_t = 600)]
        interval: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("wordsim=info".parse()?))
        .init();

    let args = Args::parse();
    let cache = args
        .cache
        .clone()
        .unwrap_or_else(|| args.embeddings.with_extension("wsvc"));

    let loader = StoreLoader::new();
    let store = loader
        .get_or_load(&args.embeddings, &cache)
        .context("loading embedding table")?;
    let engine = RankingEngine::new(store.clone());

    match args.command {
        Command::Rank {
            target,
            candidates_file,
        } => {
            let candidates = read_words(&candidates_file)?;
            let ranked = engine.rank(&target, &candidates)?;
            if ranked.is_empty() {
                return Err(WordSimError::EmptyCandidateSet.into());
            }
            println!("target: {target}");
            for entry in &ranked {
                println!("{:>4}. {:<24} {:>6.2}", entry.rank, entry.word, entry.score);
            }
        }

        Command::Score { a, b } => {
            let score = engine.score_pair(&a, &b)?;
            println!("{a} ~ {b}: {score:.2}");
        }

        Command::Guess {
            target,
            candidates_file,
            guess,
        } => {
            let candidates = read_words(&candidates_file)?;
            let ranked = engine.rank(&target, &candidates)?;
            let is_known = candidates.iter().any(|c| c == &guess);
            let outcome = engine.evaluate_guess(&target, &guess, &ranked, is_known)?;

            match outcome.score {
                Some(score) => println!("{guess}: score {score:.2}, rank {}", outcome.status),
                None => println!("{guess}: rank {}", outcome.status),
            }
        }

        Command::Warm { interval } => {
            let config = KeeperConfig::default().with_interval(Duration::from_secs(interval));
            let keeper = ResidencyKeeper::new(store, config);
            keeper.start();
            info!(interval_secs = interval, "residency keeper running, Ctrl-C to stop");

            tokio::signal::ctrl_c().await?;
            let status = keeper.status();
            info!(
                cycles = status.cycles_completed,
                vocab = status.vocabulary_size,
                "stopping residency keeper"
            );
            // In-flight cycle finishes on its own; not awaited here
            // since the task may be mid-sleep for a full interval
            drop(keeper.stop());
        }
    }

    Ok(())
}

/// One word per line, blanks skipped.
fn read_words(path: &std::path::Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading candidate file {}", path.display()))?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
