#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line draw trigger for the lucky draw engine.
//!
//! Loads a participant pool from a JSON repository, runs one round through the
//! selector and writes the updated pool back.

mod campaign;
mod repository;
mod trigger;

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use lucky_draw_core::{PrizeAward, RoundParameters, Uid, DEFAULT_MISS_THRESHOLD};
use lucky_draw_pool::query;

use crate::{
    campaign::CampaignConfig,
    repository::JsonPoolRepository,
    trigger::{run_round, RoundPolicy},
};

/// Runs lucky draw rounds over a participant pool.
#[derive(Debug, Parser)]
#[command(name = "lucky-draw", version, about)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Draws the winners of one round and saves the updated pool.
    Draw(DrawArgs),
    /// Lists participants with their draw counters.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
struct DrawArgs {
    /// JSON file holding the participant pool.
    #[arg(long)]
    pool: PathBuf,
    /// TOML file with campaign-wide settings.
    #[arg(long)]
    campaign: Option<PathBuf>,
    /// Number of winners requested.
    #[arg(long)]
    lucky_count: u32,
    /// Sequence number of this round within the campaign.
    #[arg(long)]
    draw_count: u32,
    /// Uid guaranteed to win on manual rounds; repeat to list several.
    #[arg(long = "manual", value_name = "UID")]
    manual: Vec<String>,
    /// Miss counter at which a participant is guaranteed a win.
    #[arg(long)]
    miss_threshold: Option<u32>,
    /// Identifier of the prize awarded this round.
    #[arg(long)]
    prize_id: String,
    /// Display name of the prize awarded this round.
    #[arg(long)]
    prize_name: String,
    /// Seed for the random fill; drawn from the OS when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Prints winners as JSON records instead of text.
    #[arg(long)]
    json: bool,
    /// Resolves the round without saving the pool.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Args)]
struct ShowArgs {
    /// JSON file holding the participant pool.
    #[arg(long)]
    pool: PathBuf,
    /// Miss counter used to flag participants due a guaranteed win.
    #[arg(long, default_value_t = DEFAULT_MISS_THRESHOLD)]
    threshold: u32,
}

/// Entry point for the lucky draw command-line interface.
fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match Cli::parse().command {
        CliCommand::Draw(args) => draw(args),
        CliCommand::Show(args) => show(&args),
    }
}

fn draw(args: DrawArgs) -> Result<()> {
    let campaign = match &args.campaign {
        Some(path) => CampaignConfig::load(path)?,
        None => CampaignConfig::default(),
    };

    let manual_ids = if args.manual.is_empty() {
        campaign.manual_guaranteed_ids.clone()
    } else {
        args.manual
    };
    let params = RoundParameters::new(args.lucky_count, args.draw_count)
        .with_manual_ids(manual_ids.into_iter().map(Uid::from))
        .with_miss_threshold(args.miss_threshold.unwrap_or(campaign.miss_threshold));
    let policy = RoundPolicy {
        allow_repeat_wins: campaign.allow_repeat_wins,
        schedule: campaign.schedule()?,
    };
    let prize = PrizeAward::new(
        args.prize_id,
        args.prize_name,
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    let seed = args.seed.unwrap_or_else(rand::random);

    let repository = JsonPoolRepository::new(args.pool);
    let mut pool = repository.load()?;
    info!(
        "round {} over {} participants from {}, seed {seed}",
        params.draw_count,
        query::len(&pool),
        repository.path().display()
    );

    let winners = run_round(&mut pool, &params, &prize, policy, seed)?;

    if args.json {
        let json = serde_json::to_string_pretty(&winners).context("failed to encode winners")?;
        println!("{json}");
    } else {
        for winner in &winners {
            let participant = &winner.participant;
            println!(
                "{:>3}. {} {} ({}) [{}]",
                winner.rank,
                participant.uid(),
                participant.name(),
                participant.department(),
                winner.source
            );
        }
    }

    if args.dry_run {
        info!("dry run, pool left unchanged");
        return Ok(());
    }
    repository.save(&pool)
}

fn show(args: &ShowArgs) -> Result<()> {
    let pool = JsonPoolRepository::new(&args.pool).load()?;
    for participant in query::participants(&pool) {
        let due = if participant.miss_count() >= args.threshold {
            "*"
        } else {
            " "
        };
        println!(
            "{due} {:>5} {:<10} {:<20} {:<12} misses={:<3} wins={}",
            participant.id(),
            participant.uid(),
            participant.name(),
            participant.department(),
            participant.miss_count(),
            participant.win_count()
        );
    }
    Ok(())
}
