#![deny(warnings)]

//! Headless runner: plays a game with the autopilot and reports KPIs.

use anyhow::{bail, Context, Result};
use persistence::{create_save, default_sqlite_url, init_db, load_latest, SaveData};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sim_ai::{run_session, Autopilot, AutopilotConfig};
use sim_core::text::format_money;
use sim_core::Tunables;
use sim_runtime::Engine;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct Args {
    turns: Option<u32>,
    seed: Option<u64>,
    config: Option<String>,
    autopilot: Option<String>,
    save: Option<String>,
    resume: Option<String>,
    db: Option<String>,
    export: Option<String>,
    json: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        let mut value = || it.next().with_context(|| format!("{arg} needs a value"));
        match arg.as_str() {
            "--turns" => args.turns = Some(value()?.parse().context("--turns")?),
            "--seed" => args.seed = Some(value()?.parse().context("--seed")?),
            "--config" => args.config = Some(value()?),
            "--autopilot" => args.autopilot = Some(value()?),
            "--save" => args.save = Some(value()?),
            "--resume" => args.resume = Some(value()?),
            "--db" => args.db = Some(value()?),
            "--export" => args.export = Some(value()?),
            "--json" => args.json = true,
            other => bail!("unknown argument {other}"),
        }
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args()?;
    info!(
        git_sha = env!("GIT_SHA"),
        build_date = env!("BUILD_DATE"),
        ?args,
        "starting CLI"
    );

    let tunables = match &args.config {
        Some(path) => Tunables::from_yaml_file(path)?,
        None => Tunables::default(),
    };
    let engine = Engine::new(tunables)?;
    let pilot = match &args.autopilot {
        Some(path) => Autopilot::new(AutopilotConfig::from_yaml_file(path)?)?,
        None => Autopilot::default(),
    };
    let mut rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let db_url = args.db.as_deref().unwrap_or(default_sqlite_url());
    let pool = if args.save.is_some() || args.resume.is_some() {
        Some(init_db(db_url).await?)
    } else {
        None
    };

    let (initial, mut event_log) = match (&pool, &args.resume) {
        (Some(pool), Some(name)) => {
            let save = load_latest(pool, name)
                .await?
                .with_context(|| format!("no save named {name}"))?;
            info!(name = %name, turn = save.state.turn, "resuming save");
            (save.state, save.event_log)
        }
        _ => (engine.create_initial_state(), Vec::new()),
    };

    let summary = run_session(&engine, &pilot, initial, args.turns.unwrap_or(50), &mut rng);
    event_log.extend(summary.log.iter().cloned());

    let save = SaveData::new(summary.state.clone(), event_log);
    if let (Some(pool), Some(name)) = (&pool, &args.save) {
        let id = create_save(pool, name, &save).await?;
        info!(id, name = %name, "saved game");
    }
    if let Some(path) = &args.export {
        std::fs::write(path, save.to_json()?).with_context(|| format!("write {path}"))?;
        info!(path = %path, "exported save");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    println!(
        "KPI | turns: {} | actions: {} | net worth: ${} | peak: ${} | trades: {} | milestones: {} | game over: {}",
        summary.turns_played,
        summary.actions_taken,
        format_money(summary.final_net_worth),
        format_money(summary.peak_net_worth),
        summary.total_trades,
        summary.milestones.len(),
        summary
            .game_over
            .map(|r| r.to_string())
            .unwrap_or_else(|| "no".to_string()),
    );

    Ok(())
}
