//! Headless game runner.
//!
//! Creates a game and advances it day by day, auto-resolving every
//! decision card with its first option, then prints a summary. Useful
//! for soaking the simulation and for eyeballing event logs:
//!
//!   game-runner --seed demo-42 --days 120 --db /tmp/ledgerlife.db

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use ledgerlife_core::action::GameAction;
use ledgerlife_core::config::GameConfig;
use ledgerlife_core::processor::{ActionProcessor, NewGame};
use ledgerlife_core::store::GameStore;
use log::info;
use uuid::Uuid;

struct Args {
    seed: String,
    days: u32,
    db: Option<String>,
    difficulty: String,
    persona: String,
    region: String,
    start_date: NaiveDate,
    config: Option<String>,
    dump_events: bool,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        seed: "demo".to_string(),
        days: 90,
        db: None,
        difficulty: "normal".to_string(),
        persona: "adult".to_string(),
        region: "us".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        config: None,
        dump_events: false,
    };
    let mut it = std::env::args().skip(1);
    while let Some(flag) = it.next() {
        let mut value = |name: &str| {
            it.next()
                .with_context(|| format!("missing value for {name}"))
        };
        match flag.as_str() {
            "--seed" => args.seed = value("--seed")?,
            "--days" => args.days = value("--days")?.parse().context("--days must be a number")?,
            "--db" => args.db = Some(value("--db")?),
            "--difficulty" => args.difficulty = value("--difficulty")?,
            "--persona" => args.persona = value("--persona")?,
            "--region" => args.region = value("--region")?,
            "--start-date" => {
                args.start_date = value("--start-date")?
                    .parse()
                    .context("--start-date must be YYYY-MM-DD")?
            }
            "--config" => args.config = Some(value("--config")?),
            "--dump-events" => args.dump_events = true,
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            other => bail!("unknown flag '{other}' (try --help)"),
        }
    }
    Ok(args)
}

fn print_usage() {
    println!(
        "game-runner — headless financial-life simulation driver

USAGE:
    game-runner [--seed S] [--days N] [--db PATH] [--difficulty D]
                [--persona P] [--region R] [--start-date YYYY-MM-DD]
                [--config PATH] [--dump-events]

Defaults: --seed demo --days 90 --difficulty normal --persona adult
          --region us --start-date 2024-01-01, in-memory database."
    );
}

fn dollars(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, (cents % 100).abs())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let config = match &args.config {
        Some(path) => GameConfig::load(path)?,
        None => GameConfig::default_test(),
    };
    let store = match &args.db {
        Some(path) => GameStore::open(path)?,
        None => GameStore::in_memory()?,
    };
    store.migrate()?;
    let processor = ActionProcessor::new(store, config);

    let game_id = format!("game-{}", Uuid::new_v4());
    let game = processor.create_game(&NewGame {
        game_id: game_id.clone(),
        user_id: "runner".to_string(),
        persona: args.persona.clone(),
        difficulty: args.difficulty.clone(),
        region: args.region.clone(),
        start_date: args.start_date,
        seed: args.seed.clone(),
    })?;
    info!("running {} for {} days (seed {})", game.game_id, args.days, args.seed);

    // Simulated wall clock: one day of real time per game day, so the
    // daily streak never breaks.
    let mut now_unix = 1_700_000_000i64;
    for day in 0..args.days {
        // Resolve whatever is pending with the first option before the
        // day can advance.
        loop {
            let pending = processor.store().pending_cards(&game_id)?;
            let Some(card) = pending.first() else { break };
            let option_id = card
                .options
                .first()
                .map(|o| o.option_id.clone())
                .context("pending card has no options")?;
            let result = processor.process_at(
                &game_id,
                &GameAction::DecideCard {
                    card_id: card.card_id.clone(),
                    option_id,
                },
                now_unix,
            );
            if !result.success {
                bail!("decide_card failed on day {day}: {:?}", result.errors);
            }
        }

        let result = processor.process_at(&game_id, &GameAction::AdvanceDay, now_unix);
        if !result.success {
            bail!("advance_day failed on day {day}: {:?}", result.errors);
        }
        now_unix += 24 * 60 * 60;
    }

    let state = processor.store().load_game(&game_id)?;
    let reports = processor.store().monthly_reports(&game_id)?;
    println!("== {} after {} days ==", game_id, args.days);
    println!("date            {}", state.date);
    println!("level           {} ({} xp, {} coins)", state.level, state.xp, state.coins);
    println!("happiness       {}", state.happiness);
    println!("net worth       {}", dollars(state.net_worth));
    println!("credit health   {}", state.chi);
    println!("budget score    {}", state.budget_score);
    println!("streak          {} (longest {})", state.streak_current, state.streak_longest);
    println!("stage           {}", state.bankruptcy_stage.as_str());
    println!("-- monthly reports --");
    for r in reports {
        println!(
            "{}  net {}  in {}  out {}  chi {}  budget {}",
            r.month,
            dollars(r.net_worth),
            dollars(r.income),
            dollars(r.expenses),
            r.chi,
            r.budget_score
        );
    }
    if args.dump_events {
        for row in processor.store().events_for_game(&game_id)? {
            // payload is already JSON; re-wrap with the log metadata.
            let line = serde_json::json!({
                "id": row.id,
                "date": row.date,
                "type": row.event_type,
                "payload": serde_json::from_str::<serde_json::Value>(&row.payload)?,
            });
            println!("{line}");
        }
    }
    Ok(())
}
