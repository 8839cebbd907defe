//! ledger-runner: headless runner for the esusu ledger.
//!
//! Usage:
//!   ledger-runner --seed 12345 --members 5 --amount 1000 --db run.db
//!   ledger-runner --config ledger.json --serve
//!
//! Without `--serve` it runs one seeded rotation and prints a summary.
//! With `--serve` it reads one JSON request per line on stdin and writes
//! one JSON response per line on stdout (see api.rs).

mod api;

use anyhow::Result;
use esusu_core::{
    config::LedgerConfig,
    simulation::{RotationSimulator, SimulationSummary},
    Ledger,
};
use std::env;
use std::io::{self, BufRead, Write};

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let mut config = match arg_value(&args, "--config") {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig {
            database_path: ":memory:".into(),
            ..LedgerConfig::default()
        },
    };
    if let Some(db) = arg_value(&args, "--db") {
        config.database_path = db.to_string();
    }
    config.simulation.seed = parse_arg(&args, "--seed", config.simulation.seed);
    config.simulation.members = parse_arg(&args, "--members", config.simulation.members);
    config.simulation.amount_per_person =
        parse_arg(&args, "--amount", config.simulation.amount_per_person);
    let serve = args.iter().any(|a| a == "--serve");

    let ledger = Ledger::open(config.clone())?;

    if serve {
        log::info!("serving requests on stdin (db: {})", config.database_path);
        run_request_loop(&ledger)?;
    } else {
        println!("Esusu ledger: ledger-runner");
        println!("  seed:      {}", config.simulation.seed);
        println!("  members:   {}", config.simulation.members);
        println!("  amount:    {}", config.simulation.amount_per_person);
        println!("  db:        {}", config.database_path);
        println!();
        let started = chrono::Utc::now();
        let summary = RotationSimulator::new(config.simulation.clone()).run(&ledger)?;
        print_summary(&ledger, &summary)?;
        let elapsed = chrono::Utc::now() - started;
        println!("  elapsed:        {} ms", elapsed.num_milliseconds());
    }

    Ok(())
}

fn run_request_loop(ledger: &Ledger) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let request: api::Request = match serde_json::from_str(&buffer) {
            Ok(r) => r,
            Err(e) => {
                let err_json = serde_json::json!({
                    "status": 400,
                    "error": { "code": "BadRequest", "message": e.to_string() },
                });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        if matches!(request, api::Request::Quit) {
            break;
        }
        let response = api::handle(ledger, request);
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn print_summary(ledger: &Ledger, summary: &SimulationSummary) -> Result<()> {
    println!("=== ROTATION SUMMARY ===");
    println!("  group:          {} ({})", summary.group_name, summary.group_id);
    println!("  cycles:         {}", summary.cycles_completed);
    println!("  contributions:  {}", summary.contributions);
    println!("  airtime buys:   {}", summary.airtime_purchases);
    println!("  top-ups:        {}", summary.top_ups);
    println!("  paid out:       {}", summary.total_paid_out);
    println!("  txn records:    {}", ledger.store().txn_count()?);

    println!();
    println!("=== COLLECTION ORDER ===");
    for (i, account_id) in summary.collectors.iter().enumerate() {
        println!("  cycle {:>2}: {account_id}", i + 1);
    }

    println!();
    println!("=== BALANCES ===");
    for (account_id, balance) in &summary.final_balances {
        let report = ledger.reconcile(account_id)?;
        let mark = if report.is_balanced() { "ok" } else { "MISMATCH" };
        println!("  {account_id}: {balance:>8}  [{mark}]");
    }
    Ok(())
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    arg_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
