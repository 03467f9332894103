// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use env_logger::Env;
use std::env;

// Use library instead of local modules
use payment_recovery::{AppConfig, LoadOutcome, LoadStatus, RecoveryState, Source};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let command = args.get(1).map(|s| s.as_str());

    // The TUI owns the terminal, so it stays quiet unless RUST_LOG asks otherwise
    let default_filter = if command.is_none() { "off" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    let config = AppConfig::load()?;

    match command {
        Some("summary") => run_summary(&config, args.get(2))?,
        Some("collect") => run_collect(&config, &args[2..])?,
        Some(other) => {
            eprintln!("❌ Unknown command: {}", other);
            print_usage();
            std::process::exit(2);
        }
        None => run_ui_mode(&config)?,
    }

    Ok(())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("   payment-recovery                                  (terminal UI)");
    eprintln!("   payment-recovery summary [source]");
    eprintln!("   payment-recovery collect <source> <index> <amount>");
}

fn parse_source(arg: Option<&String>, config: &AppConfig) -> Result<Source> {
    match arg {
        Some(name) => Ok(name.parse::<Source>()?),
        None => Ok(config.default_source),
    }
}

fn load_state(config: &AppConfig, source: Source) -> Result<RecoveryState> {
    println!("📂 Loading {} from {}...", source, config.data_dir.display());

    let mut state = RecoveryState::for_today(source);
    match state.load_from_dir(source, &config.data_dir) {
        LoadOutcome::Applied { records } => {
            println!("✓ Loaded {} records\n", records);
            Ok(state)
        }
        LoadOutcome::NoData | LoadOutcome::Stale => {
            let expected = match state.status() {
                LoadStatus::NoData { expected } => expected.clone(),
                _ => source.file_name().to_string(),
            };
            anyhow::bail!("No data found. Please ensure {} exists.", expected)
        }
    }
}

fn run_summary(config: &AppConfig, source_arg: Option<&String>) -> Result<()> {
    let source = parse_source(source_arg, config)?;
    let state = load_state(config, source)?;

    println!("📊 Dashboard Overview - {}", source);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    let json = serde_json::to_string_pretty(state.dashboard())
        .context("Failed to serialize dashboard")?;
    println!("{}", json);

    Ok(())
}

fn run_collect(config: &AppConfig, rest: &[String]) -> Result<()> {
    if rest.len() < 3 {
        print_usage();
        std::process::exit(2);
    }

    let source = parse_source(rest.first(), config)?;
    let index: usize = rest[1]
        .parse()
        .with_context(|| format!("Invalid record index: {}", rest[1]))?;

    let mut state = load_state(config, source)?;

    println!("💵 Recording collection of {} on record {}...", rest[2], index);
    let receipt = state.collect(index, &rest[2])?;

    println!("✓ Balance {:.2} → {:.2}", receipt.previous_balance, receipt.new_balance);
    println!("✓ Collected on this record: {:.2}", receipt.collected_total);
    if receipt.over_collected() {
        println!("⚠️  Collected more than the remaining balance");
    }

    let summary = &state.dashboard().summary;
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Total Records:   {}", summary.total_records);
    println!("Total Balance:   {:.2}", summary.total_balance);
    println!("Current Balance: {:.2}", summary.current_balance);
    println!("% Paid:          {:.1}%", summary.percentage_paid);
    println!("\n(collections are not saved; the export on disk is unchanged)");

    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: &AppConfig) -> Result<()> {
    println!("🖥️  Loading Payment Recovery UI...\n");

    let mut state = RecoveryState::for_today(config.default_source);
    state.load_from_dir(config.default_source, &config.data_dir);

    println!("Starting UI... (Press 'q' to quit)\n");

    let mut app = ui::App::new(state, config.data_dir.clone());
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: &AppConfig) -> Result<()> {
    eprintln!("❌ TUI mode not available!");
    eprintln!("   Rebuild with: cargo build --features tui");
    eprintln!("   Or use the API: cargo run --bin recovery-server --features server");
    std::process::exit(1);
}
