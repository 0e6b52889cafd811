use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use wdk_numeric::{Percent, Price};
use wdk_signals::{drop_buy_target, take_profit_target};

mod replay;

#[derive(Parser)]
#[command(name = "wdk")]
#[command(about = "WalletDesk ledger inspection CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a JSON or CSV event file through the engine and print
    /// per-stock and portfolio reports.
    Replay {
        /// Path to the replay file (.json or .csv)
        #[arg(long)]
        events: PathBuf,
    },

    /// Print the commission-adjusted target prices for one buy price.
    Targets {
        #[arg(long)]
        buy_price: f64,
        /// Price-drop percent for the buy-the-dip target
        #[arg(long)]
        pdp: f64,
        /// Swing take-profit percent
        #[arg(long)]
        stp: f64,
        /// Hold take-profit percent
        #[arg(long)]
        htp: f64,
        /// Commission percent
        #[arg(long, default_value_t = 0.0)]
        commission: f64,
    },

    /// Compute the layered engine-defaults hash + print the effective
    /// config.
    ConfigHash {
        /// Paths in merge order (base first)
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Replay { events } => replay::run(&events),
        Commands::Targets {
            buy_price,
            pdp,
            stp,
            htp,
            commission,
        } => print_targets(buy_price, pdp, stp, htp, commission),
        Commands::ConfigHash { paths } => {
            let defaults = wdk_config::load_layered(&paths)?;
            println!("config_hash {}", wdk_config::config_hash(&defaults));
            println!("swing_ratio_pct        {}", defaults.swing_ratio_pct);
            println!("price_drop_pct         {}", defaults.price_drop_pct);
            println!("swing_take_profit_pct  {}", defaults.swing_take_profit_pct);
            println!("hold_take_profit_pct   {}", defaults.hold_take_profit_pct);
            println!("commission_pct         {}", defaults.commission_pct);
            println!("event_page_size        {}", defaults.event_page_size);
            Ok(())
        }
    }
}

fn print_targets(buy_price: f64, pdp: f64, stp: f64, htp: f64, commission: f64) -> Result<()> {
    let price = Price::from_f64(buy_price).context("buy price must be a finite number")?;
    let pdp = Percent::from_f64(pdp).context("pdp must be a finite percent")?;
    let stp = Percent::from_f64(stp).context("stp must be a finite percent")?;
    let htp = Percent::from_f64(htp).context("htp must be a finite percent")?;
    let commission = Percent::from_f64(commission).context("commission must be a finite percent")?;

    println!("drop_buy_target         {}", drop_buy_target(price, pdp, commission));
    println!("take_profit_target      {}", take_profit_target(price, stp, commission));
    println!("hold_take_profit_target {}", take_profit_target(price, htp, commission));
    Ok(())
}
