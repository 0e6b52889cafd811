//! Replay-file loading and execution.
//!
//! A replay file is a human-written snapshot of a ledger: stock
//! parameter rows plus chronological events, in decimal units.  JSON
//! carries both sections; CSV carries events only, with stocks created
//! from the engine defaults per symbol.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use wdk_analytics::Valuation;
use wdk_config::EngineDefaults;
use wdk_engine::{Engine, NewBuy, NewSell, StockReport};
use wdk_numeric::{Money, Percent, Price, Ratio, Shares};
use wdk_schemas::{Stock, StockId, Strategy, StrategyAssignment};
use wdk_store::{FixedFeed, LotStore, MemoryStore, StockStore};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ReplayFile {
    #[serde(default)]
    stocks: Vec<StockSpec>,
    events: Vec<EventSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StockSpec {
    symbol: String,
    swing_ratio_pct: Option<f64>,
    price_drop_pct: Option<f64>,
    swing_take_profit_pct: Option<f64>,
    hold_take_profit_pct: Option<f64>,
    commission_pct: Option<f64>,
    risk_budget: Option<f64>,
    /// Current price to feed into the mark-to-market views.
    current_price: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EventKindSpec {
    Buy {
        price: f64,
        investment: f64,
        /// "swing" | "hold" | "split_by_ratio" (default)
        assignment: Option<String>,
    },
    Sell {
        price: f64,
        quantity: f64,
        /// Which lot to draw down, by strategy and buy price.
        strategy: String,
        buy_price: f64,
    },
    Dividend {
        amount: f64,
    },
    LendingPayment {
        amount: f64,
    },
    StockSplit {
        multiplier: f64,
    },
}

#[derive(Debug, Deserialize)]
struct EventSpec {
    symbol: String,
    date: NaiveDate,
    #[serde(flatten)]
    kind: EventKindSpec,
}

/// One CSV row; unused columns stay empty.
#[derive(Debug, Deserialize)]
struct CsvRow {
    symbol: String,
    date: NaiveDate,
    kind: String,
    price: Option<f64>,
    investment: Option<f64>,
    assignment: Option<String>,
    quantity: Option<f64>,
    strategy: Option<String>,
    buy_price: Option<f64>,
    amount: Option<f64>,
    multiplier: Option<f64>,
}

pub fn run(path: &Path) -> Result<()> {
    let file = load(path)?;

    let store = MemoryStore::new();
    let feed = FixedFeed::new();
    let defaults = EngineDefaults::sane_defaults();

    let mut symbols: BTreeMap<String, StockId> = BTreeMap::new();
    for spec in &file.stocks {
        let stock = build_stock(spec, &defaults)?;
        symbols.insert(spec.symbol.clone(), stock.id);
        StockStore::create(&store, stock)
            .with_context(|| format!("create stock {}", spec.symbol))?;
        if let Some(px) = spec.current_price {
            feed.set_current(
                &spec.symbol,
                Price::from_f64(px)
                    .with_context(|| format!("current price for {}", spec.symbol))?,
            );
        }
    }
    // symbols seen only in events get default parameters
    for spec in &file.events {
        if !symbols.contains_key(&spec.symbol) {
            let stock = build_stock(
                &StockSpec {
                    symbol: spec.symbol.clone(),
                    swing_ratio_pct: None,
                    price_drop_pct: None,
                    swing_take_profit_pct: None,
                    hold_take_profit_pct: None,
                    commission_pct: None,
                    risk_budget: None,
                    current_price: None,
                },
                &defaults,
            )?;
            symbols.insert(spec.symbol.clone(), stock.id);
            StockStore::create(&store, stock)
                .with_context(|| format!("create stock {}", spec.symbol))?;
        }
    }

    let engine = Engine::new(&store, &store, &store, &feed, defaults);
    for (index, spec) in file.events.iter().enumerate() {
        apply_event(&engine, &store, &symbols, spec)
            .with_context(|| format!("event #{index} ({} {})", spec.symbol, spec.date))?;
    }

    let portfolio = engine.portfolio_report()?;
    for report in &portfolio.stocks {
        print_stock(report);
    }

    let totals = &portfolio.totals;
    println!("== portfolio ==");
    println!("  realized   {}", totals.realized_profit);
    println!("  unrealized {}", fmt_valuation(totals.unrealized_profit));
    println!("  income     {}", totals.income);
    println!("  combined   {}", fmt_valuation(totals.combined_with_income));
    println!("  tied up    {}", totals.tied_up);
    println!("  at risk    {}", totals.risk_investment);
    match totals.roic_pct {
        Some(pct) => println!("  roic       {pct:.2}%"),
        None => println!("  roic       n/a"),
    }
    Ok(())
}

fn load(path: &Path) -> Result<ReplayFile> {
    let text =
        fs::read_to_string(path).with_context(|| format!("read replay file {}", path.display()))?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
        }
        Some("csv") => {
            let mut events = Vec::new();
            let mut rdr = csv::Reader::from_reader(text.as_bytes());
            for row in rdr.deserialize::<CsvRow>() {
                let row = row.with_context(|| format!("parse {}", path.display()))?;
                events.push(row_to_event(row)?);
            }
            Ok(ReplayFile {
                stocks: Vec::new(),
                events,
            })
        }
        other => bail!("unsupported replay extension {other:?}"),
    }
}

fn row_to_event(row: CsvRow) -> Result<EventSpec> {
    let need = |value: Option<f64>, field: &str| {
        value.with_context(|| format!("csv {} event needs column {field}", row.kind))
    };
    let kind = match row.kind.as_str() {
        "buy" => EventKindSpec::Buy {
            price: need(row.price, "price")?,
            investment: need(row.investment, "investment")?,
            assignment: row.assignment.clone(),
        },
        "sell" => EventKindSpec::Sell {
            price: need(row.price, "price")?,
            quantity: need(row.quantity, "quantity")?,
            strategy: row
                .strategy
                .clone()
                .context("csv sell event needs column strategy")?,
            buy_price: need(row.buy_price, "buy_price")?,
        },
        "dividend" => EventKindSpec::Dividend {
            amount: need(row.amount, "amount")?,
        },
        "lending_payment" => EventKindSpec::LendingPayment {
            amount: need(row.amount, "amount")?,
        },
        "stock_split" => EventKindSpec::StockSplit {
            multiplier: need(row.multiplier, "multiplier")?,
        },
        other => bail!("unknown event kind {other:?}"),
    };
    Ok(EventSpec {
        symbol: row.symbol,
        date: row.date,
        kind,
    })
}

fn build_stock(spec: &StockSpec, defaults: &EngineDefaults) -> Result<Stock> {
    let pct = |value: Option<f64>, fallback: Percent, field: &str| match value {
        None => Ok(fallback),
        Some(x) => Percent::from_f64(x)
            .with_context(|| format!("stock {}: bad {field} {x}", spec.symbol)),
    };
    Ok(Stock {
        id: StockId::generate(),
        symbol: spec.symbol.clone(),
        swing_ratio_pct: pct(spec.swing_ratio_pct, defaults.swing_ratio_pct, "swing_ratio_pct")?,
        price_drop_pct: pct(spec.price_drop_pct, defaults.price_drop_pct, "price_drop_pct")?,
        swing_take_profit_pct: pct(
            spec.swing_take_profit_pct,
            defaults.swing_take_profit_pct,
            "swing_take_profit_pct",
        )?,
        hold_take_profit_pct: pct(
            spec.hold_take_profit_pct,
            defaults.hold_take_profit_pct,
            "hold_take_profit_pct",
        )?,
        commission_pct: pct(spec.commission_pct, defaults.commission_pct, "commission_pct")?,
        risk_budget: match spec.risk_budget {
            None => Money::ZERO,
            Some(x) => Money::from_f64(x)
                .with_context(|| format!("stock {}: bad risk_budget {x}", spec.symbol))?,
        },
        out_of_pocket: Money::ZERO,
        cash_balance: Money::ZERO,
        archived: false,
    })
}

fn apply_event(
    engine: &Engine<'_>,
    store: &MemoryStore,
    symbols: &BTreeMap<String, StockId>,
    spec: &EventSpec,
) -> Result<()> {
    let stock_id = *symbols
        .get(&spec.symbol)
        .with_context(|| format!("unknown symbol {}", spec.symbol))?;

    match &spec.kind {
        EventKindSpec::Buy {
            price,
            investment,
            assignment,
        } => {
            let assignment = match assignment.as_deref() {
                None | Some("split_by_ratio") => StrategyAssignment::SplitByRatio,
                Some("swing") => StrategyAssignment::Swing,
                Some("hold") => StrategyAssignment::Hold,
                Some(other) => bail!("unknown assignment {other:?}"),
            };
            engine.record_buy(
                stock_id,
                NewBuy {
                    date: spec.date,
                    price: Price::from_f64(*price).context("bad price")?,
                    investment: Money::from_f64(*investment).context("bad investment")?,
                    assignment,
                },
            )?;
        }
        EventKindSpec::Sell {
            price,
            quantity,
            strategy,
            buy_price,
        } => {
            let strategy = parse_strategy(strategy)?;
            let buy_price = Price::from_f64(*buy_price).context("bad buy_price")?;
            let lot = LotStore::list(store, stock_id)?
                .into_iter()
                .find(|lot| lot.strategy == strategy && lot.buy_price == buy_price)
                .with_context(|| {
                    format!("no {} lot at {buy_price} for {}", strategy.as_str(), spec.symbol)
                })?;
            engine.record_sell(
                stock_id,
                NewSell {
                    date: spec.date,
                    price: Price::from_f64(*price).context("bad price")?,
                    quantity: Shares::from_f64(*quantity).context("bad quantity")?,
                    lot_id: lot.id,
                },
            )?;
        }
        EventKindSpec::Dividend { amount } => {
            engine.record_dividend(
                stock_id,
                spec.date,
                Money::from_f64(*amount).context("bad amount")?,
            )?;
        }
        EventKindSpec::LendingPayment { amount } => {
            engine.record_lending_payment(
                stock_id,
                spec.date,
                Money::from_f64(*amount).context("bad amount")?,
            )?;
        }
        EventKindSpec::StockSplit { multiplier } => {
            engine.record_split(
                stock_id,
                spec.date,
                Ratio::from_f64(*multiplier).context("bad multiplier")?,
            )?;
        }
    }
    Ok(())
}

fn parse_strategy(s: &str) -> Result<Strategy> {
    match s {
        "swing" => Ok(Strategy::Swing),
        "hold" => Ok(Strategy::Hold),
        other => bail!("unknown strategy {other:?}"),
    }
}

fn fmt_valuation(v: Valuation<Money>) -> String {
    match v {
        Valuation::Available(m) => m.to_string(),
        Valuation::Unavailable => "n/a".to_string(),
    }
}

fn print_stock(report: &StockReport) {
    println!("== {} ==", report.symbol);
    match report.current_price {
        Some(px) => println!("  price      {px}"),
        None => println!("  price      n/a"),
    }
    for (name, view) in [("swing", &report.swing), ("hold", &report.hold)] {
        let unrealized = match view.unrealized {
            Valuation::Available(u) => u.profit.to_string(),
            Valuation::Unavailable => "n/a".to_string(),
        };
        println!(
            "  {name:<5} realized {} ({})  unrealized {unrealized}",
            view.realized.profit,
            view.realized
                .pct
                .map(|p| format!("{p:.2}%"))
                .unwrap_or_else(|| "n/a".to_string()),
        );
    }
    println!("  income     {}", report.income);
    println!("  tied up    {}", report.tied_up);
    println!("  at risk    {}", report.risk_investment);
    println!("  budget     used {} / available {}", report.budget_used, report.budget_available);
    if let Some(signals) = report.signals {
        println!(
            "  signals    dip={} swing_tp={} hold_tp={}",
            signals.drop_buy, signals.swing_take_profit, signals.hold_take_profit
        );
    }
    for note in &report.inconsistencies {
        println!("  ! {note}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn json_replay_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.json");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(
            br#"{
  "stocks": [
    {"symbol": "ACME", "swing_ratio_pct": 50.0, "swing_take_profit_pct": 10.0,
     "hold_take_profit_pct": 10.0, "risk_budget": 10000.0, "current_price": 120.0}
  ],
  "events": [
    {"symbol": "ACME", "date": "2024-01-02", "kind": "buy",
     "price": 100.0, "investment": 1000.0, "assignment": "split_by_ratio"},
    {"symbol": "ACME", "date": "2024-02-01", "kind": "sell",
     "price": 110.0, "quantity": 3.0, "strategy": "swing", "buy_price": 100.0}
  ]
}"#,
        )
        .unwrap();
        run(&path).unwrap();
    }

    #[test]
    fn csv_replay_parses_sparse_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.csv");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(
            b"symbol,date,kind,price,investment,assignment,quantity,strategy,buy_price,amount,multiplier\n\
              ACME,2024-01-02,buy,100.0,1000.0,split_by_ratio,,,,,\n\
              ACME,2024-03-01,dividend,,,,,,,12.5,\n\
              ACME,2024-06-01,stock_split,,,,,,,,2.0\n",
        )
        .unwrap();
        run(&path).unwrap();
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("replay.csv");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(
            b"symbol,date,kind,price,investment,assignment,quantity,strategy,buy_price,amount,multiplier\n\
              ACME,2024-01-02,margin_call,,,,,,,,\n",
        )
        .unwrap();
        assert!(run(&path).is_err());
    }
}
