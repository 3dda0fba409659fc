//! Order book snapshot printer.
//!
//! Builds a synthetic book (no persisted-state reader exists yet) and
//! prints it to the terminal. Useful for sanity-checking `OrderBook`'s
//! level/L1 derivation and for CI smoke tests of the display formatting.
//!
//! ## Usage
//!
//! ```bash
//! # Print top 5 levels
//! md-debug print-orderbook --levels 5
//!
//! # JSON output
//! md-debug print-orderbook --format json
//! ```

use anyhow::Result;
use clap::Parser;
use md_core::book::{Order, OrderBook};
use md_core::core::{InstrumentId, InstrumentKey, Ndp, SegmentId, Side, Value, VenueId};
use rust_decimal::Decimal;
use serde_json::json;

#[derive(Parser)]
#[command(name = "print-orderbook")]
#[command(about = "Print a synthetic order book snapshot", long_about = None)]
struct Args {
    /// Number of levels to display per side.
    #[arg(short, long, default_value = "5")]
    levels: usize,

    /// Output format (pretty, compact, json).
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let book = sample_book();

    match args.format.as_str() {
        "json" => print_json(&book, args.levels),
        "compact" => print_compact(&book, args.levels),
        _ => print_pretty(&book, args.levels),
    }

    Ok(())
}

fn price(book: &OrderBook, v: Value) -> Decimal {
    Decimal::new(v.raw(), book.px_ndp.get() as u32)
}

fn qty(book: &OrderBook, v: Value) -> Decimal {
    Decimal::new(v.raw(), book.qty_ndp.get() as u32)
}

fn print_pretty(book: &OrderBook, max_levels: usize) {
    println!();
    println!(
        "╔══════════════════════════════════════════════════════════╗"
    );
    println!(
        "║ {}.{}.{} order book                                      ║",
        book.key.venue.as_str(),
        book.key.segment.as_str(),
        book.key.id.as_str()
    );
    println!(
        "╚══════════════════════════════════════════════════════════╝"
    );

    println!("         ASKS             QTY");
    println!("    ══════════════════════════════");
    for level in book.asks.best_to_worst().take(max_levels).collect::<Vec<_>>().iter().rev() {
        println!("    {:>10}   {:>10}", price(book, level.price), qty(book, level.qty));
    }

    println!("    ──────────────────────────────");
    if let (Some(bid), Some(ask)) = (book.bids.best(), book.asks.best()) {
        let mid = (price(book, bid.price) + price(book, ask.price)) / Decimal::from(2);
        println!("     MID: {mid}");
    }
    println!("    ──────────────────────────────");

    println!("         BIDS             QTY");
    println!("    ══════════════════════════════");
    for level in book.bids.best_to_worst().take(max_levels) {
        println!("    {:>10}   {:>10}", price(book, level.price), qty(book, level.qty));
    }
    println!();
}

fn print_compact(book: &OrderBook, max_levels: usize) {
    for level in book.asks.best_to_worst().take(max_levels).collect::<Vec<_>>().iter().rev() {
        println!("ASK  {:>10}  {:>10}", price(book, level.price), qty(book, level.qty));
    }
    for level in book.bids.best_to_worst().take(max_levels) {
        println!("BID  {:>10}  {:>10}", price(book, level.price), qty(book, level.qty));
    }
}

fn print_json(book: &OrderBook, max_levels: usize) {
    let side_json = |levels: Vec<&md_core::book::PxLevel>| {
        levels
            .into_iter()
            .take(max_levels)
            .map(|l| json!({"price": price(book, l.price), "qty": qty(book, l.qty)}))
            .collect::<Vec<_>>()
    };

    let output = json!({
        "key": format!("{}.{}.{}", book.key.venue.as_str(), book.key.segment.as_str(), book.key.id.as_str()),
        "bids": side_json(book.bids.best_to_worst().collect()),
        "asks": side_json(book.asks.best_to_worst().collect()),
    });

    println!("{}", serde_json::to_string_pretty(&output).unwrap());
}

/// A small synthetic book: 10 levels per side around a 100.00 mid.
fn sample_book() -> OrderBook {
    let key = InstrumentKey::new(VenueId::new("XNAS"), SegmentId::new("EQ"), InstrumentId::new("SAMPLE"));
    let ndp = Ndp::new(2).unwrap();
    let mut book = OrderBook::new(key, ndp, ndp);

    for i in 0..10i64 {
        let bid_price = Value::new(10_000 - (i + 1) * 5);
        let ask_price = Value::new(10_005 + (i + 1) * 5);
        let qty = Value::new(100 + i * 17);
        book.add_order(Order::new(format!("B{i}"), Side::Buy, bid_price, qty, 0));
        book.add_order(Order::new(format!("A{i}"), Side::Sell, ask_price, qty, 0));
    }

    book
}
