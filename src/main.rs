//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Demo entry point: loads configuration, installs logging, and replays a short scripted
// session against one matching engine, printing every trade and the final book as JSON.
//
// Run with: ORDERBOOK_INSTRUMENT=BTC-USD ORDERBOOK_LOG=debug cargo run
//--------------------------------------------------------------------------------------------------

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use limit_orderbook::{Config, MatchingEngine, Order, OrderModify, OrderType, Side, Trade};

fn print_trades(step: &str, trades: &[Trade]) -> anyhow::Result<()> {
    for trade in trades {
        println!("{step}: {}", serde_json::to_string(trade)?);
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = Config::try_from_env().context("invalid configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_filter).context("invalid log filter")?)
        .init();

    info!(
        instrument = %config.instrument,
        order_capacity = config.order_capacity,
        "configuration loaded"
    );

    let engine = MatchingEngine::from_config(&config);
    info!(instrument = engine.instrument(), "starting demo session");

    // Build both sides of the book.
    engine.add_order(Order::new(OrderType::GoodTillCancel, 1, Side::Buy, 99, 10));
    engine.add_order(Order::new(OrderType::GoodTillCancel, 2, Side::Buy, 100, 5));
    engine.add_order(Order::new(OrderType::GoodTillCancel, 3, Side::Sell, 102, 8));
    engine.add_order(Order::new(OrderType::GoodTillCancel, 4, Side::Sell, 103, 4));

    let trades = engine.add_order(Order::new(OrderType::GoodTillCancel, 5, Side::Sell, 99, 12));
    print_trades("sell 12@99", &trades)?;

    let trades = engine.add_order(Order::new(OrderType::FillAndKill, 6, Side::Buy, 102, 20));
    print_trades("fill-and-kill buy 20@102", &trades)?;

    let trades = engine.modify_order(OrderModify::new(4, Side::Sell, 99, 4));
    print_trades("modify 4 -> sell 4@99", &trades)?;

    engine.cancel_order(1);

    println!("resting orders: {}", engine.size());
    println!("levels: {}", serde_json::to_string_pretty(&engine.get_order_infos())?);
    Ok(())
}
