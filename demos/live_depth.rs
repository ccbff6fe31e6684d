//! Live depth view - streams an order book and prints both sides
//!
//! Usage:
//!   ORDERBOOK_WS_URL=wss://host/connection/websocket ORDERBOOK_TOKEN=jwt cargo run --example live_depth
//!
//! Optional:
//!   ORDERBOOK_SYMBOL=BTC-USD  # Symbol to follow (default: BTC-USD)
//!   ORDERBOOK_DEPTH=11        # Levels per side (default: 11)

use std::time::Duration;

use orderbook_sync::types::ConnectionState;
use orderbook_sync::{Config, DisplayRow, OrderbookSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("orderbook_sync=info".parse()?),
        )
        .init();

    let endpoint = std::env::var("ORDERBOOK_WS_URL")
        .map_err(|_| "Set ORDERBOOK_WS_URL environment variable")?;
    let symbol = std::env::var("ORDERBOOK_SYMBOL").unwrap_or_else(|_| "BTC-USD".to_string());
    let depth = match std::env::var("ORDERBOOK_DEPTH") {
        Ok(depth) => depth.parse()?,
        Err(_) => 11,
    };

    let mut config = Config::new(endpoint, &symbol).with_depth(depth);
    if let Ok(token) = std::env::var("ORDERBOOK_TOKEN") {
        config = config.with_token(token);
    }

    println!("=== Live depth: {} ===\n", symbol);

    let session = OrderbookSession::centrifugo(config)?;
    let book = session.handle();
    let task = tokio::spawn(session.run(async {
        let _ = tokio::signal::ctrl_c().await;
    }));

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    while !task.is_finished() {
        ticker.tick().await;
        let view = book.view();

        println!("\n[{}] sequence {}", view.connection, view.sequence);
        if view.connection != ConnectionState::Connected {
            continue;
        }

        println!("{:>14} {:>14} {:>14} {:>7}", "PRICE", "SIZE", "TOTAL", "DEPTH");
        for row in &view.asks {
            print_row(row, &view.changed_prices);
        }
        println!("{:-^52}", " spread ");
        for row in &view.bids {
            print_row(row, &view.changed_prices);
        }
    }

    task.await?;
    println!("\nSession stopped");
    Ok(())
}

fn print_row(row: &DisplayRow, changed: &[String]) {
    let marker = if changed.contains(&row.price) { "*" } else { " " };
    println!(
        "{}{:>13} {:>14} {:>14} {:>6.1}% {}",
        marker, row.price, row.size, row.total, row.percentage, row.side
    );
}
