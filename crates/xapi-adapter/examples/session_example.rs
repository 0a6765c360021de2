/*
[INPUT]:  Demo account credentials from XAPI_ACCOUNT_ID / XAPI_PASSWORD
[OUTPUT]: Server time, version and market-hours decision printed to stdout
[POS]:    Examples - scoped session and socket commands
[UPDATE]: When the session or socket API changes
*/

use xapi_adapter::*;

/// Example: scoped session against the demo venue
///
/// Logs in, asks a few read-only questions and logs out again, even on error.
#[tokio::main]
async fn main() {
    println!("=== xAPI Session Example ===\n");

    let (Ok(account_id), Ok(password)) = (
        std::env::var("XAPI_ACCOUNT_ID"),
        std::env::var("XAPI_PASSWORD"),
    ) else {
        eprintln!("Set XAPI_ACCOUNT_ID and XAPI_PASSWORD to a demo account");
        return;
    };

    let config = SessionConfig::new(Credentials::new(account_id, password)).with_safe_mode(true);
    let manager = SessionManager::new(config);
    let evaluator = MarketHoursEvaluator::default();

    let outcome: Result<()> = manager
        .scoped(|session| async move {
            println!("✓ Logged in, stream session {}", session.session().stream_session_id());

            let socket = session.socket();
            if let Some(version) = socket.get_version().await?.data() {
                println!("  API version: {}", version.version);
            }

            let Some(now) = socket.get_server_time().await?.data().cloned() else {
                println!("  Server time unavailable");
                return Ok(());
            };
            println!("  Server time: {} ({})", now.time_string, now.time);

            let hours = socket.get_trading_hours(&["GBPJPY"]).await?;
            if let Some(record) = hours.data().and_then(|records| records.first()) {
                let table = TradingHoursTable::from(record.clone());
                let decision = evaluator.evaluate("GBPJPY", now.time, &table);
                println!("  GBPJPY open: {} ({})", decision.open, decision.reason);
            }
            Ok(())
        })
        .await;

    match outcome {
        Ok(()) => println!("\n✓ Session example complete"),
        Err(e) => eprintln!("\nSession failed: {}", e),
    }
}
