/*
[INPUT]:  Demo account credentials from XAPI_ACCOUNT_ID / XAPI_PASSWORD
[OUTPUT]: A handful of live candle and keep-alive pushes printed to stdout
[POS]:    Examples - stream subscriptions
[UPDATE]: When the stream API changes
*/

use futures_util::StreamExt;
use xapi_adapter::*;

const PUSH_LIMIT: usize = 5;

/// Example: subscribe to candles and keep-alive, read a few pushes, unsubscribe
#[tokio::main]
async fn main() {
    println!("=== xAPI Stream Example ===\n");

    let (Ok(account_id), Ok(password)) = (
        std::env::var("XAPI_ACCOUNT_ID"),
        std::env::var("XAPI_PASSWORD"),
    ) else {
        eprintln!("Set XAPI_ACCOUNT_ID and XAPI_PASSWORD to a demo account");
        return;
    };

    let manager = SessionManager::new(SessionConfig::new(Credentials::new(account_id, password)));
    let outcome: Result<()> = manager
        .scoped(|session| async move {
            let stream = session.stream();
            stream.subscribe(&Subscription::KeepAlive).await?;
            stream.subscribe(&Subscription::candles("EURUSD")).await?;
            println!("✓ Subscribed: {:?}", stream.active_subscriptions());

            let pushes = stream.listen().take(PUSH_LIMIT);
            futures_util::pin_mut!(pushes);
            while let Some(push) = pushes.next().await {
                match push?.event()? {
                    StreamEvent::Candle(candle) => println!(
                        "  candle {} {} open={} close={}",
                        candle.symbol, candle.ctm_string, candle.open, candle.close
                    ),
                    StreamEvent::KeepAlive(alive) => println!("  keep-alive {}", alive.timestamp),
                    other => println!("  {:?}", other),
                }
            }

            stream
                .unsubscribe(&SubscriptionKey::symbol(Topic::Candles, "EURUSD"))
                .await?;
            Ok(())
        })
        .await;

    match outcome {
        Ok(()) => println!("\n✓ Stream example complete"),
        Err(e) => eprintln!("\nStream failed: {}", e),
    }
}
