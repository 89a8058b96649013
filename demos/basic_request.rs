//! Fetches every device of a Prime Infrastructure server, twice.
//!
//! The second request is served from the client's cache.
//!
//! Run with:
//! `PRIME_HOST=prime.example.com PRIME_USER=admin PRIME_PASSWORD=secret cargo run --example basic_request`

use piapi::{Client, Error, RequestOptions};
use serde_json::json;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("piapi=debug,basic_request=info")
        .init();

    let host = std::env::var("PRIME_HOST")?;
    let client = Client::builder()
        .host(&host)?
        .credentials(std::env::var("PRIME_USER")?, std::env::var("PRIME_PASSWORD")?)
        .verify_tls(std::env::var("PRIME_INSECURE").is_err())
        .build()?;

    println!("=== Resources ===");
    println!("Data resources: {:?}", client.data_resources().await?);
    println!("Action resources: {:?}", client.action_resources().await?);
    println!();

    println!("=== Paged request ===");
    let options = RequestOptions::builder()
        .paging_size(500)
        .concurrent_requests(3)
        .hold(Duration::from_secs(1))
        .build();

    for attempt in 1..=2 {
        let start = Instant::now();
        match client.request("Devices", &json!({}), &options).await {
            Ok(devices) => println!(
                "Attempt {}: {} devices in {:?}",
                attempt,
                devices["queryResponse"]["@count"],
                start.elapsed()
            ),
            Err(Error::PageFailed { page, source }) => {
                eprintln!("Page {} failed: {}", page, source);
                if let Some(reason) = source.reason() {
                    eprintln!("  {}", reason);
                }
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
