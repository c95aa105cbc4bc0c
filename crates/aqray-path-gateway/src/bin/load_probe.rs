//! Load probe for a running gateway: concurrent walkers posting to /recommend.
//! Run with the gateway up: cargo run --bin load_probe [base_url]

use futures_util::future::join_all;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
const CONCURRENT_WALKERS: usize = 6;
const REQUESTS_PER_WALKER: usize = 3;

const TRIPS: &[(&str, &str)] = &[
    ("Union Station, Dallas, TX", "Dallas Farmers Market, Dallas, TX"),
    ("Klyde Warren Park, Dallas, TX", "Dallas Museum of Art, Dallas, TX"),
    ("Deep Ellum, Dallas, TX", "Fair Park, Dallas, TX"),
    ("Bishop Arts District, Dallas, TX", "Kessler Theater, Dallas, TX"),
    ("Reunion Tower, Dallas, TX", "Dealey Plaza, Dallas, TX"),
];

#[derive(Default)]
struct WalkerTally {
    ok: u32,
    failed: u32,
    ask_user: u32,
    latencies_ms: Vec<u64>,
}

async fn walk(client: Client, base_url: String, walker: usize) -> WalkerTally {
    let mut tally = WalkerTally::default();
    for r in 0..REQUESTS_PER_WALKER {
        let (start, destination) = TRIPS[(walker + r) % TRIPS.len()];
        let body = json!({
            "start": start,
            "destination": destination,
            "night_test": (walker + r) % 2 == 1,
        });

        let began = Instant::now();
        let res = client
            .post(format!("{}/recommend", base_url))
            .json(&body)
            .send()
            .await;
        let elapsed_ms = began.elapsed().as_millis() as u64;

        match res {
            Ok(resp) if resp.status().is_success() => {
                tally.ok += 1;
                tally.latencies_ms.push(elapsed_ms);
                if let Ok(v) = resp.json::<Value>().await {
                    if v["agent_response"]["decision"] == "ask_user" {
                        tally.ask_user += 1;
                    }
                }
            }
            Ok(resp) => {
                eprintln!("[LOAD PROBE] walker {} got {}", walker, resp.status());
                tally.failed += 1;
            }
            Err(e) => {
                eprintln!("[LOAD PROBE] walker {} transport error: {}", walker, e);
                tally.failed += 1;
            }
        }
    }
    tally
}

#[tokio::main]
async fn main() {
    let base_url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    println!(
        "[LOAD PROBE] {} walkers x {} requests against {}",
        CONCURRENT_WALKERS, REQUESTS_PER_WALKER, base_url
    );

    let client = match Client::builder().timeout(Duration::from_secs(60)).build() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[LOAD PROBE] cannot build client: {}", e);
            std::process::exit(1);
        }
    };

    let tallies = join_all(
        (0..CONCURRENT_WALKERS).map(|w| walk(client.clone(), base_url.clone(), w)),
    )
    .await;

    let ok: u32 = tallies.iter().map(|t| t.ok).sum();
    let failed: u32 = tallies.iter().map(|t| t.failed).sum();
    let ask_user: u32 = tallies.iter().map(|t| t.ask_user).sum();
    let mut latencies: Vec<u64> = tallies.into_iter().flat_map(|t| t.latencies_ms).collect();
    latencies.sort_unstable();

    let total = ok + failed;
    let success_rate = if total > 0 { ok as f64 / total as f64 * 100.0 } else { 0.0 };
    let avg_ms = if latencies.is_empty() {
        0.0
    } else {
        latencies.iter().sum::<u64>() as f64 / latencies.len() as f64
    };
    let p95_ms = latencies
        .get((latencies.len() * 95 / 100).min(latencies.len().saturating_sub(1)))
        .copied()
        .unwrap_or(0);

    println!(
        "[LOAD PROBE] Success: {:.1}% | Avg: {:.0}ms | p95: {}ms",
        success_rate, avg_ms, p95_ms
    );
    println!(
        "[LOAD PROBE] Total: {} | OK: {} | Failed: {} | ask_user decisions: {}",
        total, ok, failed, ask_user
    );
}
