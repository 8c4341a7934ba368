use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use serde_json::json;

#[derive(Parser)]
#[command(name = "harness-load")]
#[command(about = "Fire concurrent requests at the DevOps practice server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Endpoint to exercise
    #[arg(short, long, value_enum, default_value_t = Endpoint::Random)]
    endpoint: Endpoint,

    /// Total number of requests
    #[arg(short = 'n', long, default_value_t = 100)]
    requests: usize,

    /// Concurrent workers
    #[arg(short, long, default_value_t = 10)]
    concurrency: usize,

    #[arg(short, long, default_value = "load test")]
    message: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Endpoint {
    Echo,
    Delay,
    Error,
    Random,
}

impl Endpoint {
    fn path(self) -> &'static str {
        match self {
            Endpoint::Echo => "/test/echo",
            Endpoint::Delay => "/test/delay",
            Endpoint::Error => "/test/error",
            Endpoint::Random => "/test/random",
        }
    }
}

#[derive(Default)]
struct Outcome {
    statuses: BTreeMap<String, usize>,
    latencies: Vec<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let url = format!("{}{}", cli.url.trim_end_matches('/'), cli.endpoint.path());
    let concurrency = cli.concurrency.max(1);

    let start = Instant::now();
    let mut tasks = Vec::with_capacity(concurrency);
    for worker in 0..concurrency {
        let count = cli.requests / concurrency + usize::from(worker < cli.requests % concurrency);
        let client = client.clone();
        let url = url.clone();
        let body = json!({ "message": cli.message, "data": { "worker": worker } });

        tasks.push(tokio::spawn(async move {
            let mut outcome = Outcome::default();
            for _ in 0..count {
                let req_start = Instant::now();
                let key = match client.post(&url).json(&body).send().await {
                    Ok(res) => res.status().as_u16().to_string(),
                    Err(_) => "transport error".to_string(),
                };
                outcome.latencies.push(req_start.elapsed());
                *outcome.statuses.entry(key).or_default() += 1;
            }
            outcome
        }));
    }

    let mut total = Outcome::default();
    for task in tasks {
        let outcome = task.await?;
        for (status, n) in outcome.statuses {
            *total.statuses.entry(status).or_default() += n;
        }
        total.latencies.extend(outcome.latencies);
    }
    let duration = start.elapsed();

    if total.latencies.is_empty() {
        eprintln!("No requests sent");
        return Ok(());
    }
    total.latencies.sort();
    let pct = |p: f64| total.latencies[((total.latencies.len() - 1) as f64 * p) as usize];

    println!("\n--- {} ---", url);
    println!("Total Requests: {}", total.latencies.len());
    println!("Concurrency:    {}", concurrency);
    println!("Total Duration: {:?}", duration);
    println!(
        "Requests/sec:   {:.2}",
        total.latencies.len() as f64 / duration.as_secs_f64()
    );
    println!("P50 Latency:    {:?}", pct(0.50));
    println!("P95 Latency:    {:?}", pct(0.95));
    println!("P99 Latency:    {:?}", pct(0.99));
    for (status, n) in &total.statuses {
        println!("Status {:<9} {}", format!("{}:", status), n);
    }

    Ok(())
}
