use anyhow::{bail, Result};
use listing_scout::types::{ProductQuery, ResolveResponse};
use listing_scout::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 4 {
        bail!(
            "usage: resolve-probe <category> <model_number> <brand> <factor>\n       \
             e.g. resolve-probe Television 43PFT6915 Philips 43"
        );
    }

    let query = ProductQuery {
        category: args[0].clone(),
        model_number: args[1].clone(),
        brand: args[2].clone(),
        factor: args[3].clone(),
    };

    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .connect_timeout(std::time::Duration::from_secs(10))
        .build()?;
    let state = AppState::new(http_client);

    let started = std::time::Instant::now();
    let (main_product, competitors) = state.resolver.resolve(&query).await;
    let elapsed = started.elapsed();

    let response = ResolveResponse {
        main_product,
        competitors,
    };
    println!("{}", serde_json::to_string_pretty(&response)?);
    eprintln!("resolved in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}
