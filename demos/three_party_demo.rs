//! Three-party demo: one domain, three strategy mixes
//!
//! Loads the party-planning domain from `demos/party/`, then runs the same
//! three profiles against each other with different strategies:
//! 1. Three hardheaded engines
//! 2. A selector against responsive and cooperative engines
//! 3. The mixed line-up under a wall-clock deadline
//!
//! Run with: cargo run --example three_party_demo

use bargain::cli::{render_report, BargainApp, StrategyChoice};
use bargain::config::Preset;
use bargain::host::Deadline;
use std::path::Path;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("warn,bargain=info")
        .init();

    let data = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/party");
    let app = BargainApp::load(
        &data.join("domain.json"),
        &[
            data.join("host.json"),
            data.join("budget.json"),
            data.join("guests.json"),
        ],
    )?;

    let line_ups: [(&str, Vec<StrategyChoice>, Deadline); 3] = [
        (
            "Hardheaded mirror",
            vec![StrategyChoice::Preset(Preset::Hardheaded); 3],
            Deadline::Rounds(180),
        ),
        (
            "Selector vs responsive and cooperative",
            vec![
                StrategyChoice::Selector,
                StrategyChoice::Preset(Preset::Responsive),
                StrategyChoice::Preset(Preset::Cooperative),
            ],
            Deadline::Rounds(180),
        ),
        (
            "Mixed line-up, 2s wall clock",
            vec![
                StrategyChoice::Preset(Preset::Cooperative),
                StrategyChoice::Selector,
                StrategyChoice::Preset(Preset::Hardheaded),
            ],
            Deadline::Duration(Duration::from_secs(2)),
        ),
    ];

    for (i, (title, strategies, deadline)) in line_ups.iter().enumerate() {
        println!("\n=== Scenario {}: {} ===", i + 1, title);
        let report = app.simulate(strategies, *deadline, Some(42)).await?;
        println!("{}", render_report(&report));
        println!("social welfare: {:.4}", report.social_welfare());
    }

    Ok(())
}
