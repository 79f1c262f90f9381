//! Bargain CLI binary

use anyhow::{Context, Result};
use bargain::cli::{
    presets_json, read_json, render_report, threshold_curve, BargainApp, Cli, Commands,
    StrategyChoice,
};
use bargain::config::{NegotiatorConfig, Preset};
use bargain::host::Deadline;
use bargain::negotiation::ThresholdContext;
use clap::Parser;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate {
            domain,
            profiles,
            strategies,
            config,
            rounds,
            deadline_ms,
            seed,
            report,
        } => {
            let strategies = strategies
                .iter()
                .map(|s| s.parse::<StrategyChoice>())
                .collect::<Result<Vec<_>>>()?;

            let mut app = BargainApp::load(&domain, &profiles)?;
            if let Some(path) = config {
                let custom: NegotiatorConfig = read_json(&path)?;
                app = app.with_custom_config(custom);
            }

            let deadline = match deadline_ms {
                Some(ms) => Deadline::Duration(Duration::from_millis(ms)),
                None => Deadline::Rounds(rounds),
            };

            tracing::info!(
                "Starting session on {} with {} parties",
                app.domain().name(),
                app.party_count()
            );
            let session_report = app.simulate(&strategies, deadline, seed).await?;
            println!("{}", render_report(&session_report));

            if let Some(path) = report {
                std::fs::write(&path, session_report.to_json()?)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!("Report written to {}", path.display());
            }
        }

        Commands::Curve {
            strategy,
            config,
            steps,
            min_utility,
            max_utility,
            opponent_floor,
        } => {
            let config: NegotiatorConfig = match config {
                Some(path) => read_json(&path)?,
                None => strategy.parse::<Preset>()?.config(),
            };
            let ctx = ThresholdContext::new(min_utility, max_utility)
                .with_opponent_floor(opponent_floor);

            for (time, threshold) in threshold_curve(&config, steps, &ctx) {
                println!("{:.3}\t{:.4}", time, threshold);
            }
        }

        Commands::Presets => {
            println!("{}", presets_json()?);
        }
    }

    Ok(())
}
