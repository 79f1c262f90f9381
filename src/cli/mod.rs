//! CLI module for bargain

pub mod app;
pub mod commands;

pub use app::{presets_json, read_json, render_report, threshold_curve, BargainApp, StrategyChoice};
pub use commands::{Cli, Commands};
