mod app;
mod backend;
mod config;
mod error;
mod render;

use std::sync::Arc;

use clap::Parser;
use gut_common::analysis::AnalysisClient;
use gut_common::mock::MockAnalyzer;
use gut_common::results::{RequestState, ResultView};
use tracing::info;
use tracing_subscriber::EnvFilter;

use backend::Backend;
use config::{Cli, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting gut-insight");

    let config = Config::from_env()?.with_overrides(&cli)?;
    let backend = if config.use_mock_data {
        Backend::Mock(MockAnalyzer::from_env())
    } else {
        Backend::Remote(AnalysisClient::new(config.client.clone())?)
    };
    info!(
        backend = backend.name(),
        analyze_url = %config.client.analyze_url(),
        model = ?config.client.model,
        "analysis backend configured"
    );

    let view = ResultView::new(Arc::new(backend));
    let initial = cli.initial_location()?;

    if !cli.is_one_shot() {
        return app::run_interactive(&view, initial).await;
    }

    let Some(location) = initial else {
        info!("no query given, nothing to show");
        return Ok(());
    };
    eprintln!("{}", render::render_loading());
    match view.navigate(Some(location)).await {
        RequestState::Success(results) => {
            println!("{}", render::render_results(&results));
            Ok(())
        }
        RequestState::Error(err) => {
            println!("{}", render::render_error(&err, false));
            anyhow::bail!("analysis failed")
        }
        RequestState::Idle | RequestState::Loading => Ok(()),
    }
}
