use clap::Parser;
use gut_common::analysis::AnalysisClientConfig;
use gut_common::location::ResultsLocation;

use crate::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "gut-insight",
    version,
    about = "Ask how a food or ingredient affects gut health"
)]
pub struct Cli {
    /// Query to analyze. Without one, an interactive session starts.
    pub query: Option<String>,

    /// Follow-up appended to the query before it is sent.
    #[arg(long, requires = "query")]
    pub followup: Option<String>,

    /// Open a results location such as "/results?query=kimchi&followup=...".
    #[arg(long, conflicts_with_all = ["query", "followup"])]
    pub location: Option<String>,

    /// Keep the session open after the initial query.
    #[arg(long, short)]
    pub interactive: bool,

    /// Analysis service base URL (overrides GUT_API_URL).
    #[arg(long)]
    pub api_url: Option<String>,

    /// Model name sent with each request (overrides GUT_API_MODEL).
    #[arg(long)]
    pub model: Option<String>,

    /// Serve canned data instead of calling the service.
    #[arg(long)]
    pub mock: bool,
}

impl Cli {
    /// Location named on the command line, if any. `Ok(None)` means nothing to show.
    pub fn initial_location(&self) -> Result<Option<ResultsLocation>, AppError> {
        if let Some(raw) = &self.location {
            if !raw.contains("query=") {
                return Err(AppError::Location(format!("missing query parameter in {raw:?}")));
            }
            return Ok(ResultsLocation::parse(raw));
        }
        let location = self.query.as_deref().and_then(ResultsLocation::new);
        Ok(match (location, self.followup.as_deref()) {
            (Some(location), Some(followup)) => Some(location.with_followup(followup)),
            (location, _) => location,
        })
    }

    pub fn is_one_shot(&self) -> bool {
        !self.interactive && (self.query.is_some() || self.location.is_some())
    }
}

/// Runtime configuration: environment first, command-line flags on top.
#[derive(Debug, Clone)]
pub struct Config {
    pub client: AnalysisClientConfig,
    pub use_mock_data: bool,
}

impl Config {
    /// Optional:
    /// - `GUT_USE_MOCK_DATA` ("1"/"true"/"yes" or "0"/"false"/"no", default: false)
    /// - everything read by `AnalysisClientConfig::from_env`
    pub fn from_env() -> Result<Self, AppError> {
        let use_mock_data = match std::env::var("GUT_USE_MOCK_DATA") {
            Ok(raw) => parse_flag(&raw).ok_or_else(|| {
                AppError::Config(format!("GUT_USE_MOCK_DATA must be a boolean, got {raw:?}"))
            })?,
            Err(_) => false,
        };

        Ok(Self {
            client: AnalysisClientConfig::from_env(),
            use_mock_data,
        })
    }

    pub fn with_overrides(self, cli: &Cli) -> Result<Self, AppError> {
        let mut client = match &cli.api_url {
            Some(url) => AnalysisClientConfig {
                model: self.client.model.clone(),
                max_error_body_bytes: self.client.max_error_body_bytes,
                ..AnalysisClientConfig::new(url)
            },
            None => self.client,
        };
        if let Some(model) = &cli.model {
            client.model = Some(model.clone());
        }

        if !(client.base_url.starts_with("http://") || client.base_url.starts_with("https://")) {
            return Err(AppError::Config(format!(
                "analysis service URL must start with http:// or https://, got {:?}",
                client.base_url
            )));
        }

        Ok(Self {
            client,
            use_mock_data: self.use_mock_data || cli.mock,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
