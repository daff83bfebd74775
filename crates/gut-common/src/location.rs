use std::fmt;

use url::form_urlencoded;

pub const RESULTS_PATH: &str = "/results";

/// The results view's navigation parameters: `query` and optional `followup`.
///
/// This is the single source of truth that drives re-fetching. A location
/// always carries a non-blank query; "no query" is represented by `None` at
/// the call sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultsLocation {
    query: String,
    followup: Option<String>,
}

impl ResultsLocation {
    pub fn new(query: impl Into<String>) -> Option<Self> {
        let query = query.into();
        if query.trim().is_empty() {
            return None;
        }
        Some(Self {
            query,
            followup: None,
        })
    }

    /// Parse `query`/`followup` from a parameter string such as
    /// `/results?query=kimchi&followup=...`, `?query=...` or `query=...`.
    pub fn parse(input: &str) -> Option<Self> {
        let params = input.split_once('?').map_or(input, |(_, rest)| rest);
        let mut query = None;
        let mut followup = None;
        for (key, value) in form_urlencoded::parse(params.as_bytes()) {
            match key.as_ref() {
                "query" if query.is_none() => query = Some(value.into_owned()),
                "followup" if followup.is_none() => followup = Some(value.into_owned()),
                _ => {}
            }
        }
        let location = Self::new(query?)?;
        Some(match followup {
            Some(text) => location.with_followup(&text),
            None => location,
        })
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn followup(&self) -> Option<&str> {
        self.followup.as_deref()
    }

    /// Same query with `followup` added or replaced. A blank follow-up clears it.
    pub fn with_followup(&self, followup: &str) -> Self {
        let followup = (!followup.trim().is_empty()).then(|| followup.to_string());
        Self {
            query: self.query.clone(),
            followup,
        }
    }

    /// The string sent upstream: the query, plus the follow-up joined by a space.
    pub fn combined_query(&self) -> String {
        match &self.followup {
            Some(followup) => format!("{} {}", self.query, followup),
            None => self.query.clone(),
        }
    }

    pub fn to_params(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        serializer.append_pair("query", &self.query);
        if let Some(followup) = &self.followup {
            serializer.append_pair("followup", followup);
        }
        serializer.finish()
    }
}

impl fmt::Display for ResultsLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{RESULTS_PATH}?{}", self.to_params())
    }
}
