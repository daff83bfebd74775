use tracing::debug;

use crate::error::QueryError;
use crate::location::ResultsLocation;

pub const MIN_QUERY_LENGTH: usize = 10;

/// Trimmed query, or why it is not eligible for submission.
pub fn validate_query(text: &str) -> Result<&str, QueryError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(QueryError::Empty);
    }
    let actual = trimmed.chars().count();
    if actual < MIN_QUERY_LENGTH {
        return Err(QueryError::TooShort {
            min: MIN_QUERY_LENGTH,
            actual,
        });
    }
    Ok(trimmed)
}

/// Receives `(trimmed_query, is_follow_up)`.
pub type SubmitCallback = Box<dyn FnMut(&str, bool) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// The caller's callback took the query; nothing else happened.
    Delegated,
    /// No callback: navigate to this location and wait for `location_changed`.
    Navigate(ResultsLocation),
}

/// Editable query field with its submit controls.
pub struct QueryInput {
    text: String,
    follow_up: bool,
    pending: bool,
    on_submit: Option<SubmitCallback>,
}

impl QueryInput {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            follow_up: false,
            pending: false,
            on_submit: None,
        }
    }

    pub fn with_initial_query(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Submissions are treated as follow-ups to the current location.
    pub fn follow_up(mut self, follow_up: bool) -> Self {
        self.follow_up = follow_up;
        self
    }

    pub fn on_submit(mut self, callback: impl FnMut(&str, bool) + Send + 'static) -> Self {
        self.on_submit = Some(Box::new(callback));
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn set_follow_up(&mut self, follow_up: bool) {
        self.follow_up = follow_up;
    }

    /// Loading affordance shown between self-navigation and the location change.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn can_submit(&self) -> bool {
        !self.pending && validate_query(&self.text).is_ok()
    }

    pub fn submit(&mut self, current: Option<&ResultsLocation>) -> Result<Submission, QueryError> {
        if self.pending {
            return Err(QueryError::Pending);
        }
        let query = validate_query(&self.text)?.to_string();

        if let Some(callback) = self.on_submit.as_mut() {
            callback(&query, self.follow_up);
            return Ok(Submission::Delegated);
        }

        let target = match current {
            Some(location) if self.follow_up => location.with_followup(&query),
            _ => ResultsLocation::new(query).ok_or(QueryError::Empty)?,
        };
        debug!(location = %target, "navigating to results");
        self.text.clear();
        self.pending = true;
        Ok(Submission::Navigate(target))
    }

    pub fn location_changed(&mut self) {
        self.pending = false;
    }
}

impl Default for QueryInput {
    fn default() -> Self {
        Self::new()
    }
}
