use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisError, Analyzer};
use crate::citation::{describe_citations, unresolved_markers, Citation};
use crate::location::ResultsLocation;
use crate::model::{AnalysisResponse, AnalysisResult, AnalyzeRequest, ValidationIssue};

pub const DEFAULT_ERROR_MESSAGE: &str = "Failed to analyze query. Please try again.";

/// A successful analysis, ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisView {
    /// Always the original query, even when a follow-up was sent.
    pub query: String,
    pub followup: Option<String>,
    pub analysis: AnalysisResult,
    pub citations: Vec<Citation>,
}

impl AnalysisView {
    pub fn new(location: &ResultsLocation, response: AnalysisResponse) -> Self {
        let analysis = response.analysis;
        let texts = std::iter::once(analysis.summary.as_str())
            .chain(analysis.impacts.positive_impacts.iter().map(String::as_str))
            .chain(analysis.impacts.potential_concerns.iter().map(String::as_str));
        let unresolved = unresolved_markers(texts, response.citations.len());
        if !unresolved.is_empty() {
            debug!(?unresolved, "analysis references citations that were not returned");
        }

        Self {
            query: location.query().to_string(),
            followup: location.followup().map(str::to_string),
            citations: describe_citations(&response.citations),
            analysis,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorView {
    /// Field-level problems reported by the service.
    Validation(Vec<ValidationIssue>),
    Generic(String),
}

impl ErrorView {
    pub fn from_error(err: &AnalysisError) -> Self {
        match err {
            AnalysisError::Validation(issues) => ErrorView::Validation(issues.clone()),
            other => ErrorView::Generic(
                other
                    .upstream_message()
                    .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            ),
        }
    }

    /// Lines to display, in order.
    pub fn lines(&self) -> Vec<String> {
        match self {
            ErrorView::Validation(issues) => issues
                .iter()
                .flat_map(|issue| std::iter::once(issue.msg.clone()).chain(issue.min_length_hint()))
                .collect(),
            ErrorView::Generic(message) => vec![message.clone()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestState {
    #[default]
    Idle,
    Loading,
    Success(AnalysisView),
    Error(ErrorView),
}

/// Drives the results view: one request per entry into `Loading`, with the
/// outcome published on a watch channel.
///
/// Every entry bumps a generation counter. A response that comes back after a
/// newer entry started is dropped instead of overwriting the newer state.
pub struct ResultView<A> {
    analyzer: Arc<A>,
    location: Mutex<Option<ResultsLocation>>,
    generation: AtomicU64,
    state: watch::Sender<RequestState>,
}

impl<A: Analyzer> ResultView<A> {
    pub fn new(analyzer: Arc<A>) -> Self {
        let (state, _) = watch::channel(RequestState::Idle);
        Self {
            analyzer,
            location: Mutex::new(None),
            generation: AtomicU64::new(0),
            state,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<RequestState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> RequestState {
        self.state.borrow().clone()
    }

    pub fn location(&self) -> Option<ResultsLocation> {
        self.location
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Enter the view for `location`. `None` means nothing to show: the view
    /// goes idle and no request is made.
    pub async fn navigate(&self, location: Option<ResultsLocation>) -> RequestState {
        *self.location.lock().unwrap_or_else(PoisonError::into_inner) = location.clone();
        match location {
            Some(location) => self.load(location).await,
            None => {
                self.state.send_modify(|state| {
                    self.generation.fetch_add(1, Ordering::SeqCst);
                    *state = RequestState::Idle;
                });
                RequestState::Idle
            }
        }
    }

    /// Re-issue the request for the current location.
    pub async fn retry(&self) -> RequestState {
        match self.location() {
            Some(location) => self.load(location).await,
            None => self.state(),
        }
    }

    /// Submission handler for the query input. A follow-up keeps the original
    /// query; a new query drops any follow-up.
    pub async fn submit(&self, text: &str, is_follow_up: bool) -> RequestState {
        let next = match self.location() {
            Some(current) if is_follow_up => Some(current.with_followup(text)),
            _ => ResultsLocation::new(text),
        };
        self.navigate(next).await
    }

    async fn load(&self, location: ResultsLocation) -> RequestState {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = RequestState::Loading;
        });

        let request = AnalyzeRequest {
            query: location.combined_query(),
            model: None,
        };
        info!(
            query = %location.query(),
            followup = ?location.followup(),
            generation,
            "analyzing query"
        );

        let next = match self.analyzer.analyze(request).await {
            Ok(response) => RequestState::Success(AnalysisView::new(&location, response)),
            Err(e) => {
                warn!(error = %e, generation, "analysis failed");
                RequestState::Error(ErrorView::from_error(&e))
            }
        };

        let applied = self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *state = next.clone();
            true
        });
        if applied {
            next
        } else {
            debug!(generation, "discarding stale analysis response");
            self.state()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::time::Duration;

    use reqwest::StatusCode;

    use super::*;
    use crate::error::DecodeError;
    use crate::model::Impacts;

    type Reply = (Duration, Result<AnalysisResponse, AnalysisError>);

    struct ScriptedAnalyzer {
        seen: Mutex<Vec<String>>,
        script: Mutex<VecDeque<Reply>>,
    }

    impl ScriptedAnalyzer {
        fn replying(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                script: Mutex::new(replies.into_iter().collect()),
            })
        }

        fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Analyzer for ScriptedAnalyzer {
        fn analyze(
            &self,
            request: AnalyzeRequest,
        ) -> impl Future<Output = Result<AnalysisResponse, AnalysisError>> + Send {
            self.seen.lock().unwrap().push(request.query);
            let (delay, reply) = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected analysis request");
            async move {
                tokio::time::sleep(delay).await;
                reply
            }
        }
    }

    fn response(summary: &str, citations: &[&str]) -> AnalysisResponse {
        AnalysisResponse {
            analysis: AnalysisResult {
                summary: summary.to_string(),
                impacts: Impacts {
                    positive_impacts: vec!["A[1]".to_string()],
                    potential_concerns: vec![],
                },
                mechanisms: "M".to_string(),
            },
            citations: citations.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn ok(summary: &str) -> Reply {
        (
            Duration::ZERO,
            Ok(response(summary, &["https://www.pubmed.ncbi.nlm.nih.gov/123/"])),
        )
    }

    fn success(state: &RequestState) -> &AnalysisView {
        match state {
            RequestState::Success(view) => view,
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_query_means_no_request() {
        let analyzer = ScriptedAnalyzer::replying([]);
        let view = ResultView::new(Arc::clone(&analyzer));
        assert_eq!(view.navigate(None).await, RequestState::Idle);
        assert_eq!(view.retry().await, RequestState::Idle);
        assert!(analyzer.seen().is_empty());
    }

    #[tokio::test]
    async fn test_success_builds_view() {
        let analyzer = ScriptedAnalyzer::replying([ok("S")]);
        let view = ResultView::new(Arc::clone(&analyzer));
        let state = view.navigate(ResultsLocation::new("aspartame related info")).await;

        let shown = success(&state);
        assert_eq!(shown.query, "aspartame related info");
        assert_eq!(shown.followup, None);
        assert_eq!(shown.analysis.summary, "S");
        assert_eq!(shown.citations.len(), 1);
        assert_eq!(shown.citations[0].domain.as_deref(), Some("pubmed.ncbi.nlm.nih.gov"));
        assert_eq!(analyzer.seen(), vec!["aspartame related info".to_string()]);
        assert_eq!(view.state(), state);
    }

    #[tokio::test]
    async fn test_follow_up_refetches_with_combined_query() {
        let analyzer = ScriptedAnalyzer::replying([ok("first"), ok("second")]);
        let view = ResultView::new(Arc::clone(&analyzer));
        view.navigate(ResultsLocation::new("fiber")).await;

        let state = view.submit("is this also true for kids", true).await;
        let shown = success(&state);
        assert_eq!(shown.query, "fiber");
        assert_eq!(shown.followup.as_deref(), Some("is this also true for kids"));
        assert_eq!(shown.analysis.summary, "second");
        assert_eq!(
            analyzer.seen(),
            vec!["fiber".to_string(), "fiber is this also true for kids".to_string()]
        );

        let location = view.location().unwrap();
        assert_eq!(location.query(), "fiber");
        assert_eq!(location.followup(), Some("is this also true for kids"));
    }

    #[tokio::test]
    async fn test_new_query_drops_follow_up() {
        let analyzer = ScriptedAnalyzer::replying([ok("first"), ok("second")]);
        let view = ResultView::new(Arc::clone(&analyzer));
        view.navigate(ResultsLocation::new("kimchi").map(|l| l.with_followup("and kids")))
            .await;
        view.submit("aspartame related info", false).await;

        assert_eq!(
            analyzer.seen(),
            vec!["kimchi and kids".to_string(), "aspartame related info".to_string()]
        );
        assert_eq!(view.location().unwrap().followup(), None);
    }

    #[tokio::test]
    async fn test_identical_parameters_are_not_deduplicated() {
        let analyzer = ScriptedAnalyzer::replying([ok("one"), ok("two")]);
        let view = ResultView::new(Arc::clone(&analyzer));
        view.navigate(ResultsLocation::new("fiber")).await;
        let state = view.navigate(ResultsLocation::new("fiber")).await;
        assert_eq!(success(&state).analysis.summary, "two");
        assert_eq!(analyzer.seen().len(), 2);
    }

    #[tokio::test]
    async fn test_validation_error_lines() {
        let issue: ValidationIssue = serde_json::from_value(serde_json::json!({
            "type": "string_too_short",
            "loc": ["body", "query"],
            "msg": "String should have at least 10 characters",
            "input": "hi",
            "ctx": { "min_length": 10 }
        }))
        .unwrap();
        let analyzer = ScriptedAnalyzer::replying([(
            Duration::ZERO,
            Err(AnalysisError::Validation(vec![issue])),
        )]);
        let view = ResultView::new(analyzer);

        let RequestState::Error(err) = view.navigate(ResultsLocation::new("hi")).await else {
            panic!("expected error");
        };
        assert_eq!(
            err.lines(),
            vec![
                "String should have at least 10 characters".to_string(),
                "Minimum length required: 10 characters".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_generic_errors_use_upstream_message_or_default() {
        let analyzer = ScriptedAnalyzer::replying([
            (
                Duration::ZERO,
                Err(AnalysisError::Upstream {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    message: "model overloaded".to_string(),
                }),
            ),
            (
                Duration::ZERO,
                Err(AnalysisError::Decode(DecodeError::MissingAnalysis)),
            ),
        ]);
        let view = ResultView::new(analyzer);

        let state = view.navigate(ResultsLocation::new("fiber and gut bacteria")).await;
        assert_eq!(
            state,
            RequestState::Error(ErrorView::Generic("model overloaded".to_string()))
        );
        let state = view.retry().await;
        assert_eq!(
            state,
            RequestState::Error(ErrorView::Generic(DEFAULT_ERROR_MESSAGE.to_string()))
        );
    }

    #[tokio::test]
    async fn test_retry_reissues_same_request() {
        let analyzer = ScriptedAnalyzer::replying([
            (
                Duration::ZERO,
                Err(AnalysisError::Decode(DecodeError::MissingAnalysis)),
            ),
            ok("recovered"),
        ]);
        let view = ResultView::new(Arc::clone(&analyzer));
        let location = ResultsLocation::new("kimchi").map(|l| l.with_followup("for kids too"));
        assert!(matches!(view.navigate(location).await, RequestState::Error(_)));

        let state = view.retry().await;
        assert_eq!(success(&state).analysis.summary, "recovered");
        assert_eq!(
            analyzer.seen(),
            vec!["kimchi for kids too".to_string(), "kimchi for kids too".to_string()]
        );
    }

    #[tokio::test]
    async fn test_loading_replaces_previous_result() {
        let analyzer = ScriptedAnalyzer::replying([
            ok("first"),
            (Duration::from_millis(50), Ok(response("second", &[]))),
        ]);
        let view = ResultView::new(analyzer);
        view.navigate(ResultsLocation::new("fiber")).await;

        let mut rx = view.subscribe();
        let (state, observed) = tokio::join!(view.retry(), async {
            rx.changed().await.unwrap();
            rx.borrow_and_update().clone()
        });
        assert_eq!(observed, RequestState::Loading);
        assert_eq!(success(&state).analysis.summary, "second");
    }

    #[tokio::test]
    async fn test_stale_response_does_not_overwrite_newer_state() {
        let analyzer = ScriptedAnalyzer::replying([
            (Duration::from_millis(100), Ok(response("stale", &[]))),
            (Duration::ZERO, Ok(response("fresh", &[]))),
        ]);
        let view = ResultView::new(Arc::clone(&analyzer));

        let (first, second) = tokio::join!(
            view.navigate(ResultsLocation::new("fiber")),
            view.submit("what about long term effects", true),
        );

        assert_eq!(success(&second).analysis.summary, "fresh");
        assert_eq!(success(&first).analysis.summary, "fresh");
        assert_eq!(success(&view.state()).analysis.summary, "fresh");
        assert_eq!(
            analyzer.seen(),
            vec!["fiber".to_string(), "fiber what about long term effects".to_string()]
        );
    }

    #[tokio::test]
    async fn test_navigating_away_discards_in_flight_response() {
        let analyzer = ScriptedAnalyzer::replying([(
            Duration::from_millis(50),
            Ok(response("late", &[])),
        )]);
        let view = ResultView::new(analyzer);
        let (_, idle) = tokio::join!(view.navigate(ResultsLocation::new("fiber")), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            view.navigate(None).await
        });
        assert_eq!(idle, RequestState::Idle);
        assert_eq!(view.state(), RequestState::Idle);
    }

    #[test]
    fn test_malformed_citation_does_not_fail_view() {
        let location = ResultsLocation::new("fiber").unwrap();
        let view = AnalysisView::new(
            &location,
            response("S", &["https://www.mdpi.com/2072-6643/17/5/859", "not a url"]),
        );
        assert_eq!(view.citations[0].domain.as_deref(), Some("mdpi.com"));
        assert_eq!(view.citations[1].title, "Source 2");
    }
}
