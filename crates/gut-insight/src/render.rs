use gut_common::location::ResultsLocation;
use gut_common::results::{AnalysisView, ErrorView, RequestState};

pub const RETRY_HINT: &str = "Type /retry to try again.";

pub fn render_state(state: &RequestState, interactive: bool) -> Option<String> {
    match state {
        RequestState::Idle => None,
        RequestState::Loading => Some(render_loading()),
        RequestState::Success(view) => Some(render_results(view)),
        RequestState::Error(err) => Some(render_error(err, interactive)),
    }
}

pub fn render_loading() -> String {
    [
        "Analyzing your query...",
        "Searching scientific literature and synthesizing results",
    ]
    .join("\n")
}

pub fn render_results(view: &AnalysisView) -> String {
    let mut lines = vec![format!("Showing results for: {}", view.query)];
    if let Some(followup) = &view.followup {
        lines.push(format!("Follow-up: {followup}"));
    }

    lines.push(String::new());
    lines.push("Summary".to_string());
    lines.push(format!("  {}", view.analysis.summary));

    let impacts = &view.analysis.impacts;
    if !impacts.positive_impacts.is_empty() {
        lines.push(String::new());
        lines.push("Potential Positive Impacts".to_string());
        lines.extend(impacts.positive_impacts.iter().map(|i| format!("  + {i}")));
    }
    if !impacts.potential_concerns.is_empty() {
        lines.push(String::new());
        lines.push("Potential Concerns".to_string());
        lines.extend(impacts.potential_concerns.iter().map(|c| format!("  ! {c}")));
    }

    lines.push(String::new());
    lines.push("How It Works".to_string());
    lines.push(format!("  {}", view.analysis.mechanisms));

    if !view.citations.is_empty() {
        lines.push(String::new());
        lines.push("Sources".to_string());
        lines.extend(
            view.citations
                .iter()
                .map(|c| format!("  [{}] {}", c.number, c.title)),
        );
    }

    lines.join("\n")
}

pub fn render_error(err: &ErrorView, interactive: bool) -> String {
    let mut lines: Vec<String> = err.lines();
    if interactive {
        lines.push(RETRY_HINT.to_string());
    }
    lines.join("\n")
}

pub fn render_location(location: Option<&ResultsLocation>) -> String {
    match location {
        Some(location) => location.to_string(),
        None => "(no query yet)".to_string(),
    }
}
