//! Canned analysis used when the real service should not be called
//! (demos and offline development).

use std::future::Future;
use std::time::Duration;

use tracing::info;

use crate::analysis::{AnalysisError, Analyzer};
use crate::model::{AnalysisResponse, AnalysisResult, AnalyzeRequest, Impacts};

pub const DEFAULT_MOCK_DELAY: Duration = Duration::from_millis(1500);

#[derive(Clone, Debug)]
pub struct MockAnalyzer {
    delay: Duration,
}

impl MockAnalyzer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Optional: `GUT_MOCK_DELAY_MS` (default: 1500).
    pub fn from_env() -> Self {
        let delay = std::env::var("GUT_MOCK_DELAY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_MOCK_DELAY);
        Self::new(delay)
    }
}

impl Default for MockAnalyzer {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_DELAY)
    }
}

impl Analyzer for MockAnalyzer {
    fn analyze(
        &self,
        request: AnalyzeRequest,
    ) -> impl Future<Output = Result<AnalysisResponse, AnalysisError>> + Send {
        let delay = self.delay;
        async move {
            info!(query = %request.query, delay_ms = delay.as_millis(), "serving mock analysis");
            tokio::time::sleep(delay).await;
            Ok(mock_response())
        }
    }
}

pub fn mock_response() -> AnalysisResponse {
    let analysis = AnalysisResult {
        summary: "Recent studies demonstrate that consistent junk food consumption disrupts gut \
microbiome diversity, promotes pathogenic bacteria growth, and compromises gut barrier function. \
These changes correlate with chronic inflammation and increased disease risks."
            .to_string(),
        impacts: Impacts {
            positive_impacts: vec![],
            potential_concerns: vec![
                "Reduced microbial diversity[1][3]".to_string(),
                "Increased pro-inflammatory bacteria[1][4]".to_string(),
                "Gut barrier dysfunction leading to 'leaky gut'[2][4]".to_string(),
                "Systemic inflammation associated with metabolic disorders[1][3]".to_string(),
            ],
        },
        mechanisms: "Ultra-processed foods (UPFs) disrupt gut ecology through low fiber content, \
synthetic additives, and emulsifiers. These factors reduce beneficial bacteria, increase gut \
permeability, and activate inflammatory pathways, creating a cycle of dysbiosis and metabolic \
dysfunction."
            .to_string(),
    };
    let citations = [
        "https://pubmed.ncbi.nlm.nih.gov/40077728/",
        "https://www.mdpi.com/2072-6643/17/5/859",
        "https://pmc.ncbi.nlm.nih.gov/articles/PMC10734656/",
        "https://www.news-medical.net/news/20240603/Do-ultra-processed-foods-alter-the-gut-microbiome.aspx",
        "https://www.optibacprobiotics.com/uk/learning-lab/in-depth/gut-health/could-junk-food-alter-gut-bacteria-intelligence",
    ]
    .into_iter()
    .map(str::to_string)
    .collect();

    AnalysisResponse {
        analysis,
        citations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::citation::unresolved_markers;

    #[tokio::test]
    async fn test_mock_ignores_query_and_returns_canned_data() {
        let mock = MockAnalyzer::new(Duration::ZERO);
        let resp = mock
            .analyze(AnalyzeRequest {
                query: "anything at all".to_string(),
                model: None,
            })
            .await
            .unwrap();
        assert_eq!(resp, mock_response());
        assert_eq!(resp.citations.len(), 5);
    }

    #[test]
    fn test_mock_markers_all_resolve() {
        let resp = mock_response();
        let texts = resp
            .analysis
            .impacts
            .potential_concerns
            .iter()
            .map(String::as_str);
        assert!(unresolved_markers(texts, resp.citations.len()).is_empty());
    }
}
