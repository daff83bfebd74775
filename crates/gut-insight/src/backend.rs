use std::future::Future;

use gut_common::analysis::{AnalysisClient, AnalysisError, Analyzer};
use gut_common::mock::MockAnalyzer;
use gut_common::model::{AnalysisResponse, AnalyzeRequest};

/// The analyzer selected at startup.
pub enum Backend {
    Remote(AnalysisClient),
    Mock(MockAnalyzer),
}

impl Backend {
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Remote(_) => "remote",
            Backend::Mock(_) => "mock",
        }
    }
}

impl Analyzer for Backend {
    fn analyze(
        &self,
        request: AnalyzeRequest,
    ) -> impl Future<Output = Result<AnalysisResponse, AnalysisError>> + Send {
        async move {
            match self {
                Backend::Remote(client) => client.send(request).await,
                Backend::Mock(mock) => mock.analyze(request).await,
            }
        }
    }
}
