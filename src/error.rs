use thiserror::Error;

/// Typed dispositions for every stage of the pipeline (see design notes, §7).
///
/// Adapters and the crawl engine return these instead of throwing; the
/// orchestrator decides per-variant whether to skip a URL, skip a host, or
/// propagate the failure as a stage result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("robots.txt disallows this URL")]
    RobotsBlocked,

    #[error("host circuit open after {failures} consecutive failures")]
    HostCircuitOpen { failures: u32 },

    #[error("rate limited (429)")]
    RateLimited,

    #[error("not found (404)")]
    NotFound,

    #[error("failed to parse record: {0}")]
    ParseError(String),

    #[error("content shorter than the minimum of {min} characters")]
    ShortContent { min: usize },

    #[error("duplicate URL")]
    DuplicateUrl,

    #[error("duplicate content")]
    DuplicateContent,

    #[error("insufficient sample size: have {have}, need {need}")]
    InsufficientSample { have: usize, need: usize },

    #[error("persistence store error: {0}")]
    StoreError(String),

    #[error("adapter '{adapter}' failed: {source}")]
    AdapterException {
        adapter: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
