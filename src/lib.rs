// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod backend;
pub mod metrics;
pub mod scrape;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::backend::{AggregateResponse, BackendApi, HttpBackend};
pub use crate::scrape::events::{EventKind, SchedulerEvent};
pub use crate::scrape::scheduler::{SchedulerCfg, SchedulerStats, ScraperScheduler};
pub use crate::scrape::types::{
    CandidateArticle, Category, CycleOutcome, IngestOutcome, NormalizedArticle, ScrapeCycle,
    SourceDescriptor, SourceStats,
};
pub use crate::scrape::Scraper;
