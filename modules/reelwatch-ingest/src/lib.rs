pub mod accounts;
pub mod error;
pub mod gateway;
pub mod known_ids;
pub mod maintenance;
pub mod refresher;
pub mod scanner;
pub mod scheduler;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod thumbnails;
pub mod traits;

pub use accounts::AccountBook;
pub use error::{FetchError, IngestError, Result};
pub use gateway::FetchGateway;
pub use known_ids::KnownIds;
pub use refresher::{MetricsRefresher, RefreshOutcome, RefreshReport};
pub use scanner::AccountScanner;
pub use scheduler::{DiscoveryScheduler, PassReport, SchedulerState};
pub use store::JsonSnapshotStore;
pub use thumbnails::ThumbnailCache;
pub use traits::{ItemSource, SnapshotStore};
