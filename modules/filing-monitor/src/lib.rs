pub mod broadcast;
pub mod extractor;
pub mod monitor;
pub mod retry;
pub mod scheduler;
pub mod source;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod validator;

pub use broadcast::{Broadcaster, Subscription};
pub use monitor::{CycleOutcome, Monitor, MonitorError};
pub use retry::{ExtractionFailure, RetryPolicy};
pub use scheduler::run_scheduler;
pub use traits::{DocumentExtractor, EventSink, FilingSource, FilingStore};
