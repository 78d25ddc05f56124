//! vatwatch-server: refresh scheduling, subscription fan-out, and transport.
//!
//! The reconciliation logic lives in `vatwatch-core`; this crate drives it
//! on timers, fetches the inputs, and delivers changes to subscribers.

pub mod fetch;
pub mod logging;
pub mod scheduler;
pub mod subscription;

pub use fetch::{AutoFetcher, Fetcher, FileFetcher, HttpFetcher, MemoryFetcher, Sources};
pub use scheduler::{Scheduler, SchedulerConfig};
pub use subscription::{Delivery, QueueStats, Subscription};
