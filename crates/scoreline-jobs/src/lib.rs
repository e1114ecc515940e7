//! In-process background job queue for the ingestion pipeline.
//!
//! Jobs are tagged [`JobPayload`] values dispatched to a single
//! [`JobHandler`]. Each [`JobKind`] gets its own worker pool bounded by a
//! semaphore. Retryable failures are rescheduled with exponential backoff;
//! fatal failures end the job on the first attempt.

mod error;
mod payload;
mod queue;
mod retry;

pub use error::{JobError, QueueError};
pub use payload::{JobKind, JobPayload};
pub use queue::{JobContext, JobHandler, JobQueue, JobRecord, JobState, QueueConfig};
pub use retry::backoff_delay;
