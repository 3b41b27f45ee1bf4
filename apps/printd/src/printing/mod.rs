// Print jobs end to end: HTTP handlers, the FIFO queue and the executor that
// issues the platform print call.

pub mod executor;
pub mod handlers;
pub mod job;
pub mod queue;
pub mod test_ticket;

pub use job::{JobError, PrintJob};
pub use queue::{PrintService, QueueOptions};
