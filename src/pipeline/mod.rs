pub mod canonical;
pub mod merge;
pub mod orchestrator;
pub mod pool;
pub mod report;
pub mod retry;

pub use orchestrator::{new_run_id, HarvestOutcome, Orchestrator};
pub use report::{LogReporter, RunSummary};
pub use retry::ThreadSleeper;
