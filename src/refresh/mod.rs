mod scheduler;
mod session;

pub use scheduler::{RefreshOutcome, Scheduler, Viewport};
pub use session::{CoverageSession, MapSession, RefreshCycle, RefreshState};
