pub mod diff;
pub mod ops;
pub mod store;

pub use diff::{diff, DiffOutcome};
pub use ops::{compute_diff, merge, read_results, RunReport};
pub use store::{write_atomic, Cache, InsertStats};
