//! Workers: machines and nodes seen as one unit.

pub mod correlate;
pub mod error;
pub mod service;
pub mod status;

pub use correlate::{correlate, find_worker, CorrelatedWorker};
pub use error::WorkerError;
pub use service::{create_worker, delete_worker, get_worker, list_workers};
pub use status::{project, ProjectionContext, ERROR_SEPARATOR, INITIAL_CONDITION_GRACE};
