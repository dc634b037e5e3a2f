pub mod ingest_worker;

pub use ingest_worker::run as run_ingest_worker;
pub use ingest_worker::run_iterations as run_ingest_worker_iterations;
