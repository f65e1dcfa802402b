pub mod connection;
pub mod feeds;
pub mod runs;

pub use connection::Database;
pub use feeds::{load_feed_metadata, save_feed_metadata};
pub use runs::{end_ingestion_run, recent_ingestion_runs, start_ingestion_run};
