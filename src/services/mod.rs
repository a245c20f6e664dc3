pub mod analysis;
pub mod ingest;
pub mod insight;
pub mod store;
