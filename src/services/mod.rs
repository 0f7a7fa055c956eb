pub mod disablement;
pub mod glob;
pub mod ingest;
pub mod scoring;
