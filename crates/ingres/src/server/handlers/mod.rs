pub mod ask;
pub mod ingest;
pub mod predictions;
pub mod status;
pub mod voice;
