// Data ingestion and storage
pub mod csv_import;
pub mod store;
