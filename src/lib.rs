pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod service;

pub use config::AppConfig;
pub use db::{open_file_store, MemoryStore, SharedStore};
pub use error::{InvoiceError, Result};
pub use service::{InvoiceArchive, InvoiceSession, TaxonomyStore};
