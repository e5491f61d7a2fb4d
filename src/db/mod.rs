pub mod csv_export;
pub mod documents;
pub mod store;

pub use csv_export::{csv_file_name, export_to_csv, write_csv};
pub use documents::*;
pub use store::{open_file_store, JsonFileStore, KeyValueStore, MemoryStore, SharedStore};
