pub mod amount;
pub mod draft;
pub mod saved;
pub mod taxonomy;

pub use draft::{InvoiceDraft, ItemField, LineItem};
pub use saved::{Assignment, FolderFilter, InvoiceFilter, SavedInvoice};
pub use taxonomy::{CustomerTypes, Folder, FolderTree, ZoneData};
