pub mod archive;
pub mod legacy_zones;
pub mod preview;
pub mod render;
pub mod session;
pub mod taxonomy;
pub mod totals;

pub use archive::{ArchiveSummary, DeleteOutcome, InvoiceArchive};
pub use legacy_zones::{Choice, LegacyAssignment, LegacyZoneDirectory};
pub use preview::{InvoicePreview, PageOrientation, PdfOptions, PreviewLine};
pub use render::{Clock, FixedClock, PdfExporter, SnapshotRenderer, SystemClock};
pub use session::{InvoiceSession, Selection};
pub use taxonomy::TaxonomyStore;
pub use totals::InvoiceTotals;
