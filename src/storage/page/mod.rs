pub mod bitmap;
pub mod error;
pub mod header;
pub mod layout;
pub mod slotted;

pub use error::PageError;
pub use header::{RecordFileHeader, RecordPageHeader};
pub use layout::RecordLayout;
pub use slotted::SlottedPage;
