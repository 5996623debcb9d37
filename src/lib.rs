//! Enrich shipping-invoice CSVs with product option names resolved from a
//! remote management-code table.

pub mod codec;
pub mod config;
pub mod emit;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod mapping;
pub mod session;

pub use codec::{CsvTable, HeaderMode, InvoiceRow, ParseOptions, Parsed};
pub use config::Config;
pub use mapping::CodeMapping;
pub use session::{ProcessingResult, Session, SessionStatus};
