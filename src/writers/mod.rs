pub mod records;
pub mod table_store;

pub use records::TableRecord;
pub use table_store::{TableInfo, TableStore, TableWriteSummary};
