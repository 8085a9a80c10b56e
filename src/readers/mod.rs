pub mod mapping_reader;
pub mod schema;
pub mod source_reader;

pub use mapping_reader::{port_lookup, MappingReader, MappingSource, ParsePolicy};
pub use schema::{ColumnIndex, DatasetSchema};
pub use source_reader::SourceReader;
