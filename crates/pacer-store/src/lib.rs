//! Storage layer: header-bearing CSV tables read and written as Arrow batches.

mod error;
pub use error::StoreError;

mod table;
pub use table::{
    DEFAULT_BATCH_SIZE, TableWriter, TextTableOptions, WriteMode, read_header, read_table,
    read_text_table, remove_table,
};
