//! Reading the raw dataset.

mod reader;

pub use reader::{list_parquet_files, partition_date_from_path, read_raw_dataset, read_raw_records};
