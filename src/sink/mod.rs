//! Writing the refined dataset.

mod batch;
mod writer;

pub use batch::{output_schema, to_record_batch};
pub use writer::{PartitionedWriter, WriteSummary};
