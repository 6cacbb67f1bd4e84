pub mod merge;
pub mod shard;

pub use merge::{MergeConfig, MergeScan, ScanError, ScanState};
pub use shard::{
    FetchError, FetchRequest, ResumeKey, ScanBatch, ScanEntry, ShardId, ShardScanner,
};
