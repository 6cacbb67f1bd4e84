//! Module: scan::shard
//! Responsibility: the storage-engine boundary one shard exposes to the
//! merge iterator. Transport is the caller's problem; this is the contract.

use crate::direction::Direction;
use crate::index::range::ScanBounds;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// ShardId
///

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    derive_more::Display,
)]
pub struct ShardId(pub u32);

///
/// ResumeKey
///
/// A shard-local scan position: the last returned (index key, primary key)
/// pair. Fetching with a resume key continues strictly past it.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ResumeKey {
    pub secondary: Vec<u8>,
    pub primary: Vec<u8>,
}

///
/// ScanEntry
///
/// One index entry as stored: key pair plus the optional covered value.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanEntry {
    pub index_key: Vec<u8>,
    pub primary_key: Vec<u8>,
    pub value: Option<Vec<u8>>,
    pub expiration: Option<u64>,
}

///
/// ScanBatch
///
/// Entries are ordered ascending by (index_key, primary_key) unsigned-byte
/// order within the shard. `resume` is the shard's continuation point even
/// when the batch itself is empty but more entries are possible.
///

#[derive(Clone, Debug)]
pub struct ScanBatch {
    pub entries: Vec<ScanEntry>,
    pub has_more: bool,
    pub resume: Option<ResumeKey>,
}

///
/// FetchRequest
///

#[derive(Clone, Copy, Debug)]
pub struct FetchRequest<'a> {
    pub index_name: &'a str,
    pub bounds: &'a ScanBounds,
    pub direction: Direction,
    pub resume: Option<&'a ResumeKey>,
    pub batch_size: usize,
}

///
/// FetchError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("shard {shard} scan failed: {message}")]
pub struct FetchError {
    pub shard: ShardId,
    pub message: String,
    pub retryable: bool,
}

///
/// ShardScanner
///
/// One shard's scan endpoint. The merge iterator issues a strictly
/// sequential request series per scanner; implementations never see
/// concurrent calls on the same instance.
///

pub trait ShardScanner {
    fn shard_id(&self) -> ShardId;

    fn fetch(&mut self, request: &FetchRequest<'_>) -> Result<ScanBatch, FetchError>;
}
