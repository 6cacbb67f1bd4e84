//! Module: scan::merge
//! Responsibility: drive one logical scan across every target shard and
//! merge the shard-local ordered streams into one global order, with
//! per-shard resumability and primary-key deduplication for multi-key
//! indexes.

use crate::direction::Direction;
use crate::error::IndexError;
use crate::index::definition::IndexDefinition;
use crate::index::range::{IndexRange, ScanBounds};
use crate::obs::{self, MetricsEvent};
use crate::scan::shard::{FetchError, FetchRequest, ResumeKey, ScanEntry, ShardId, ShardScanner};
use std::collections::{HashSet, VecDeque};
use thiserror::Error as ThisError;

/// Initial sizing of the per-shard seen-primary-keys set.
pub const DEFAULT_DEDUP_CAPACITY: usize = 1000;

///
/// ScanError
///
/// A shard failure is surfaced immediately, never silently skipped. It
/// carries the failed shard's last good resume key so a caller-level retry
/// can resume that shard alone; the other cursors stay intact.
///

#[derive(Debug, ThisError)]
pub enum ScanError {
    #[error("shard {shard} unavailable")]
    ShardUnavailable {
        shard: ShardId,
        resume: Option<ResumeKey>,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Internal(#[from] IndexError),
}

///
/// ScanState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScanState {
    Initialized,
    Fetching,
    Merging,
    Exhausted,
    Closed,
}

///
/// MergeConfig
///

#[derive(Clone, Copy, Debug)]
pub struct MergeConfig {
    /// Entries requested per shard fetch.
    pub batch_size: usize,
    /// Upper bound on shard fetches dispatched at once.
    pub max_concurrent_fetches: usize,
    /// Initial capacity of each shard's dedup set.
    pub dedup_capacity: usize,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            max_concurrent_fetches: 4,
            dedup_capacity: DEFAULT_DEDUP_CAPACITY,
        }
    }
}

// Per-fetch (entry count, has_more) pairs on success; `Err(Some(_))` is a
// shard failure and `Err(None)` a worker panic.
type FetchOutcome = Result<Vec<(usize, bool)>, Option<FetchError>>;

struct ShardCursor<S> {
    scanner: S,
    shard: ShardId,
    batch: VecDeque<ScanEntry>,
    has_more: bool,
    resume: Option<ResumeKey>,
    /// Primary keys already returned by this shard. Never shared across
    /// shards or across iterator instances.
    seen: HashSet<Vec<u8>>,
}

impl<S: ShardScanner> ShardCursor<S> {
    /// Fetch until the batch is non-empty or the shard is done. Returns the
    /// (entry count, has_more) pair of every fetch for metrics emission on
    /// the driving thread.
    fn refill(
        &mut self,
        index_name: &str,
        bounds: &ScanBounds,
        direction: Direction,
        batch_size: usize,
    ) -> Result<Vec<(usize, bool)>, FetchError> {
        let mut fetches = Vec::new();

        while self.batch.is_empty() && self.has_more {
            let request = FetchRequest {
                index_name,
                bounds,
                direction,
                resume: self.resume.as_ref(),
                batch_size,
            };
            let batch = self.scanner.fetch(&request)?;
            fetches.push((batch.entries.len(), batch.has_more));

            self.has_more = batch.has_more;
            // An empty batch can still move the shard's position forward.
            if let Some(resume) = batch.resume {
                self.resume = Some(resume);
            }
            self.batch = batch.entries.into();
        }

        Ok(fetches)
    }
}

///
/// MergeScan
///
/// Scatter-gather merge iterator. Each shard's request series is strictly
/// sequential; requests to different shards are dispatched concurrently up
/// to `max_concurrent_fetches`. Yields entries in (index key, primary key)
/// unsigned-byte order per the scan direction.
///

pub struct MergeScan<S> {
    index_name: String,
    range: IndexRange,
    config: MergeConfig,
    cursors: Vec<ShardCursor<S>>,
    dedup: bool,
    state: ScanState,
}

impl<S: ShardScanner> MergeScan<S> {
    #[must_use]
    pub fn new(
        definition: &IndexDefinition,
        range: IndexRange,
        scanners: Vec<S>,
        config: MergeConfig,
    ) -> Self {
        Self::resume_from(definition, range, scanners, config, &[])
    }

    /// Rebuild a scan from a previously captured resume token. Shards
    /// missing from the token start from the range boundary.
    #[must_use]
    pub fn resume_from(
        definition: &IndexDefinition,
        range: IndexRange,
        scanners: Vec<S>,
        config: MergeConfig,
        token: &[(ShardId, Option<ResumeKey>)],
    ) -> Self {
        let dedup = definition.requires_scan_dedup(range.equality_columns());
        let empty = range.bounds.is_empty();

        let cursors = scanners
            .into_iter()
            .map(|scanner| {
                let shard = scanner.shard_id();
                let resume = token
                    .iter()
                    .find(|(id, _)| *id == shard)
                    .and_then(|(_, resume)| resume.clone());
                ShardCursor {
                    scanner,
                    shard,
                    batch: VecDeque::new(),
                    has_more: !empty,
                    resume,
                    seen: HashSet::with_capacity(if dedup { config.dedup_capacity } else { 0 }),
                }
            })
            .collect();

        Self {
            index_name: definition.name.clone(),
            range,
            config,
            cursors,
            dedup,
            state: if empty {
                ScanState::Exhausted
            } else {
                ScanState::Initialized
            },
        }
    }

    #[must_use]
    pub const fn state(&self) -> ScanState {
        self.state
    }

    /// The overall resume token: every shard cursor's own position.
    /// Re-merging from these per-shard points reproduces the global order.
    #[must_use]
    pub fn resume_token(&self) -> Vec<(ShardId, Option<ResumeKey>)> {
        self.cursors
            .iter()
            .map(|cursor| (cursor.shard, cursor.resume.clone()))
            .collect()
    }

    /// Stop the scan. A closed iterator issues no further requests and
    /// reports no further elements.
    pub fn close(&mut self) {
        self.state = ScanState::Closed;
        for cursor in &mut self.cursors {
            cursor.batch.clear();
            cursor.has_more = false;
        }
    }

    // Cursor holding the least (Forward/Unordered) or greatest (Reverse)
    // front entry, tie-broken by primary key bytes.
    fn select(&self) -> Option<usize> {
        let mut best: Option<(usize, (&[u8], &[u8]))> = None;

        for (position, cursor) in self.cursors.iter().enumerate() {
            let Some(front) = cursor.batch.front() else {
                continue;
            };
            let candidate = (front.index_key.as_slice(), front.primary_key.as_slice());
            let better = match best {
                None => true,
                Some((_, current)) => match self.range.direction {
                    Direction::Forward | Direction::Unordered => candidate < current,
                    Direction::Reverse => candidate > current,
                },
            };
            if better {
                best = Some((position, candidate));
            }
        }

        best.map(|(position, _)| position)
    }
}

impl<S: ShardScanner + Send> MergeScan<S> {
    fn refill_all(&mut self) -> Result<(), ScanError> {
        let pending: Vec<usize> = self
            .cursors
            .iter()
            .enumerate()
            .filter(|(_, cursor)| cursor.batch.is_empty() && cursor.has_more)
            .map(|(position, _)| position)
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        self.state = ScanState::Fetching;
        let shard_ids: Vec<ShardId> = self.cursors.iter().map(|cursor| cursor.shard).collect();
        let index_name = &self.index_name;
        let bounds = &self.range.bounds;
        let direction = self.range.direction;
        let batch_size = self.config.batch_size;
        let concurrency = self.config.max_concurrent_fetches.max(1);

        let mut failure: Option<ScanError> = None;
        let mut fetched: Vec<(ShardId, usize, bool)> = Vec::new();

        for chunk in pending.chunks(concurrency) {
            let results: Vec<(usize, FetchOutcome)> = std::thread::scope(|scope| {
                let mut handles = Vec::with_capacity(chunk.len());
                for (position, cursor) in self.cursors.iter_mut().enumerate() {
                    if !chunk.contains(&position) {
                        continue;
                    }
                    let handle = scope
                        .spawn(move || cursor.refill(index_name, bounds, direction, batch_size));
                    handles.push((position, handle));
                }
                handles
                    .into_iter()
                    .map(|(position, handle)| {
                        let outcome = match handle.join() {
                            Ok(Ok(fetches)) => Ok(fetches),
                            Ok(Err(err)) => Err(Some(err)),
                            Err(_) => Err(None),
                        };
                        (position, outcome)
                    })
                    .collect()
            });

            for (position, outcome) in results {
                match outcome {
                    Ok(fetches) => fetched.extend(
                        fetches
                            .into_iter()
                            .map(|(entries, has_more)| (shard_ids[position], entries, has_more)),
                    ),
                    Err(source) if failure.is_none() => {
                        failure = Some(match source {
                            Some(source) => ScanError::ShardUnavailable {
                                shard: shard_ids[position],
                                resume: self.cursors[position].resume.clone(),
                                source,
                            },
                            None => ScanError::Internal(IndexError::scan_internal(format!(
                                "fetch worker for shard {} panicked",
                                shard_ids[position]
                            ))),
                        });
                    }
                    Err(_) => {}
                }
            }
            if failure.is_some() {
                break;
            }
        }

        for (shard, entries, has_more) in fetched {
            obs::emit(MetricsEvent::BatchFetched {
                shard,
                entries,
                has_more,
            });
        }

        failure.map_or(Ok(()), Err)
    }
}

impl<S: ShardScanner + Send> Iterator for MergeScan<S> {
    type Item = Result<ScanEntry, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if matches!(self.state, ScanState::Closed | ScanState::Exhausted) {
                return None;
            }

            if let Err(err) = self.refill_all() {
                return Some(Err(err));
            }
            self.state = ScanState::Merging;

            let Some(position) = self.select() else {
                self.state = ScanState::Exhausted;
                return None;
            };

            let cursor = &mut self.cursors[position];
            let Some(entry) = cursor.batch.pop_front() else {
                continue;
            };
            cursor.resume = Some(ResumeKey {
                secondary: entry.index_key.clone(),
                primary: entry.primary_key.clone(),
            });

            if !self.range.in_range(&entry.index_key) {
                continue;
            }
            if self.dedup && !self.cursors[position].seen.insert(entry.primary_key.clone()) {
                obs::emit(MetricsEvent::DuplicateDropped {
                    shard: self.cursors[position].shard,
                });
                continue;
            }

            return Some(Ok(entry));
        }
    }
}
