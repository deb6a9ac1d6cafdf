//! In-memory block index
//!
//! Blocks live in an arena; each record carries an optional parent position.
//! Retarget algorithms walk it backward through [`BlockRef`] cursors and
//! never mutate it. A snapshot may start above height 0, in which case the
//! first record simply has no predecessor.

use crate::pow::block_proof;
use crate::{CompactTarget, Error, Result, Work};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Header fields the consensus core reads from a candidate block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderView {
    /// Block timestamp, seconds since the Unix epoch
    pub time: i64,
    /// Compact target claimed by the header
    pub bits: CompactTarget,
}

impl BlockHeaderView {
    /// Create a header view
    pub fn new(time: i64, bits: CompactTarget) -> Self {
        Self { time, bits }
    }
}

/// One block in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRecord {
    pub height: u64,
    pub time: i64,
    pub bits: CompactTarget,
    /// Arena position of the predecessor
    pub prev: Option<usize>,
}

/// Arena of block records linked backward by position
#[derive(Debug, Clone, Default)]
pub struct BlockIndex {
    records: Vec<BlockRecord>,
    base_height: u64,
}

impl BlockIndex {
    /// Empty index whose first block will be genesis
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty index whose first block sits at `base_height` with no predecessor
    pub fn starting_at(base_height: u64) -> Self {
        Self {
            records: Vec::new(),
            base_height,
        }
    }

    /// Build a linear chain from headers ordered oldest first
    pub fn from_headers<I>(base_height: u64, headers: I) -> Self
    where
        I: IntoIterator<Item = BlockHeaderView>,
    {
        let mut index = Self::starting_at(base_height);
        for header in headers {
            index.push(header);
        }
        index
    }

    /// Append a block on top of the most recently added one
    pub fn push(&mut self, header: BlockHeaderView) -> usize {
        let prev = self.records.len().checked_sub(1);
        let height = match prev {
            Some(pos) => self.records[pos].height + 1,
            None => self.base_height,
        };
        self.append(height, header, prev)
    }

    /// Add a block on top of an explicit parent, e.g. to grow a fork
    pub fn insert(&mut self, parent: usize, header: BlockHeaderView) -> Result<usize> {
        let parent_height = self
            .records
            .get(parent)
            .map(|record| record.height)
            .ok_or_else(|| Error::chain_index(format!("Unknown parent position {}", parent)))?;
        Ok(self.append(parent_height + 1, header, Some(parent)))
    }

    fn append(&mut self, height: u64, header: BlockHeaderView, prev: Option<usize>) -> usize {
        self.records.push(BlockRecord {
            height,
            time: header.time,
            bits: header.bits,
            prev,
        });
        self.records.len() - 1
    }

    /// Cursor at an arena position
    pub fn get(&self, pos: usize) -> Option<BlockRef<'_>> {
        (pos < self.records.len()).then_some(BlockRef { index: self, pos })
    }

    /// Most recently added block
    pub fn tip(&self) -> Option<BlockRef<'_>> {
        self.records.len().checked_sub(1).and_then(|pos| self.get(pos))
    }

    /// Number of stored blocks
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the index holds no blocks
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of block proofs from `tip` back to the start of the snapshot
    pub fn chain_work(&self, tip: BlockRef<'_>) -> Work {
        tip.ancestors().map(|block| block_proof(block.bits())).sum()
    }

    /// Leaf with the most accumulated work; the earliest added wins ties
    pub fn best_tip(&self) -> Option<BlockRef<'_>> {
        let mut has_child = vec![false; self.records.len()];
        for record in &self.records {
            if let Some(prev) = record.prev {
                has_child[prev] = true;
            }
        }

        let mut best: Option<(BlockRef<'_>, Work)> = None;
        for (pos, _) in has_child.iter().enumerate().filter(|(_, child)| !**child) {
            let Some(block) = self.get(pos) else { continue };
            let work = self.chain_work(block);
            match &best {
                Some((_, best_work)) if work <= *best_work => {}
                _ => best = Some((block, work)),
            }
        }
        best.map(|(block, _)| block)
    }
}

/// Borrowed cursor into a [`BlockIndex`]
#[derive(Clone, Copy)]
pub struct BlockRef<'a> {
    index: &'a BlockIndex,
    pos: usize,
}

impl<'a> BlockRef<'a> {
    fn record(&self) -> &'a BlockRecord {
        &self.index.records[self.pos]
    }

    /// Arena position
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn height(&self) -> u64 {
        self.record().height
    }

    pub fn time(&self) -> i64 {
        self.record().time
    }

    pub fn bits(&self) -> CompactTarget {
        self.record().bits
    }

    /// Predecessor, if stored
    pub fn prev(&self) -> Option<BlockRef<'a>> {
        self.record().prev.and_then(|pos| self.index.get(pos))
    }

    /// This block followed by each stored predecessor
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors { next: Some(*self) }
    }
}

impl std::fmt::Debug for BlockRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockRef")
            .field("pos", &self.pos)
            .field("height", &self.height())
            .field("time", &self.time())
            .field("bits", &self.bits())
            .finish()
    }
}

/// Iterator walking predecessor links
pub struct Ancestors<'a> {
    next: Option<BlockRef<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = BlockRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.prev();
        Some(current)
    }
}

/// Header history as stored in a chain file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainSnapshot {
    /// Height of the first header
    #[serde(default)]
    pub base_height: u64,
    /// Headers, oldest first
    pub headers: Vec<BlockHeaderView>,
    /// Header being validated on top of the last one
    #[serde(default)]
    pub candidate: Option<BlockHeaderView>,
}

impl ChainSnapshot {
    /// Load from YAML, or JSON when the extension says so
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        if path.extension().and_then(|s| s.to_str()) == Some("json") {
            serde_json::from_str(&content).map_err(Error::from)
        } else {
            serde_yaml::from_str(&content).map_err(Error::from)
        }
    }

    /// Materialize the headers as a linear block index
    pub fn to_index(&self) -> BlockIndex {
        BlockIndex::from_headers(self.base_height, self.headers.iter().copied())
    }
}
