/*!
Record of every parity check made during one Cascade run.

Passes are stored in order in an arena; each block is addressed by a
[`BlockId`] (pass, block). A reverse index maps each key position to the
blocks containing it, which is what backtracking walks after a correction.

Every block keeps both parities: this party's (`local`) and the peer's
(`remote`). A block is mismatched while they differ. Only the initiator
ever changes its key, so after a correction at index `i`:

- the initiator recomputes the local parity of every block containing `i`;
- the responder flips its copy of the remote parity of those blocks.

Both sides thereby reach the same mismatch state without extra messages.
*/

use std::collections::HashMap;
use std::fmt;

use crate::contract_err;
use crate::core::{bits::KeyBits, error::Result, state::Role};

/// Address of a recorded block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId {
    /// Pass number
    pub pass: usize,
    /// Block number within the pass
    pub block: usize,
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.pass, self.block)
    }
}

/// One parity-checked block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Global key indices, in permuted order
    pub indices: Vec<usize>,
    /// This party's parity
    pub local_parity: u8,
    /// The peer's parity, as last known
    pub remote_parity: u8,
}

impl Block {
    /// Whether the two parities disagree
    pub fn is_mismatched(&self) -> bool {
        self.local_parity != self.remote_parity
    }
}

/// Blocks of one pass with the permutation that produced them
#[derive(Debug, Clone)]
pub struct PassRecord {
    /// Pass number
    pub pass_index: usize,
    /// Block size used in this pass
    pub block_size: usize,
    /// Permutation of key positions
    pub permutation: Vec<usize>,
    /// Inverse of `permutation`
    pub inverse: Vec<usize>,
    /// Recorded blocks
    pub blocks: Vec<Block>,
}

/// All parity checks of a run, indexed by block and by key position
#[derive(Debug, Clone, Default)]
pub struct BacktrackLedger {
    passes: Vec<PassRecord>,
    index_map: HashMap<usize, Vec<BlockId>>,
}

impl BacktrackLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the record for the next pass
    pub fn begin_pass(
        &mut self,
        pass_index: usize,
        block_size: usize,
        permutation: Vec<usize>,
        inverse: Vec<usize>,
    ) -> Result<()> {
        if pass_index != self.passes.len() {
            return contract_err!(
                "pass {} opened out of order, expected {}",
                pass_index,
                self.passes.len()
            );
        }
        self.passes.push(PassRecord {
            pass_index,
            block_size,
            permutation,
            inverse,
            blocks: Vec::new(),
        });
        Ok(())
    }

    /// Record a block in the current pass
    pub fn record_block(
        &mut self,
        indices: Vec<usize>,
        local_parity: u8,
        remote_parity: u8,
    ) -> Result<BlockId> {
        if indices.is_empty() {
            return contract_err!("cannot record an empty block");
        }
        let pass = match self.passes.last_mut() {
            Some(p) => p,
            None => return contract_err!("no pass open"),
        };
        let id = BlockId {
            pass: pass.pass_index,
            block: pass.blocks.len(),
        };
        for &i in &indices {
            self.index_map.entry(i).or_default().push(id);
        }
        pass.blocks.push(Block {
            indices,
            local_parity,
            remote_parity,
        });
        Ok(id)
    }

    /// Look up a block
    pub fn block(&self, id: BlockId) -> Option<&Block> {
        self.passes.get(id.pass)?.blocks.get(id.block)
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut Block> {
        match self
            .passes
            .get_mut(id.pass)
            .and_then(|p| p.blocks.get_mut(id.block))
        {
            Some(b) => Ok(b),
            None => contract_err!("unknown block {}", id),
        }
    }

    /// Whether a recorded block currently disagrees with the peer
    pub fn is_mismatched(&self, id: BlockId) -> bool {
        self.block(id).is_some_and(Block::is_mismatched)
    }

    /// Blocks containing key position `index`, in recording order
    pub fn blocks_containing(&self, index: usize) -> &[BlockId] {
        self.index_map.get(&index).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Update every block containing `index` after a correction there.
    ///
    /// Returns the blocks that are mismatched afterwards.
    pub fn apply_correction(
        &mut self,
        index: usize,
        role: Role,
        key: &KeyBits,
    ) -> Result<Vec<BlockId>> {
        let ids = self.blocks_containing(index).to_vec();
        let mut mismatched = Vec::new();
        for id in ids {
            let block = self.block_mut(id)?;
            match role {
                Role::Initiator => block.local_parity = key.parity(&block.indices)?,
                Role::Responder => block.remote_parity ^= 1,
            }
            if block.is_mismatched() {
                mismatched.push(id);
            }
        }
        Ok(mismatched)
    }

    /// Record of one pass
    pub fn pass(&self, pass_index: usize) -> Option<&PassRecord> {
        self.passes.get(pass_index)
    }

    /// Number of passes opened
    pub fn num_passes(&self) -> usize {
        self.passes.len()
    }

    /// Number of blocks recorded across all passes
    pub fn num_blocks(&self) -> usize {
        self.passes.iter().map(|p| p.blocks.len()).sum()
    }

    /// All currently mismatched blocks
    pub fn mismatched_blocks(&self) -> Vec<BlockId> {
        self.passes
            .iter()
            .flat_map(|p| {
                p.blocks.iter().enumerate().filter_map(move |(b, block)| {
                    block.is_mismatched().then_some(BlockId {
                        pass: p.pass_index,
                        block: b,
                    })
                })
            })
            .collect()
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.passes.clear();
        self.index_map.clear();
    }
}
