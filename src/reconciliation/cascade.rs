/*!
Cascade reconciliation.

Each pass shuffles the key positions with a permutation both parties derive
from the shared seed, cuts the shuffled order into blocks and exchanges one
parity per block. Every mismatched block is fixed with a binary search.

A correction changes the parity of every earlier block containing the
corrected bit. Any of those blocks that now disagree hide another error, so
they are searched in turn. This repeats until no recorded block disagrees.

Block sizes double from pass to pass. An optional cap stops the doubling so
that late passes still split the key into several blocks.

A search over a block of `k` bits is charged `ceil(log2 k)` parity bits,
whether or not it finishes in fewer rounds.
*/

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::channel::MessageChannel;
use crate::core::{
    bits::{KeyBits, inverse_permutation, optimal_initial_block_size, permute, split_into_blocks},
    config::CascadeConfig,
    constants::defaults,
    error::Result,
    message::{MessageType, Payload},
    state::{ReconciliationState, Role},
};
use crate::reconciliation::{
    binary_search::{binary_search_leakage, respond_to_search, search_as_initiator},
    ledger::{BacktrackLedger, BlockId},
};
use crate::{contract_err, desync_err};

/// Counters reported after a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct CascadeStats {
    /// Parity bits disclosed (block parities plus search rounds)
    pub leakage: u64,
    /// Bits corrected
    pub errors_corrected: usize,
    /// Corrections found by revisiting earlier blocks
    pub backtrack_corrections: usize,
    /// Passes finished
    pub passes_completed: usize,
    /// Block size of the first pass
    pub initial_block_size: usize,
    /// Blocks whose parity was exchanged
    pub blocks_checked: usize,
}

/// One party's side of a Cascade run.
///
/// Owns the party's key and the ledger; the channel is lent to
/// [`reconcile`](Self::reconcile) so it can be reused by later stages.
#[derive(Debug)]
pub struct CascadeReconciliator {
    role: Role,
    key: KeyBits,
    num_passes: usize,
    initial_block_size: usize,
    max_block_size: Option<usize>,
    permutations: Vec<Vec<usize>>,
    ledger: BacktrackLedger,
    state: ReconciliationState,
    stats: CascadeStats,
}

impl CascadeReconciliator {
    /// Prepare a run.
    ///
    /// The first block size is the configured override, else derived from
    /// `estimated_qber`, else `max(4, len / 50)`. Permutations for every pass
    /// are derived here.
    pub fn new(
        role: Role,
        key: KeyBits,
        config: &CascadeConfig,
        estimated_qber: Option<f64>,
    ) -> Result<Self> {
        config.validate()?;

        let n = key.len();
        let initial_block_size = match (config.initial_block_size, estimated_qber) {
            (Some(size), _) => size,
            (None, Some(qber)) => optimal_initial_block_size(qber),
            (None, None) => (n / defaults::FALLBACK_BLOCK_DIVISOR).max(defaults::MIN_BLOCK_SIZE),
        };
        let max_block_size = config.max_block_size.map(|cap| cap.max(initial_block_size));

        let permutations = (0..config.num_passes)
            .map(|p| permute(n, config.seed, p))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            role,
            key,
            num_passes: config.num_passes,
            initial_block_size,
            max_block_size,
            permutations,
            ledger: BacktrackLedger::new(),
            state: ReconciliationState::Init,
            stats: CascadeStats {
                initial_block_size,
                ..CascadeStats::default()
            },
        })
    }

    /// Block size used in pass `pass_index`: `k0 * 2^pass_index`, bounded
    /// by the configured cap
    pub fn block_size(&self, pass_index: usize) -> usize {
        let cap = self.max_block_size.unwrap_or(usize::MAX);
        let mut size = self.initial_block_size;
        for _ in 0..pass_index {
            if size >= cap {
                break;
            }
            size = size.saturating_mul(2);
        }
        size.min(cap)
    }

    /// Run every pass against the peer. Returns the total leakage.
    pub fn reconcile<C: MessageChannel + ?Sized>(&mut self, channel: &mut C) -> Result<u64> {
        if self.state != ReconciliationState::Init {
            return contract_err!("reconciliation already ran (state {})", self.state);
        }
        info!(
            role = %self.role,
            key_length = self.key.len(),
            passes = self.num_passes,
            initial_block_size = self.initial_block_size,
            "starting Cascade"
        );

        for pass_index in 0..self.num_passes {
            self.state = ReconciliationState::Pass(pass_index);
            self.run_pass(channel, pass_index)?;
            self.stats.passes_completed += 1;
        }
        self.state = ReconciliationState::Done;

        info!(
            role = %self.role,
            leakage = self.stats.leakage,
            errors_corrected = self.stats.errors_corrected,
            backtrack_corrections = self.stats.backtrack_corrections,
            "Cascade finished"
        );
        Ok(self.stats.leakage)
    }

    fn run_pass<C: MessageChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        pass_index: usize,
    ) -> Result<()> {
        let block_size = self.block_size(pass_index);
        let permutation = self.permutations[pass_index].clone();
        let inverse = inverse_permutation(&permutation)?;

        let blocks: Vec<Vec<usize>> = split_into_blocks(self.key.len(), block_size)?
            .into_iter()
            .map(|positions| positions.into_iter().map(|j| permutation[j]).collect())
            .collect();
        let local = blocks
            .iter()
            .map(|b| self.key.parity(b))
            .collect::<Result<Vec<u8>>>()?;

        let remote = self.exchange_parities(channel, &local)?;
        self.stats.leakage += blocks.len() as u64;
        self.stats.blocks_checked += blocks.len();

        self.ledger
            .begin_pass(pass_index, block_size, permutation, inverse)?;
        let mut ids = Vec::with_capacity(blocks.len());
        for ((indices, l), r) in blocks.into_iter().zip(local).zip(remote) {
            ids.push(self.ledger.record_block(indices, l, r)?);
        }

        let mismatched_at_start = ids.iter().filter(|&&id| self.ledger.is_mismatched(id)).count();
        debug!(
            role = %self.role,
            pass = pass_index,
            block_size,
            blocks = ids.len(),
            mismatched = mismatched_at_start,
            "block parities exchanged"
        );

        for id in ids {
            // earlier corrections in this pass may already have fixed it
            if self.ledger.is_mismatched(id) {
                let index = self.correct_block(channel, id)?;
                self.backtrack(channel, index)?;
            }
        }

        match self.role {
            Role::Initiator => channel.send(MessageType::PassComplete, Payload::Empty)?,
            Role::Responder => {
                channel.expect(MessageType::PassComplete)?;
            }
        }
        Ok(())
    }

    /// Initiator sends first; the responder answers after receipt.
    fn exchange_parities<C: MessageChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        local: &[u8],
    ) -> Result<Vec<u8>> {
        let remote = match self.role {
            Role::Initiator => {
                channel.send(MessageType::BlockParities, Payload::Bits(local.to_vec()))?;
                channel.expect(MessageType::BlockParities)?.into_bits()?
            }
            Role::Responder => {
                let remote = channel.expect(MessageType::BlockParities)?.into_bits()?;
                channel.send(MessageType::BlockParities, Payload::Bits(local.to_vec()))?;
                remote
            }
        };
        if remote.len() != local.len() {
            return desync_err!(
                format!("{} block parities", local.len()),
                format!("{} block parities", remote.len())
            );
        }
        Ok(remote)
    }

    /// Search one mismatched block and update the ledger.
    fn correct_block<C: MessageChannel + ?Sized>(
        &mut self,
        channel: &mut C,
        id: BlockId,
    ) -> Result<usize> {
        let indices = match self.ledger.block(id) {
            Some(block) => block.indices.clone(),
            None => return contract_err!("unknown block {}", id),
        };
        let outcome = match self.role {
            Role::Initiator => search_as_initiator(channel, &mut self.key, &indices)?,
            Role::Responder => respond_to_search(channel, &self.key, &indices)?,
        };
        self.stats.leakage += binary_search_leakage(indices.len());
        self.stats.errors_corrected += 1;
        self.ledger
            .apply_correction(outcome.error_index, self.role, &self.key)?;
        Ok(outcome.error_index)
    }

    /// Chase the blocks a correction at `index` turned into mismatches.
    fn backtrack<C: MessageChannel + ?Sized>(&mut self, channel: &mut C, index: usize) -> Result<()> {
        let mut queue = VecDeque::from([index]);
        while let Some(corrected) = queue.pop_front() {
            let affected = self.ledger.blocks_containing(corrected).to_vec();
            for id in affected {
                if self.ledger.is_mismatched(id) {
                    let next = self.correct_block(channel, id)?;
                    self.stats.backtrack_corrections += 1;
                    queue.push_back(next);
                }
            }
        }
        Ok(())
    }

    /// Current key
    pub fn key(&self) -> &KeyBits {
        &self.key
    }

    /// Take the key out
    pub fn into_key(self) -> KeyBits {
        self.key
    }

    /// Total leakage so far
    pub fn leakage(&self) -> u64 {
        self.stats.leakage
    }

    /// Corrections so far
    pub fn errors_corrected(&self) -> usize {
        self.stats.errors_corrected
    }

    /// Corrections found by backtracking
    pub fn backtrack_corrections(&self) -> usize {
        self.stats.backtrack_corrections
    }

    /// First-pass block size
    pub fn initial_block_size(&self) -> usize {
        self.initial_block_size
    }

    /// Run progress
    pub fn state(&self) -> ReconciliationState {
        self.state
    }

    /// Recorded parity checks
    pub fn ledger(&self) -> &BacktrackLedger {
        &self.ledger
    }

    /// Counter snapshot
    pub fn stats(&self) -> CascadeStats {
        self.stats
    }

    /// This party's role
    pub fn role(&self) -> Role {
        self.role
    }
}
