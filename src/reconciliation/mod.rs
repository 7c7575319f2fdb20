/*!
Error reconciliation with the Cascade protocol.

- [`ledger`]: every parity check of a run, indexed for backtracking
- [`binary_search`]: the initiator/responder error search inside one block
- [`cascade`]: the multi-pass driver
*/

pub mod binary_search;
pub mod cascade;
pub mod ledger;

pub use binary_search::{SearchOutcome, binary_search_leakage, respond_to_search, search_as_initiator};
pub use cascade::{CascadeReconciliator, CascadeStats};
pub use ledger::{BacktrackLedger, Block, BlockId, PassRecord};
