/*!
Binary search for a single error inside a block with odd parity mismatch.

The initiator halves the block each round: it asks for the peer's parity of
the left half (`CASCADE_REQ`), compares it with its own (`CASCADE_PARITY`)
and keeps the half that disagrees. With one position left it flips that bit
and announces it (`CASCADE_DONE`). The responder only answers and never
flips. A block of one bit needs no messages.
*/

use std::collections::HashSet;

use tracing::trace;

use crate::channel::MessageChannel;
use crate::core::{
    bits::KeyBits,
    error::Result,
    message::{MessageType, Payload},
};
use crate::{contract_err, desync_err};

/// Result of one search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Global index of the located error
    pub error_index: usize,
    /// Parity bits revealed during the search
    pub parity_bits_disclosed: u64,
}

/// Parity bits a search over `block_size` positions reveals: `ceil(log2 k)`
pub fn binary_search_leakage(block_size: usize) -> u64 {
    if block_size <= 1 {
        return 0;
    }
    (usize::BITS - (block_size - 1).leading_zeros()) as u64
}

/// Drive a search over `block` and flip the located bit in `key`
pub fn search_as_initiator<C: MessageChannel + ?Sized>(
    channel: &mut C,
    key: &mut KeyBits,
    block: &[usize],
) -> Result<SearchOutcome> {
    if block.is_empty() {
        return contract_err!("binary search over an empty block");
    }

    let (mut left, mut right) = (0, block.len());
    let mut disclosed = 0u64;
    while right - left > 1 {
        let mid = (left + right) / 2;
        let half = &block[left..mid];
        channel.send(MessageType::CascadeRequest, Payload::Indices(half.to_vec()))?;
        let remote = channel.expect(MessageType::CascadeParity)?.into_bit()?;
        let local = key.parity(half)?;
        disclosed += 1;

        if local != remote {
            right = mid;
        } else {
            left = mid;
        }
        trace!(left, right, "search narrowed");
    }

    let error_index = block[left];
    key.flip(error_index)?;
    if block.len() > 1 {
        channel.send(MessageType::CascadeDone, Payload::Index(error_index))?;
    }

    Ok(SearchOutcome {
        error_index,
        parity_bits_disclosed: disclosed,
    })
}

/// Answer the initiator's search over `block` until it reports the error
pub fn respond_to_search<C: MessageChannel + ?Sized>(
    channel: &mut C,
    key: &KeyBits,
    block: &[usize],
) -> Result<SearchOutcome> {
    if block.is_empty() {
        return contract_err!("binary search over an empty block");
    }
    if block.len() == 1 {
        return Ok(SearchOutcome {
            error_index: block[0],
            parity_bits_disclosed: 0,
        });
    }

    let members: HashSet<usize> = block.iter().copied().collect();
    let max_rounds = binary_search_leakage(block.len());
    let mut disclosed = 0u64;
    loop {
        let message = channel.receive()?;
        match message.msg_type {
            MessageType::CascadeRequest => {
                let indices = message.payload.into_indices()?;
                if indices.is_empty() || indices.iter().any(|i| !members.contains(i)) {
                    return desync_err!("indices from the block under search", format!("{:?}", indices));
                }
                if disclosed == max_rounds {
                    return desync_err!(MessageType::CascadeDone, MessageType::CascadeRequest);
                }
                let parity = key.parity(&indices)?;
                channel.send(MessageType::CascadeParity, Payload::Bit(parity))?;
                disclosed += 1;
            }
            MessageType::CascadeDone => {
                let error_index = message.payload.into_index()?;
                if !members.contains(&error_index) {
                    return desync_err!("index from the block under search", error_index);
                }
                return Ok(SearchOutcome {
                    error_index,
                    parity_bits_disclosed: disclosed,
                });
            }
            other => return desync_err!(MessageType::CascadeRequest, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{AuthenticatedChannel, MemoryTransport};
    use crate::core::{error::Error, security::PresharedKey, state::Role};
    use std::thread;

    fn channels() -> (
        AuthenticatedChannel<MemoryTransport>,
        AuthenticatedChannel<MemoryTransport>,
    ) {
        let psk = PresharedKey::new(vec![0x5A; 32]).unwrap();
        let (a, b) = MemoryTransport::pair();
        (
            AuthenticatedChannel::new(a, &psk, Role::Initiator).unwrap(),
            AuthenticatedChannel::new(b, &psk, Role::Responder).unwrap(),
        )
    }

    #[test]
    fn test_binary_search_leakage() {
        let sizes = [1, 2, 4, 5, 8];
        let expected = [0, 1, 2, 3, 3];
        for (k, e) in sizes.iter().zip(expected.iter()) {
            assert_eq!(binary_search_leakage(*k), *e, "block size {}", k);
        }
        assert_eq!(binary_search_leakage(0), 0);
        assert_eq!(binary_search_leakage(1024), 10);
        assert_eq!(binary_search_leakage(1025), 11);
    }

    #[test]
    fn test_locates_error_in_every_position() {
        let block = vec![9, 2, 7, 4, 0];
        for &err in &block {
            let (mut alice_ch, mut bob_ch) = channels();
            let bob_bits = vec![1, 0, 1, 1, 0, 0, 1, 0, 1, 1];
            let mut alice_bits = bob_bits.clone();
            alice_bits[err] ^= 1;
            let bob_key = KeyBits::new(bob_bits).unwrap();
            let mut alice_key = KeyBits::new(alice_bits).unwrap();

            let block_b = block.clone();
            let responder = thread::spawn(move || {
                respond_to_search(&mut bob_ch, &bob_key, &block_b).map(|o| (o, bob_key))
            });
            let outcome = search_as_initiator(&mut alice_ch, &mut alice_key, &block).unwrap();
            let (bob_outcome, bob_key) = responder.join().unwrap().unwrap();

            assert_eq!(outcome.error_index, err);
            assert_eq!(bob_outcome, outcome);
            assert!(outcome.parity_bits_disclosed <= binary_search_leakage(block.len()));
            assert_eq!(alice_key, bob_key);
        }
    }

    #[test]
    fn test_single_bit_block_needs_no_messages() {
        let (mut alice_ch, mut bob_ch) = channels();
        let mut alice = KeyBits::new(vec![1, 0]).unwrap();
        let bob = KeyBits::new(vec![0, 0]).unwrap();

        let a = search_as_initiator(&mut alice_ch, &mut alice, &[0]).unwrap();
        let b = respond_to_search(&mut bob_ch, &bob, &[0]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.parity_bits_disclosed, 0);
        assert_eq!(alice, bob);
        assert_eq!(alice_ch.messages_sent(), 0);
    }

    #[test]
    fn test_empty_block_is_contract_violation() {
        let (mut alice_ch, mut bob_ch) = channels();
        let mut key = KeyBits::new(vec![1]).unwrap();
        assert!(search_as_initiator(&mut alice_ch, &mut key, &[]).unwrap_err().is_contract_violation());
        assert!(respond_to_search(&mut bob_ch, &key, &[]).unwrap_err().is_contract_violation());
    }

    #[test]
    fn test_responder_rejects_foreign_indices() {
        let (mut alice_ch, mut bob_ch) = channels();
        let key = KeyBits::new(vec![0; 8]).unwrap();
        alice_ch
            .send(MessageType::CascadeRequest, Payload::Indices(vec![0, 6]))
            .unwrap();
        let err = respond_to_search(&mut bob_ch, &key, &[0, 1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::ProtocolDesync { .. }));
    }

    #[test]
    fn test_responder_rejects_unexpected_header() {
        let (mut alice_ch, mut bob_ch) = channels();
        let key = KeyBits::new(vec![0; 4]).unwrap();
        alice_ch.send(MessageType::PassComplete, Payload::Empty).unwrap();
        let err = respond_to_search(&mut bob_ch, &key, &[0, 1, 2, 3]).unwrap_err();
        assert!(err.is_desync());
    }
}
