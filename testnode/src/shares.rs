//! Share layout constants and square sizing.
//!
//! A block's data square is `k x k` shares. Every share carries an 8-byte
//! namespace prefix followed by [`MSG_SHARE_SIZE`] payload bytes.

use crate::namespace::NAMESPACE_SIZE;

/// Size of one share in bytes
pub const SHARE_SIZE: usize = 256;

/// Payload bytes held by one message share
pub const MSG_SHARE_SIZE: usize = SHARE_SIZE - NAMESPACE_SIZE;

/// Square size of a block without transactions
pub const MIN_SQUARE_SIZE: u64 = 1;

/// Largest square size a block may use
pub const MAX_SQUARE_SIZE: u64 = 128;

/// Number of message shares needed to hold `len` bytes (at least one).
pub fn shares_for(len: usize) -> usize {
    len.div_ceil(MSG_SHARE_SIZE).max(1)
}

/// Smallest square size able to lay out transactions of the given encoded
/// lengths, or `None` if they do not fit in [`MAX_SQUARE_SIZE`].
///
/// Each transaction is laid out as one message that may span at most half a
/// row, and the total share count must fit in the square.
pub fn square_size_for<I>(tx_lens: I) -> Option<u64>
where
    I: IntoIterator<Item = usize>,
{
    let mut widest = 0usize;
    let mut total = 0u64;
    for len in tx_lens {
        let shares = shares_for(len);
        widest = widest.max(shares);
        total += shares as u64;
    }

    if total == 0 {
        return Some(MIN_SQUARE_SIZE);
    }

    let mut k = 2u64;
    while k <= MAX_SQUARE_SIZE {
        if widest as u64 <= k / 2 && total <= k * k {
            return Some(k);
        }
        k *= 2;
    }
    None
}
