//! Provide utilitiy functions for calculating packet checksums.
//!
//! The summing functions are taken from smoltcp.

use byteorder::{ByteOrder, NetworkEndian};

/// Compute an RFC 1071 compliant checksum (without the final complement).
///
/// This function is copied from smoltcp::wire::ip::checksum::data function,
/// renamed to from_slice and given a 64-bit accumulator.
pub fn from_slice(mut data: &[u8]) -> u16 {
    let mut accum: u64 = 0;

    // For each 32-byte chunk...
    const CHUNK_SIZE: usize = 32;
    while data.len() >= CHUNK_SIZE {
        let mut d = &data[..CHUNK_SIZE];
        // ... take by 2 bytes and sum them.
        while d.len() >= 2 {
            accum += NetworkEndian::read_u16(d) as u64;
            d = &d[2..];
        }

        data = &data[CHUNK_SIZE..];
    }

    // Sum the rest that does not fit the last 32-byte chunk,
    // taking by 2 bytes.
    while data.len() >= 2 {
        accum += NetworkEndian::read_u16(data) as u64;
        data = &data[2..];
    }

    // Add the last remaining odd byte, if any.
    if let Some(&value) = data.first() {
        accum += (value as u64) << 8;
    }

    propagate_carries(accum)
}

/// Compute the Internet checksum of `data`, ready to be stored in a header.
///
/// A checksum field covered by `data` must be zeroed by the caller.
#[inline]
pub fn checksum(data: &[u8]) -> u16 {
    !from_slice(data)
}

/// Combine several RFC 1071 compliant checksums.
///
/// This function is copied from smoltcp::wire::ip::checksum::combine function
/// with a 64-bit accumulator.
pub fn combine(checksums: &[u16]) -> u16 {
    let mut accum: u64 = 0;
    for &word in checksums {
        accum += word as u64;
    }
    propagate_carries(accum)
}

/// Update a stored checksum after the bytes `old` were overwritten with `new`,
/// without rescanning the rest of the covered data (RFC 1624, eqn. 3).
///
/// `old` and `new` must have the same length and start at an even offset of
/// the checksummed data.
pub fn adjust(checksum: u16, old: &[u8], new: &[u8]) -> u16 {
    debug_assert_eq!(old.len(), new.len());
    !combine(&[!checksum, !from_slice(old), from_slice(new)])
}

// Fold a 64-bit sum down to 16 bits.
fn propagate_carries(mut word: u64) -> u16 {
    while word > 0xffff {
        word = (word >> 16) + (word & 0xffff);
    }
    word as u16
}
