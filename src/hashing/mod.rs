//! BLAKE3 fingerprints used to correlate prompts across log lines and run reports.

use blake3::Hasher;

/// Computes a 64-bit hash of the input data using BLAKE3, truncated from 256 bits.
///
/// Only used for identification in logs and reports. A collision merely makes two
/// batches share a label; nothing is keyed or deduplicated on it.
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Short hex label for a rendered prompt (16 hex chars).
#[inline]
pub fn prompt_fingerprint(prompt: &str) -> String {
    format!("{:016x}", hash_to_u64(prompt.as_bytes()))
}

/// Hashes the set of titles covered by a batch, order-sensitive.
pub fn hash_titles<'a, I>(titles: I) -> u64
where
    I: IntoIterator<Item = &'a str>,
{
    let mut hasher = Hasher::new();
    for title in titles {
        hasher.update(title.as_bytes());
        hasher.update(b"\x1f");
    }

    let hash = hasher.finalize();
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}
