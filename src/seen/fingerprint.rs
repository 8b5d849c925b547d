//! Simhash fingerprints of page text
//!
//! Near-identical texts produce fingerprints a few bits apart, so small edits
//! such as a rotating ad or a timestamp do not count as a content change.

use sha2::{Digest, Sha256};

/// Fingerprints closer than this many bits are considered the same content
pub const SIMILARITY_THRESHOLD: u32 = 3;

/// Splits text into lowercase word tokens
///
/// Word characters are alphanumerics and `_`; everything else separates tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn token_hash(token: &str) -> u64 {
    let digest = Sha256::digest(token.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Computes the 64-bit simhash of a token stream
///
/// Each occurrence of a token votes on every bit of its hash; a bit of the
/// result is set when the votes for it are positive. No tokens yields 0.
pub fn simhash<I, S>(tokens: I) -> u64
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut votes = [0i64; 64];

    for token in tokens {
        let hash = token_hash(token.as_ref());
        for (bit, vote) in votes.iter_mut().enumerate() {
            if hash & (1 << bit) != 0 {
                *vote += 1;
            } else {
                *vote -= 1;
            }
        }
    }

    votes
        .iter()
        .enumerate()
        .filter(|(_, vote)| **vote > 0)
        .fold(0u64, |acc, (bit, _)| acc | (1 << bit))
}

/// Fingerprint of a page's visible text
pub fn fingerprint_text(text: &str) -> u64 {
    simhash(tokenize(text))
}

/// Number of differing bits between two fingerprints
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}

/// Returns true if the fingerprints differ enough to count as a change
pub fn is_different(a: u64, b: u64) -> bool {
    hamming_distance(a, b) >= SIMILARITY_THRESHOLD
}
