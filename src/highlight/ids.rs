//! Highlight identifiers
//!
//! Highlights are created optimistically, so identifiers are generated on
//! the client: a random UUID v4 as the primary key and a short token for
//! sharing links.

use rand::Rng;
use uuid::Uuid;

/// Length of a short sharing token
pub const SHORT_ID_LEN: usize = 8;

/// URL-safe alphabet short tokens are drawn from
pub const SHORT_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Generate a 128-bit random highlight identifier
pub fn new_highlight_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a short sharing token
pub fn new_short_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_ID_LEN)
        .map(|_| SHORT_ID_ALPHABET[rng.gen_range(0..SHORT_ID_ALPHABET.len())] as char)
        .collect()
}

/// Whether `s` has the shape of a short sharing token
pub fn is_short_id(s: &str) -> bool {
    s.len() == SHORT_ID_LEN && s.bytes().all(|b| SHORT_ID_ALPHABET.contains(&b))
}
