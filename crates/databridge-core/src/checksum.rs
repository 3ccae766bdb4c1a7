//! # Integrity Verifier
//!
//! MD5 digest of a block body, encoded as lower-case hex, compared against the
//! client-declared checksum with an exact, case-sensitive string match.
//!
//! The digest is linked in statically, so there is no runtime
//! unsupported-algorithm condition.

use md5::{Digest, Md5};

/// Compute the lower-case hex MD5 digest of `content`.
#[must_use]
pub fn digest(content: &[u8]) -> String {
    hex::encode(Md5::digest(content))
}

/// Return whether `declared` equals the digest of `content`.
///
/// Pure function. An upper-case declaration of the right digest does not match.
#[must_use]
pub fn verify(content: &[u8], declared: &str) -> bool {
    digest(content) == declared
}
