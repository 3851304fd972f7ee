//! Post-finalize verification of the stored object.

use crate::traits::ObjectHead;
use std::fmt;
use stevedore_core::ContentDigest;

/// A single failed equality check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldMismatch {
    pub expected: String,
    pub found: String,
}

/// Verification failure carrying every failed check.
///
/// Both the digest and the size comparison are always evaluated, so one
/// report has the full diagnostic detail. Verification only detects a
/// mismatch; it cannot correct one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MismatchError {
    /// Digest mismatch, if the stored digest metadata disagrees or is missing.
    pub digest: Option<FieldMismatch>,
    /// Size mismatch, if the stored object's size disagrees.
    pub size: Option<FieldMismatch>,
}

impl fmt::Display for MismatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        if let Some(m) = &self.digest {
            write!(f, "digest mismatch: expected {}, found {}", m.expected, m.found)?;
            first = false;
        }
        if let Some(m) = &self.size {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "size mismatch: expected {}, found {}", m.expected, m.found)?;
        }
        Ok(())
    }
}

impl std::error::Error for MismatchError {}

/// Compare a finalized object's metadata against the source expectations.
///
/// Returns `Ok(())` only when both the stored digest metadata and the stored
/// size equal the expected values.
pub fn verify(
    head: &ObjectHead,
    expected_digest: &ContentDigest,
    expected_size: u64,
) -> Result<(), MismatchError> {
    let digest = match head.digest.as_deref() {
        Some(found) if found == expected_digest.as_base64() => None,
        found => Some(FieldMismatch {
            expected: expected_digest.as_base64().to_string(),
            found: found.unwrap_or("<missing>").to_string(),
        }),
    };

    let size = if head.size == expected_size {
        None
    } else {
        Some(FieldMismatch {
            expected: expected_size.to_string(),
            found: head.size.to_string(),
        })
    };

    if digest.is_none() && size.is_none() {
        Ok(())
    } else {
        Err(MismatchError { digest, size })
    }
}
