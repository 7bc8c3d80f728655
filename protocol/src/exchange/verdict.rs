//! Verification outcomes and the location proximity rule.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The stages a token passes through inside
/// [`verify_token`](super::PaymentProtocol::verify_token). Order is fixed;
/// a rejection at one stage means none of the later ones ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VerificationStage {
    /// Token bytes decoded and handed to the verifier.
    Received,
    /// Signature over the signable prefix verified.
    SignatureChecked,
    /// Nonce accepted by the replay guard and now consumed.
    ReplayChecked,
    /// Location cell matched (or no check was required).
    LocationChecked,
}

impl VerificationStage {
    /// Short name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::SignatureChecked => "signature-checked",
            Self::ReplayChecked => "replay-checked",
            Self::LocationChecked => "location-checked",
        }
    }
}

impl fmt::Display for VerificationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a token was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    /// The Ed25519 signature doesn't cover the token bytes.
    InvalidSignature,
    /// Nonce already used, or timestamp outside the replay window.
    ReplayOrBadTimestamp,
    /// Geo-auth required and the cells are too far apart.
    LocationMismatch,
}

impl RejectReason {
    /// Stable wire/log string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidSignature => "invalid-signature",
            Self::ReplayOrBadTimestamp => "replay-or-bad-timestamp",
            Self::LocationMismatch => "location-mismatch",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of verifying a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "verdict", content = "reason", rename_all = "kebab-case")]
pub enum Verdict {
    /// Every stage passed; the nonce is now consumed.
    Accepted,
    /// Stopped at the first failing stage.
    Rejected(RejectReason),
}

impl Verdict {
    /// `true` for [`Verdict::Accepted`].
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// The rejection reason, if any.
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::Accepted => None,
            Self::Rejected(reason) => Some(*reason),
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("accepted"),
            Self::Rejected(reason) => write!(f, "rejected: {reason}"),
        }
    }
}

/// Proximity rule for location cells.
///
/// Two cells match if they are identical, or if their first
/// `resolution + 1` characters are equal. Both cells must be at least that
/// long for the prefix rule to apply; a shorter cell only matches exactly.
///
/// Comparison is on the trimmed text, the same form the codec produces.
pub fn location_matches(token_cell: &str, expected_cell: &str, resolution: usize) -> bool {
    let a = token_cell.trim();
    let b = expected_cell.trim();
    if a == b {
        return true;
    }
    let n = resolution.saturating_add(1);
    match (a.as_bytes().get(..n), b.as_bytes().get(..n)) {
        (Some(pa), Some(pb)) => pa == pb,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match() {
        assert!(location_matches("891f8a2820fffff", "891f8a2820fffff", 8));
        assert!(location_matches("abc", "abc", 8));
    }

    #[test]
    fn test_prefix_match_at_resolution() {
        // First 9 characters equal, the rest differ.
        assert!(location_matches("891f8a282aaaaaa", "891f8a282bbbbbb", 8));
        // 9th character differs.
        assert!(!location_matches("891f8a28xaaaaaa", "891f8a28ybbbbbb", 8));
    }

    #[test]
    fn test_resolution_zero_compares_one_char() {
        assert!(location_matches("8xxxxxx", "8yyyyyy", 0));
        assert!(!location_matches("8xxxxxx", "9xxxxxx", 0));
    }

    #[test]
    fn test_short_cells_need_exact_match() {
        assert!(!location_matches("891f", "891e", 8));
        assert!(!location_matches("891f8a282", "891f8a28", 8));
    }

    #[test]
    fn test_padding_ignored() {
        assert!(location_matches("891f8a2820fffff", "891f8a2820fffff   ", 8));
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(RejectReason::InvalidSignature.to_string(), "invalid-signature");
        assert_eq!(
            Verdict::Rejected(RejectReason::ReplayOrBadTimestamp).to_string(),
            "rejected: replay-or-bad-timestamp"
        );
        assert_eq!(
            serde_json::to_string(&RejectReason::LocationMismatch).unwrap(),
            "\"location-mismatch\""
        );
    }

    #[test]
    fn test_verdict_accessors() {
        assert!(Verdict::Accepted.is_accepted());
        assert_eq!(Verdict::Accepted.reason(), None);
        let v = Verdict::Rejected(RejectReason::LocationMismatch);
        assert!(!v.is_accepted());
        assert_eq!(v.reason(), Some(RejectReason::LocationMismatch));
    }

    #[test]
    fn test_stage_order() {
        assert!(VerificationStage::Received < VerificationStage::SignatureChecked);
        assert!(VerificationStage::ReplayChecked < VerificationStage::LocationChecked);
    }
}
