//! Ownership-token derivation from the session email.
//!
//! Backends that predate the partner-id rollout return case records without
//! an authoritative partner id. For those, the dashboard pre-filters with a
//! token derived from the user's email. The scheme reproduces the legacy
//! client's rolling hash so both sides keep minting identical tokens; it is
//! a best-effort heuristic, not a collision-resistant or security-relevant
//! identifier. Backend-issued partner ids always take precedence.

const LANE_A_SEED: u64 = 0xcbf2_9ce4_8422_2325;
const LANE_B_SEED: u64 = 0x9e37_79b9_7f4a_7c15;
const LANE_B_MIX: u64 = 0x0100_0000_01b3;

/// Derives the stable, UUID-shaped ownership token for an email address.
///
/// Case-folds before hashing, so `A@B.com` and `a@b.com` agree. Never
/// fails: empty or whitespace-only input yields an empty string, which
/// callers must treat as "no partner filter available" rather than a reason
/// to reject records.
pub fn derive_identity(email: &str) -> String {
    let folded = email.trim().to_lowercase();
    if folded.is_empty() {
        return String::new();
    }

    let mut lane_a = LANE_A_SEED;
    let mut lane_b = LANE_B_SEED;
    for byte in folded.bytes() {
        lane_a = lane_a.wrapping_mul(31).wrapping_add(u64::from(byte));
        lane_b = lane_b.rotate_left(5) ^ u64::from(byte).wrapping_mul(LANE_B_MIX);
    }

    format!(
        "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
        (lane_a >> 32) as u32,
        (lane_a >> 16) & 0xffff,
        lane_a & 0xffff,
        (lane_b >> 48) & 0xffff,
        lane_b & 0xffff_ffff_ffff,
    )
}
