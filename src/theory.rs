//! Closed-form model of probabilistic construction success.
//!
//! A lookup runs `k = max(1, ceil(log2(max(2, w))))` signature comparisons,
//! each falsely matching with probability `2^-S`. A build attempt succeeds
//! when no key suffers a false match; failed attempts are retried with fresh
//! randomness. These are approximations to compare against measured success
//! rates, not predictions of them.

use crate::render::Series;

/// Retry budget the structures under test use by default.
pub const DEFAULT_REBUILD_ATTEMPTS: u32 = 100;

/// Number of signature checks performed by one lookup over `key_width_bits`.
pub fn signature_checks(key_width_bits: u32) -> u32 {
    let w = key_width_bits.max(2) as f64;
    (w.log2().ceil() as u32).max(1)
}

/// Probability that one lookup hits at least one false signature match.
pub fn query_failure_probability(key_width_bits: u32, signature_width_bits: u32) -> f64 {
    let k = signature_checks(key_width_bits) as f64;
    let p = (-(signature_width_bits as f64)).exp2();
    // 1 - (1 - p)^k, kept accurate for tiny p.
    -(k * (-p).ln_1p()).exp_m1()
}

/// Probability that construction succeeds within `rebuild_attempts` tries.
pub fn build_success_probability(
    key_count: u64,
    key_width_bits: u32,
    signature_width_bits: u32,
    rebuild_attempts: u32,
) -> f64 {
    if key_count == 0 {
        return 1.0;
    }
    let q = query_failure_probability(key_width_bits, signature_width_bits);
    let attempt_success = (key_count as f64 * (-q).ln_1p()).exp();
    if attempt_success >= 1.0 {
        return 1.0;
    }
    let overall = -(rebuild_attempts as f64 * (-attempt_success).ln_1p()).exp_m1();
    overall.clamp(0.0, 1.0)
}

/// Signature width `S` needed for per-query failure `epsilon_query`:
/// `ceil(log2(log2(w)) + log2(1/epsilon))`, at least one bit.
pub fn required_signature_bits(max_key_bits: u32, epsilon_query: f64) -> Option<u32> {
    if max_key_bits == 0 || !(epsilon_query > 0.0 && epsilon_query < 1.0) {
        return None;
    }
    let loglog_w = if max_key_bits > 2 {
        (max_key_bits as f64).log2().log2()
    } else {
        0.0
    };
    let required = (loglog_w + (1.0 / epsilon_query).log2()).ceil();
    Some((required as u32).max(1))
}

/// Signature width for a relative trie over `total_keys` keys split by
/// `delimiters` bucket delimiters (`epsilon = delimiters / total_keys`).
pub fn relative_trie_signature_bits(
    max_key_bits: u32,
    total_keys: u64,
    delimiters: u64,
) -> Option<u32> {
    if total_keys == 0 || delimiters == 0 || delimiters > total_keys {
        return None;
    }
    if delimiters == total_keys {
        return Some(1);
    }
    required_signature_bits(max_key_bits, delimiters as f64 / total_keys as f64)
}

/// Model predictions as a dashed overlay series over `key_counts`.
pub fn theory_series(
    name: impl Into<String>,
    key_counts: &[u64],
    key_width_bits: u32,
    signature_width_bits: u32,
    rebuild_attempts: u32,
) -> Series {
    let points = key_counts
        .iter()
        .map(|&n| {
            (
                n as f64,
                build_success_probability(n, key_width_bits, signature_width_bits, rebuild_attempts),
            )
        })
        .collect();
    Series::dashed(name, points)
}
