//! Request-id format (§6): an 18-character base id, with a 2-digit sequence
//! appended on each retry. The base is the de-duplication key; the sequence
//! distinguishes attempts so a stale, out-of-order notify can be detected.

const BASE_LEN: usize = 18;
const SEQ_LEN: usize = 2;

/// Split a request id into its de-duplication base and retry sequence.
///
/// Returns `None` if `id` is shorter than `BASE_LEN + SEQ_LEN` or the
/// trailing `SEQ_LEN` characters aren't ASCII digits.
pub fn split(id: &str) -> Option<(&str, u32)> {
    if id.len() < BASE_LEN + SEQ_LEN {
        return None;
    }
    let split_at = id.len() - SEQ_LEN;
    let (base, seq_str) = id.split_at(split_at);
    let seq: u32 = seq_str.parse().ok()?;
    Some((base, seq))
}

/// Build a request id for retry attempt `seq` of `base`.
pub fn with_seq(base: &str, seq: u32) -> String {
    format!("{base}{seq:0width$}", width = SEQ_LEN)
}

/// A notify is stale if its sequence is strictly less than the last
/// recorded sequence for the same base.
pub fn is_stale(recorded_seq: u32, incoming_seq: u32) -> bool {
    incoming_seq < recorded_seq
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_roundtrips_with_seq() {
        let base = "abcdefghijklmnopqr"; // 18 chars
        assert_eq!(base.len(), BASE_LEN);
        let id = with_seq(base, 3);
        assert_eq!(split(&id), Some((base, 3)));
    }

    #[test]
    fn short_id_has_no_split() {
        assert_eq!(split("too-short"), None);
    }

    #[test]
    fn staleness_is_strict() {
        assert!(is_stale(5, 4));
        assert!(!is_stale(5, 5));
        assert!(!is_stale(5, 6));
    }
}
