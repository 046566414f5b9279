//! Probe-key derivation.
//!
//! Keys are byte strings compared lexicographically. The empty key is the
//! universal lower sentinel: it sorts before every other key, so it is the
//! probe used for the first position of a dataset.

use std::fmt::Write as _;

/// Derives a probe key `p` with `prev < p <= key`.
///
/// `p == key` only when no byte string lies strictly between the two keys,
/// which happens when `key == prev ++ [0x00]`, or when `prev` is `None` and
/// `key` is itself empty. For `prev == None` the probe is the empty key.
///
/// `prev` must sort strictly before `key`.
///
/// # Examples
///
/// ```
/// use kv_conformance::key::separator;
///
/// assert_eq!(separator(Some(b"abc".as_slice()), b"abz"), b"abd");
/// assert_eq!(separator(Some(b"abc".as_slice()), b"abcd"), b"abcc");
/// assert_eq!(separator(None, b"abc"), b"");
/// // Nothing fits between "a" and "a\x00".
/// assert_eq!(separator(Some(b"a".as_slice()), b"a\x00"), b"a\x00");
/// ```
#[must_use]
pub fn separator(prev: Option<&[u8]>, key: &[u8]) -> Vec<u8> {
    let Some(prev) = prev else {
        return Vec::new();
    };
    debug_assert!(prev < key, "`separator()` - `prev` must sort before `key`");
    match strictly_between(prev, key) {
        Some(probe) => {
            debug_assert!(prev < probe.as_slice() && probe.as_slice() < key);
            probe
        }
        None => key.to_vec(),
    }
}

fn strictly_between(a: &[u8], b: &[u8]) -> Option<Vec<u8>> {
    if a >= b {
        return None;
    }
    let shared = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let mut probe = a[..shared].to_vec();

    if shared < a.len() {
        // `a < b` and they differ here, so `a[shared] < b[shared]`.
        let bumped = a[shared] + 1;
        if bumped < b[shared] {
            probe.push(bumped);
            return Some(probe);
        }
        // Everything extending `a[..=shared]` already sorts before `b`.
        probe.push(a[shared]);
        for &c in &a[shared + 1..] {
            if c < 0xff {
                probe.push(c + 1);
                return Some(probe);
            }
            probe.push(c);
        }
        probe.push(b'x');
        return Some(probe);
    }

    // `a` is a proper prefix of `b`.
    let next = b[shared];
    if next > 0 {
        probe.push(next - 1);
        Some(probe)
    } else if b.len() > shared + 1 {
        probe.push(0);
        Some(probe)
    } else {
        None
    }
}

/// Returns the smallest key strictly greater than `key`.
///
/// ```
/// use kv_conformance::key::successor;
///
/// assert_eq!(successor(b"k"), b"k\x00");
/// ```
#[must_use]
pub fn successor(key: &[u8]) -> Vec<u8> {
    let mut next = Vec::with_capacity(key.len() + 1);
    next.extend_from_slice(key);
    next.push(0);
    next
}

/// Returns a short key greater than `key`.
///
/// The first byte below `0xff` is incremented and the rest dropped, which
/// also clears every key extending `key`. An all-`0xff` key only gets an
/// `'x'` appended.
#[must_use]
pub fn bytes_after(key: &[u8]) -> Vec<u8> {
    let mut after = Vec::with_capacity(key.len() + 1);
    for &c in key {
        if c < 0xff {
            after.push(c + 1);
            return after;
        }
        after.push(c);
    }
    after.push(b'x');
    after
}

/// Returns the probe that must miss for a "find after the last key" check.
///
/// For an empty dataset every key is past the end, so the empty key is used.
#[must_use]
pub fn after_last(last: Option<&[u8]>) -> Vec<u8> {
    last.map(successor).unwrap_or_default()
}

/// Renders a key for failure messages.
pub(crate) fn quoted(key: &[u8]) -> String {
    format!("\"{}\"", key.escape_ascii())
}

/// Renders a value for failure messages, truncating big values.
pub(crate) fn quoted_value(value: &[u8]) -> String {
    const SHOWN: usize = 32;
    if value.len() <= SHOWN {
        return quoted(value);
    }
    let mut out = quoted(&value[..SHOWN]);
    let _ = write!(out, "... ({} bytes)", value.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn first_position_uses_empty_key() {
        assert_eq!(separator(None, b"k"), b"");
        assert_eq!(separator(None, b""), b"");
    }

    #[test]
    fn bumps_first_differing_byte() {
        assert_eq!(separator(Some(b"abc".as_slice()), b"abe"), b"abd");
        assert_eq!(separator(Some(b"a".as_slice()), b"c"), b"b");
    }

    #[test]
    fn adjacent_bytes_extend_the_lower_key() {
        // 'c' + 1 == 'd', so the probe must grow past "abc".
        assert_eq!(separator(Some(b"abc".as_slice()), b"abd"), b"abcx");
        assert_eq!(separator(Some(b"abcq".as_slice()), b"abd"), b"abcr");
        assert_eq!(separator(Some(b"ab\xff".as_slice()), b"ac"), b"ab\xffx");
    }

    #[test]
    fn prefix_keys() {
        assert_eq!(separator(Some(b"".as_slice()), b"a"), b"`");
        assert_eq!(separator(Some(b"a".as_slice()), b"a\x00\x00"), b"a\x00");
        assert_eq!(separator(Some(b"a".as_slice()), b"a\x00"), b"a\x00");
        assert_eq!(separator(Some(b"".as_slice()), b"\x00"), b"\x00");
    }

    #[test]
    fn successor_and_after() {
        assert_eq!(successor(b""), b"\x00");
        assert_eq!(bytes_after(b"ab"), b"b");
        assert_eq!(bytes_after(b"\xff\xfe"), b"\xff\xff");
        assert_eq!(bytes_after(b"\xff"), b"\xffx");
        assert_eq!(bytes_after(b""), b"x");
        assert_eq!(after_last(None), b"");
        assert_eq!(after_last(Some(b"z".as_slice())), b"z\x00");
    }

    #[test]
    fn big_values_are_truncated_in_messages() {
        let rendered = quoted_value(&[b'1'; 100]);
        assert!(rendered.ends_with("... (100 bytes)"), "{rendered}");
        assert_eq!(quoted_value(b"v\n"), "\"v\\n\"");
    }

    proptest! {
        #[test]
        fn separator_lies_between(
            a in proptest::collection::vec(any::<u8>(), 0..8),
            b in proptest::collection::vec(any::<u8>(), 0..8),
        ) {
            prop_assume!(a != b);
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let probe = separator(Some(lo.as_slice()), &hi);
            prop_assert!(lo < probe, "{:?} !< {:?}", lo, probe);
            prop_assert!(probe <= hi, "{:?} !<= {:?}", probe, hi);
            prop_assert_eq!(probe == hi, hi == successor(&lo));
        }

        #[test]
        fn successor_is_tight(key in proptest::collection::vec(any::<u8>(), 0..8)) {
            let next = successor(&key);
            prop_assert!(key < next);
            prop_assert!(strictly_between(&key, &next).is_none());
            prop_assert!(key < bytes_after(&key));
        }
    }
}
