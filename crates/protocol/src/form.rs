//! Form-encoded key/value parsing
//!
//! Operates on bytes so percent-decoded values may carry binary data (the
//! request token is ciphertext). Segments are split on `&`, keys from values
//! on the first `=`, `+` decodes to a space.

use percent_encoding::percent_decode;
use thiserror::Error;

/// A decoded key/value pair
pub type Pair = (Vec<u8>, Vec<u8>);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("Invalid semicolon separator in segment {0:?}")]
    Semicolon(String),

    #[error("Invalid percent escape in segment {0:?}")]
    InvalidEscape(String),
}

/// Parse strictly: any malformed segment fails the whole input
pub fn parse(input: &[u8]) -> Result<Vec<Pair>, FormError> {
    let (pairs, error) = parse_segments(input);
    match error {
        Some(e) => Err(e),
        None => Ok(pairs),
    }
}

/// Parse leniently: malformed segments are skipped
pub fn parse_lenient(input: &[u8]) -> Vec<Pair> {
    parse_segments(input).0
}

/// First value stored under `key`
pub fn first<'a>(pairs: &'a [Pair], key: &str) -> Option<&'a [u8]> {
    pairs
        .iter()
        .find(|(k, _)| k.as_slice() == key.as_bytes())
        .map(|(_, v)| v.as_slice())
}

fn parse_segments(input: &[u8]) -> (Vec<Pair>, Option<FormError>) {
    let mut pairs = Vec::new();
    let mut error = None;

    for segment in input.split(|b| *b == b'&') {
        if segment.is_empty() {
            continue;
        }
        if segment.contains(&b';') {
            error.get_or_insert(FormError::Semicolon(lossy(segment)));
            continue;
        }

        let (key, value) = match segment.iter().position(|b| *b == b'=') {
            Some(i) => (&segment[..i], &segment[i + 1..]),
            None => (segment, &[][..]),
        };

        match (unescape(key), unescape(value)) {
            (Some(k), Some(v)) => pairs.push((k, v)),
            _ => {
                error.get_or_insert(FormError::InvalidEscape(lossy(segment)));
            }
        }
    }

    (pairs, error)
}

/// `None` if a `%` is not followed by two hex digits
fn unescape(raw: &[u8]) -> Option<Vec<u8>> {
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = raw.get(i + 1..i + 3)?;
            if !hex.iter().all(u8::is_ascii_hexdigit) {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let spaced: Vec<u8> = raw
        .iter()
        .map(|b| if *b == b'+' { b' ' } else { *b })
        .collect();
    Some(percent_decode(&spaced).collect())
}

fn lossy(segment: &[u8]) -> String {
    String::from_utf8_lossy(segment).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(k: &str, v: &str) -> Pair {
        (k.as_bytes().to_vec(), v.as_bytes().to_vec())
    }

    #[test]
    fn test_basic_pairs() {
        let pairs = parse(b"a=1&b=two&c").unwrap();
        assert_eq!(pairs, vec![pair("a", "1"), pair("b", "two"), pair("c", "")]);
    }

    #[test]
    fn test_decoding() {
        let pairs = parse(b"msg=hello+world%21&n=%2B49").unwrap();
        assert_eq!(first(&pairs, "msg"), Some(&b"hello world!"[..]));
        assert_eq!(first(&pairs, "n"), Some(&b"+49"[..]));
    }

    #[test]
    fn test_binary_values() {
        let pairs = parse(b"data=%00%FF%80").unwrap();
        assert_eq!(first(&pairs, "data"), Some(&[0x00, 0xFF, 0x80][..]));
    }

    #[test]
    fn test_first_value_wins() {
        let pairs = parse(b"k=1&k=2").unwrap();
        assert_eq!(first(&pairs, "k"), Some(&b"1"[..]));
        assert_eq!(first(&pairs, "missing"), None);
    }

    #[test]
    fn test_empty_segments_skipped() {
        let pairs = parse(b"&&a=1&").unwrap();
        assert_eq!(pairs, vec![pair("a", "1")]);
        assert!(parse(b"").unwrap().is_empty());
    }

    #[test]
    fn test_value_keeps_later_equals() {
        let pairs = parse(b"a=b=c").unwrap();
        assert_eq!(first(&pairs, "a"), Some(&b"b=c"[..]));
    }

    #[test]
    fn test_semicolon_rejected() {
        assert!(matches!(parse(b"a=1;b=2"), Err(FormError::Semicolon(_))));
    }

    #[test]
    fn test_bad_escapes_rejected() {
        for input in [&b"a=%"[..], &b"a=%4"[..], &b"a=%zz"[..], &b"%g1=x"[..]] {
            assert!(
                matches!(parse(input), Err(FormError::InvalidEscape(_))),
                "{:?}",
                input
            );
        }
    }

    #[test]
    fn test_lenient_skips_bad_segments() {
        let pairs = parse_lenient(b"a=%zz&data=ok&b=1;2");
        assert_eq!(pairs, vec![pair("data", "ok")]);
    }
}
