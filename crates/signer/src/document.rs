//! Signed document parsing.
//!
//! A signed document starts, at byte offset zero, with an optional
//! `--rbxsig` literal followed by a `%`-delimited base64 token. Everything
//! after the token is the signed payload.

use crate::error::{SignerError, SignerResult};
use crate::{DELIMITER, RBXSIG_PREFIX};
use base64::Engine;
use std::borrow::Cow;

const UTF8_BOM: &[u8] = &[0xef, 0xbb, 0xbf];
const UTF32_LE_BOM: &[u8] = &[0xff, 0xfe, 0x00, 0x00];
const UTF32_BE_BOM: &[u8] = &[0x00, 0x00, 0xfe, 0xff];
const UTF16_LE_BOM: &[u8] = &[0xff, 0xfe];
const UTF16_BE_BOM: &[u8] = &[0xfe, 0xff];

/// A document split into its signature token and signed payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignedDocument<'a> {
    /// The base64 token between the `%` delimiters, as written.
    pub token: &'a str,
    /// The text the token claims to sign.
    pub payload: &'a str,
}

impl SignedDocument<'_> {
    /// Decode the token into raw signature bytes.
    pub fn signature_bytes(&self) -> SignerResult<Vec<u8>> {
        decode_signature(self.token)
    }
}

/// Decode file contents the way a text reader would.
///
/// A leading byte order mark selects UTF-8, UTF-16 or UTF-32 and is dropped;
/// without one the bytes are read as UTF-8. Invalid sequences become U+FFFD,
/// so the payload hashed later is the UTF-8 encoding of this text rather
/// than the raw file bytes.
pub fn decode_text(bytes: &[u8]) -> String {
    // UTF-32 LE must be tried before UTF-16 LE, whose BOM is its prefix.
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        String::from_utf8_lossy(rest).into_owned()
    } else if let Some(rest) = bytes.strip_prefix(UTF32_LE_BOM) {
        decode_utf32(rest, u32::from_le_bytes)
    } else if let Some(rest) = bytes.strip_prefix(UTF32_BE_BOM) {
        decode_utf32(rest, u32::from_be_bytes)
    } else if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        decode_utf16(rest, u16::from_le_bytes)
    } else if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        decode_utf16(rest, u16::from_be_bytes)
    } else {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let chunks = bytes.chunks_exact(2);
    let truncated = !chunks.remainder().is_empty();
    let units: Vec<u16> = chunks.map(|c| unit([c[0], c[1]])).collect();

    let mut text = String::from_utf16_lossy(&units);
    if truncated {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

fn decode_utf32(bytes: &[u8], unit: fn([u8; 4]) -> u32) -> String {
    let chunks = bytes.chunks_exact(4);
    let truncated = !chunks.remainder().is_empty();

    let mut text: String = chunks
        .map(|c| {
            char::from_u32(unit([c[0], c[1], c[2], c[3]])).unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect();
    if truncated {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

/// Locate the signature token anchored at the very start of `body`.
///
/// The payload begins one character past the *first* occurrence of the
/// token text in `body`, which is not necessarily the matched header when
/// the token text also appears inside the `--rbxsig` prefix.
pub fn extract_signature(body: &str) -> SignerResult<SignedDocument<'_>> {
    let token = match_token(body.strip_prefix(RBXSIG_PREFIX).unwrap_or(body))
        .ok_or(SignerError::SignatureNotFound)?;

    let payload = body
        .find(token)
        .map(|start| &body[start + token.len()..])
        .map(skip_one_char)
        .unwrap_or_default();

    Ok(SignedDocument { token, payload })
}

/// `%<one or more non-% chars>%` at the start of `s`.
fn match_token(s: &str) -> Option<&str> {
    let rest = s.strip_prefix(DELIMITER)?;
    let end = rest.find(DELIMITER)?;
    (end > 0).then(|| &rest[..end])
}

fn skip_one_char(s: &str) -> &str {
    let mut chars = s.chars();
    chars.next();
    chars.as_str()
}

/// Pad or trim an unpadded base64 token so it can be decoded.
///
/// | `len % 4` | action                      |
/// |-----------|-----------------------------|
/// | 0         | unchanged                   |
/// | 1         | drop the last character     |
/// | 2         | append `==`                 |
/// | 3         | append `=`                  |
pub fn normalize_base64(token: &str) -> Cow<'_, str> {
    match token.len() % 4 {
        1 => {
            let end = token.char_indices().last().map_or(0, |(i, _)| i);
            Cow::Borrowed(&token[..end])
        }
        2 => Cow::Owned(format!("{token}==")),
        3 => Cow::Owned(format!("{token}=")),
        _ => Cow::Borrowed(token),
    }
}

/// Normalize and decode a signature token.
///
/// Length normalization counts the token as written; ASCII whitespace, such
/// as the line breaks of a wrapped token, is skipped only when decoding.
pub fn decode_signature(token: &str) -> SignerResult<Vec<u8>> {
    let compact: String = normalize_base64(token)
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| SignerError::InvalidSignature(format!("invalid base64: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_without_prefix() {
        let doc = extract_signature("%AQID%==\r\nhello\r\n").unwrap();
        assert_eq!(doc.token, "AQID");
        assert_eq!(doc.payload, "==\r\nhello\r\n");
        assert_eq!(doc.signature_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_extract_with_prefix() {
        let doc = extract_signature("--rbxsig%c2lnbmF0dXJl%\r\nprint(1)\r\n").unwrap();
        assert_eq!(doc.token, "c2lnbmF0dXJl");
        assert_eq!(doc.payload, "\r\nprint(1)\r\n");
    }

    #[test]
    fn test_leading_newline_is_not_found() {
        let result = extract_signature("\n--rbxsig%AQID%\r\nbody");
        assert!(matches!(result, Err(SignerError::SignatureNotFound)));

        let result = extract_signature("\n%AQID%\r\nbody");
        assert!(matches!(result, Err(SignerError::SignatureNotFound)));
    }

    #[test]
    fn test_empty_token_is_not_found() {
        assert!(extract_signature("%%body").is_err());
        assert!(extract_signature("--rbxsig%%body").is_err());
    }

    #[test]
    fn test_unterminated_token_is_not_found() {
        assert!(extract_signature("%AQID").is_err());
        assert!(extract_signature("--rbxsigAQID%").is_err());
        assert!(extract_signature("").is_err());
    }

    #[test]
    fn test_partial_prefix_is_not_found() {
        assert!(extract_signature("--rbx%AQID%body").is_err());
    }

    #[test]
    fn test_payload_may_be_empty() {
        let doc = extract_signature("%AQID%").unwrap();
        assert_eq!(doc.payload, "");
    }

    #[test]
    fn test_payload_starts_after_first_token_occurrence() {
        // "rbx" occurs inside the prefix before the real header.
        let doc = extract_signature("--rbxsig%rbx%payload").unwrap();
        assert_eq!(doc.token, "rbx");
        assert_eq!(doc.payload, "ig%rbx%payload");
    }

    #[test]
    fn test_token_overlapping_prefix() {
        let doc = extract_signature("--rbxsig%-r%x").unwrap();
        assert_eq!(doc.token, "-r");
        assert_eq!(doc.payload, "xsig%-r%x");
    }

    #[test]
    fn test_non_ascii_payload() {
        let doc = extract_signature("%ab%é-tail").unwrap();
        assert_eq!(doc.payload, "é-tail");
    }

    #[test]
    fn test_normalize_by_length() {
        assert_eq!(normalize_base64("AQID"), "AQID");
        assert_eq!(normalize_base64("AQIDBA"), "AQIDBA==");
        assert_eq!(normalize_base64("AQIDBAU"), "AQIDBAU=");
        assert_eq!(normalize_base64("AQIDBAUGx"), "AQIDBAUG");
    }

    #[test]
    fn test_normalize_is_idempotent_when_aligned() {
        let once = normalize_base64("AQIDBAUG");
        let twice = normalize_base64(&once).into_owned();
        assert!(matches!(once, Cow::Borrowed(_)));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_decode_drops_stray_character() {
        assert_eq!(decode_signature("AQIDBAUGx").unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode_signature("!!!!");
        assert!(matches!(result, Err(SignerError::InvalidSignature(_))));
    }

    #[test]
    fn test_decode_text_strips_bom() {
        let text = decode_text(b"\xef\xbb\xbf%AQID%\r\nbody");
        assert!(text.starts_with("%AQID%"));
    }

    #[test]
    fn test_decode_wrapped_token() {
        assert_eq!(
            decode_signature("AQ\r\nID\r\nBAUG").unwrap(),
            vec![1, 2, 3, 4, 5, 6]
        );
        assert_eq!(decode_signature("AQID    BAUG").unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_wrapped_token_length_counts_whitespace() {
        // Nine characters as written, so the trailing newline is the one dropped.
        assert_eq!(decode_signature("AQIDBAUG\n").unwrap(), vec![1, 2, 3, 4, 5, 6]);
        // Nine characters again, but here dropping "G" leaves seven base64 digits.
        assert!(decode_signature("AQID\nBAUG").is_err());
    }

    #[test]
    fn test_extract_keeps_wrapped_token() {
        let doc = extract_signature("%AQ\r\nID\r\n%body").unwrap();
        assert_eq!(doc.token, "AQ\r\nID\r\n");
        assert_eq!(doc.payload, "body");
        assert_eq!(doc.signature_bytes().unwrap(), vec![1, 2, 3]);
    }

    fn utf16(text: &str, unit: fn(u16) -> [u8; 2], bom: &[u8]) -> Vec<u8> {
        let mut bytes = bom.to_vec();
        bytes.extend(text.encode_utf16().flat_map(unit));
        bytes
    }

    #[test]
    fn test_decode_text_utf16() {
        let le = utf16("%AQID%\r\nbody", u16::to_le_bytes, UTF16_LE_BOM);
        assert_eq!(decode_text(&le), "%AQID%\r\nbody");

        let be = utf16("%AQID%\r\nbody", u16::to_be_bytes, UTF16_BE_BOM);
        assert_eq!(decode_text(&be), "%AQID%\r\nbody");
    }

    #[test]
    fn test_decode_text_utf16_odd_length() {
        let mut le = utf16("ab", u16::to_le_bytes, UTF16_LE_BOM);
        le.push(0x63);
        assert_eq!(decode_text(&le), "ab\u{fffd}");
    }

    #[test]
    fn test_decode_text_utf32() {
        let mut le = UTF32_LE_BOM.to_vec();
        let mut be = UTF32_BE_BOM.to_vec();
        for c in "%AQID%é".chars() {
            le.extend((c as u32).to_le_bytes());
            be.extend((c as u32).to_be_bytes());
        }
        assert_eq!(decode_text(&le), "%AQID%é");
        assert_eq!(decode_text(&be), "%AQID%é");
    }

    #[test]
    fn test_decode_text_replaces_invalid_utf8() {
        assert_eq!(decode_text(b"a\xffb"), "a\u{fffd}b");
    }
}
