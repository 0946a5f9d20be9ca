//! UTF-8 helpers for text runs
//!
//! The lexer never decodes text, it only needs to know where a chunk ends in
//! the middle of a character and whether a run contains C1 bytes that are not
//! part of a well-formed UTF-8 sequence.

/// Total length of the UTF-8 sequence introduced by `lead`, if it is a lead byte
fn sequence_len(lead: u8) -> Option<usize> {
    match lead {
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

fn is_continuation(byte: u8) -> bool {
    (0x80..=0xBF).contains(&byte)
}

/// Number of trailing bytes that form an incomplete UTF-8 character
///
/// Returns 0 when the run ends on a character boundary (or on garbage that no
/// further bytes could complete).
pub fn incomplete_suffix_len(bytes: &[u8]) -> usize {
    let len = bytes.len();
    let mut start = len;

    // Walk back over at most three continuation bytes to the lead byte
    while start > 0 && len - start < 3 && is_continuation(bytes[start - 1]) {
        start -= 1;
    }
    if start == 0 {
        return 0;
    }

    let lead = start - 1;
    match sequence_len(bytes[lead]) {
        Some(expected) if expected > len - lead => len - lead,
        _ => 0,
    }
}

/// Check whether a run contains a C1 byte (0x80-0x9F) outside well-formed UTF-8
pub fn has_stray_c1(bytes: &[u8]) -> bool {
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(_) => return false,
            Err(err) => {
                let bad_start = err.valid_up_to();
                let bad_len = err.error_len().unwrap_or(rest.len() - bad_start);
                let bad = &rest[bad_start..bad_start + bad_len];
                if bad.iter().any(|b| (0x80..=0x9F).contains(b)) {
                    return true;
                }
                rest = &rest[bad_start + bad_len..];
            }
        }
    }
}
