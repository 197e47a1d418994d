//! Bounded text helpers shared by the record codec, the provisioning
//! aggregator and the broker command path.

use heapless::String;

/// Copy `s` into a fixed-capacity string, dropping whole characters that do
/// not fit.
pub fn bounded<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for ch in s.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

/// The part of `s` before the first NUL; the fixed record slots cannot
/// hold anything past it.
pub fn until_nul(s: &str) -> &str {
    s.find('\0').map_or(s, |i| &s[..i])
}

/// Interpret raw bytes as C text: stop at the first NUL and keep the
/// longest valid UTF-8 prefix.
pub fn c_text(raw: &[u8]) -> &str {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let raw = &raw[..end];
    match core::str::from_utf8(raw) {
        Ok(s) => s,
        // `valid_up_to` always lands on a char boundary.
        Err(e) => core::str::from_utf8(&raw[..e.valid_up_to()]).unwrap_or_default(),
    }
}
