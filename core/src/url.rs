//! URL joining with RFC 3986 percent-escaping.
//!
//! Pure string building: `join(base, segments, params)` produces the final
//! request URL. Path segments and query keys/values are escaped; the base
//! is trusted as already well-formed.

/// Join a base URL, extra path segments and query parameters into one URL.
pub fn join(base: &str, segments: &[&str], params: &[(String, String)]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(&escape(segment));
    }
    for (i, (key, value)) in params.iter().enumerate() {
        url.push(if i == 0 { '?' } else { '&' });
        url.push_str(&escape(key));
        url.push('=');
        url.push_str(&escape(value));
    }
    url
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
        }
    }
    out
}
