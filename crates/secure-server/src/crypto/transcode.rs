//! Standard ↔ URL-safe base64 transcoding for envelopes carried in query strings.

/// Map standard base64 to the URL-safe, unpadded alphabet.
pub fn to_url_safe(standard: &str) -> String {
    standard
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect()
}

/// Map URL-safe base64 back to the standard alphabet and restore padding.
///
/// A length of `1 mod 4` is not valid base64 in any alphabet; it is passed
/// through unpadded and fails at decode time.
pub fn to_standard(url_safe: &str) -> String {
    let mut standard: String = url_safe
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    match standard.len() % 4 {
        2 => standard.push_str("=="),
        3 => standard.push('='),
        _ => {}
    }
    standard
}
