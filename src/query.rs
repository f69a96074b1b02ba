//! `application/x-www-form-urlencoded` query strings.

use std::collections::BTreeMap;

/// Parse `a=1&b=two` (the part after `?`).
///
/// Keys without `=` map to an empty value; `+` and `%XX` escapes are
/// decoded. A repeated key keeps its last value.
pub fn parse(query: &str) -> BTreeMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (decode(k), decode(v))
        })
        .collect()
}

/// Decode one key or value. Invalid escapes are kept as written and
/// invalid UTF-8 is replaced.
pub fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(spaced.as_bytes())).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_bare_keys() {
        let params = parse("organizationId=org-1&agent=business-vitality-agent&flag");
        assert_eq!(params.get("organizationId").map(String::as_str), Some("org-1"));
        assert_eq!(
            params.get("agent").map(String::as_str),
            Some("business-vitality-agent")
        );
        assert_eq!(params.get("flag").map(String::as_str), Some(""));
    }

    #[test]
    fn last_duplicate_wins() {
        let params = parse("a=1&a=2");
        assert_eq!(params.get("a").map(String::as_str), Some("2"));
    }

    #[test]
    fn decode_keeps_invalid_escapes() {
        assert_eq!(decode("100%"), "100%");
        assert_eq!(decode("%E2%82%B9"), "₹");
        assert_eq!(decode("a%2Bb+c"), "a+b c");
    }
}
