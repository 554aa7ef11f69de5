//! Boot command line helpers.
//!
//! Options are whitespace separated `key=value` tokens. Unknown keys are
//! ignored so several subsystems can share one command line.

pub fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("on")
        || value.eq_ignore_ascii_case("true")
        || value.eq_ignore_ascii_case("yes")
        || value.eq_ignore_ascii_case("enabled")
        || value == "1"
    {
        Some(true)
    } else if value.eq_ignore_ascii_case("off")
        || value.eq_ignore_ascii_case("false")
        || value.eq_ignore_ascii_case("no")
        || value.eq_ignore_ascii_case("disabled")
        || value == "0"
    {
        Some(false)
    } else {
        None
    }
}

/// Parse a tick count, accepting an optional `t` suffix (`100t`).
pub fn parse_ticks(value: &str) -> Option<u64> {
    value.trim_end_matches('t').parse::<u64>().ok()
}

/// Iterate `(key, value)` pairs whose key starts with `prefix`; the prefix
/// is stripped from the returned key.
pub fn options<'a>(
    cmdline: &'a str,
    prefix: &'a str,
) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
    cmdline
        .split_whitespace()
        .filter_map(move |token| token.strip_prefix(prefix))
        .filter_map(|token| token.split_once('='))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_spellings() {
        assert_eq!(parse_bool("ON"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn options_filter_by_prefix() {
        let mut it = options("quiet ip.raw_max=4 tcp.x=1 ip.fast=2t", "ip.");
        assert_eq!(it.next(), Some(("raw_max", "4")));
        assert_eq!(it.next(), Some(("fast", "2t")));
        assert_eq!(it.next(), None);
        assert_eq!(parse_ticks("2t"), Some(2));
    }
}
