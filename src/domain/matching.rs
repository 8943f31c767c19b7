//! String, host, IP and number matching used by condition predicates.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use regex::Regex;
use tracing::warn;

/// Split a comma separated list into trimmed, non-empty entries.
pub fn trim_explode(list: &str) -> impl Iterator<Item = &str> {
    list.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Match `haystack` against a wildcard pattern or a `/regex/` literal.
///
/// `*` matches any run of characters, `?` exactly one. Identical strings
/// always match; an empty needle never matches a different haystack.
pub fn search_string_wildcard(haystack: &str, needle: &str) -> bool {
    if haystack == needle {
        return true;
    }
    if needle.is_empty() {
        return false;
    }

    let pattern = if needle.len() > 2 && needle.starts_with('/') && needle.ends_with('/') {
        // delimiter escapes are noise to the regex engine
        needle[1..needle.len() - 1].replace("\\/", "/")
    } else {
        let mut p = String::from("^");
        for c in needle.chars() {
            match c {
                '*' => p.push_str(".*"),
                '?' => p.push('.'),
                c => p.push_str(&regex::escape(c.encode_utf8(&mut [0u8; 4]))),
            }
        }
        p.push('$');
        p
    };

    match Regex::new(&pattern) {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            warn!("invalid pattern {:?}: {}", needle, e);
            false
        }
    }
}

/// Compare a host name against a comma separated list of host patterns.
///
/// Matching is case-sensitive and label based; a `*` label stands for one
/// or more labels of the host name (`*.example.org`).
pub fn cmp_fqdn(base_host: &str, list: &str) -> bool {
    let base_host = base_host.trim();
    if base_host.is_empty() {
        return false;
    }
    let base: Vec<&str> = base_host.split('.').collect();
    trim_explode(list).any(|test| {
        let parts: Vec<&str> = test.split('.').map(str::trim).collect();
        host_matches(&base, &parts)
    })
}

fn host_matches(base: &[&str], parts: &[&str]) -> bool {
    if parts.len() > base.len() {
        return false;
    }
    for (i, part) in parts.iter().enumerate() {
        if *part == "*" {
            let rest = &parts[i + 1..];
            return rest.is_empty()
                || (i + 1..base.len()).any(|start| host_matches(&base[start..], rest));
        }
        if base[i] != *part {
            return false;
        }
    }
    parts.len() == base.len()
}

/// Compare an IP address against a comma separated list.
///
/// Entries may be literal IPv4/IPv6 addresses, CIDR ranges (`10.0.0.0/8`,
/// `::1/128`), IPv4 patterns with `*` octets (`192.168.*.*`, also
/// shortened as `192.168`), or `*` for any address.
pub fn cmp_ip(base_ip: &str, list: &str) -> bool {
    let list = list.trim();
    if list.is_empty() {
        return false;
    }
    if list == "*" {
        return true;
    }
    let addr = match base_ip.trim().parse::<IpAddr>() {
        Ok(addr) => addr,
        Err(_) => return false,
    };
    trim_explode(list).any(|entry| ip_entry_matches(addr, entry))
}

fn ip_entry_matches(addr: IpAddr, entry: &str) -> bool {
    if entry == "*" {
        return true;
    }
    if let Some((network, prefix)) = entry.split_once('/') {
        let prefix = match prefix.trim().parse::<u8>() {
            Ok(p) => p,
            Err(_) => return false,
        };
        return match (addr, network.trim().parse::<IpAddr>()) {
            (IpAddr::V4(a), Ok(IpAddr::V4(n))) => {
                prefix <= 32 && mask_v4(a, prefix) == mask_v4(n, prefix)
            }
            (IpAddr::V6(a), Ok(IpAddr::V6(n))) => {
                prefix <= 128 && mask_v6(a, prefix) == mask_v6(n, prefix)
            }
            _ => false,
        };
    }
    if let Ok(ip) = entry.parse::<IpAddr>() {
        return ip == addr;
    }
    match addr {
        IpAddr::V4(a) => ipv4_wildcard_matches(a, entry),
        IpAddr::V6(_) => false,
    }
}

fn mask_v4(addr: Ipv4Addr, prefix: u8) -> u32 {
    let bits = u32::from(addr);
    if prefix == 0 {
        0
    } else {
        bits & (u32::MAX << (32 - u32::from(prefix)))
    }
}

fn mask_v6(addr: Ipv6Addr, prefix: u8) -> u128 {
    let bits = u128::from(addr);
    if prefix == 0 {
        0
    } else {
        bits & (u128::MAX << (128 - u32::from(prefix)))
    }
}

fn ipv4_wildcard_matches(addr: Ipv4Addr, pattern: &str) -> bool {
    let octets = addr.octets();
    let parts: Vec<&str> = pattern.split('.').map(str::trim).collect();
    if parts.is_empty() || parts.len() > 4 {
        return false;
    }
    parts.iter().zip(octets.iter()).all(|(part, octet)| {
        *part == "*" || part.parse::<u8>().map(|p| p == *octet).unwrap_or(false)
    })
}

/// Compare `left` with a test like `17`, `=17`, `>=10`, `<5` or `!=3|4`.
///
/// `=` and `!=` accept `|`-separated alternatives. Non-numeric operands
/// count as zero.
pub fn compare_number(test: &str, left: f64) -> bool {
    let test = test.trim();
    let (operator, operand) = split_operator(test);
    let operand = operand.trim();
    match operator {
        ">=" => left >= as_number(operand),
        "<=" => left <= as_number(operand),
        ">" => left > as_number(operand),
        "<" => left < as_number(operand),
        "!=" => !operand.split('|').any(|v| left == as_number(v)),
        _ => operand.split('|').any(|v| left == as_number(v)),
    }
}

fn split_operator(test: &str) -> (&str, &str) {
    if let Some(rest) = test.strip_prefix('!') {
        let operand = rest.trim_start_matches('=');
        if operand.len() < rest.len() {
            return ("!=", operand);
        }
    }
    for op in [">=", "<=", ">", "<"] {
        if let Some(rest) = test.strip_prefix(op) {
            return (op, rest);
        }
    }
    ("=", test.trim_start_matches('='))
}

fn as_number(s: &str) -> f64 {
    s.trim().parse::<f64>().unwrap_or(0.0)
}

/// Match an `Accept-Language` header against a comma separated list.
///
/// Entries match the whole header exactly, or, written as `*lang*`, any
/// single `,`/`;` separated part of it.
pub fn language_matches(accept_language: &str, list: &str) -> bool {
    if accept_language == list {
        return true;
    }
    trim_explode(list).any(|test| {
        if test.len() > 2 && test.starts_with('*') && test.ends_with('*') {
            let wanted = &test[1..test.len() - 1];
            accept_language.split([',', ';']).any(|part| part == wanted)
        } else {
            accept_language == test
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Production", "Production", true)]
    #[case("Production/Staging", "Production*", true)]
    #[case("Production", "Prod?ction", true)]
    #[case("Production", "", false)]
    #[case("Production/Staging/Server2", "/^Production\\/.+\\/Server\\d+$/", true)]
    #[case("a.b", "a?b", true)]
    #[case("a.b", "a.c", false)]
    fn test_search_string_wildcard(#[case] haystack: &str, #[case] needle: &str, #[case] expected: bool) {
        assert_eq!(search_string_wildcard(haystack, needle), expected);
    }

    #[rstest]
    #[case("www.example.org", "*.example.org", true)]
    #[case("a.b.example.org", "*.example.org", true)]
    #[case("example.org", "*.example.org", false)]
    #[case("www.example.org", "www.*", true)]
    #[case("localhost", "*", true)]
    #[case("localhost.localdomain", "localhost", false)]
    #[case("LOCALHOST", "localhost", false)]
    #[case("", "localhost", false)]
    fn test_cmp_fqdn(#[case] host: &str, #[case] list: &str, #[case] expected: bool) {
        assert_eq!(cmp_fqdn(host, list), expected);
    }

    #[rstest]
    #[case("192.168.1.20", "192.168.*.*", true)]
    #[case("192.168.1.20", "192.168", true)]
    #[case("192.169.1.20", "192.168.*.*", false)]
    #[case("10.1.2.3", "10.0.0.0/8", true)]
    #[case("10.1.2.3", "0.0.0.0/0", true)]
    #[case("10.1.2.3", "*", true)]
    #[case("10.1.2.3", "", false)]
    #[case("not-an-ip", "10.0.0.0/8", false)]
    #[case("::1", "127.0.0.1/8", false)]
    fn test_cmp_ip(#[case] ip: &str, #[case] list: &str, #[case] expected: bool) {
        assert_eq!(cmp_ip(ip, list), expected);
    }

    #[rstest]
    #[case("17", 17.0, true)]
    #[case("=17", 17.0, true)]
    #[case("16", 17.0, false)]
    #[case(">10", 17.0, true)]
    #[case(">= 17", 17.0, true)]
    #[case("<17", 17.0, false)]
    #[case("<=17", 17.0, true)]
    #[case("!=17", 17.0, false)]
    #[case("!=3|4", 17.0, true)]
    #[case("=3|17", 17.0, true)]
    fn test_compare_number(#[case] test: &str, #[case] left: f64, #[case] expected: bool) {
        assert_eq!(compare_number(test, left), expected);
    }

    #[test]
    fn given_star_entry_when_language_matching_then_matches_single_part() {
        let header = "de-DE,de;q=0.9,en;q=0.8";
        assert!(language_matches(header, "*de*"));
        assert!(language_matches(header, "fr, *en*"));
        assert!(!language_matches(header, "*fr*"));
        assert!(language_matches(header, header));
    }
}
