//! Network address validators

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref MAC_REGEX: Regex = Regex::new(
        r"^(?:(?:[0-9A-Fa-f]{2}:){5}|(?:[0-9A-Fa-f]{2}:){7}|(?:[0-9A-Fa-f]{2}-){5}|(?:[0-9A-Fa-f]{2}-){7})[0-9A-Fa-f]{2}$|^(?:[0-9A-Fa-f]{4}\.){2,3}[0-9A-Fa-f]{4}$"
    )
    .unwrap();
}

pub fn is_ip(s: &str) -> bool {
    s.parse::<IpAddr>().is_ok()
}

pub fn is_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

pub fn is_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

/// Hardware address in colon, hyphen or dotted notation (EUI-48 or EUI-64)
pub fn is_mac(s: &str) -> bool {
    MAC_REGEX.is_match(s)
}

/// Address with a prefix length, either family
pub fn is_cidr(s: &str) -> bool {
    parse_cidr(s).is_some()
}

pub fn is_cidrv4(s: &str) -> bool {
    matches!(parse_cidr(s), Some(IpAddr::V4(_)))
}

pub fn is_cidrv6(s: &str) -> bool {
    matches!(parse_cidr(s), Some(IpAddr::V6(_)))
}

fn parse_cidr(s: &str) -> Option<IpAddr> {
    let (addr, prefix) = s.split_once('/')?;
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let addr = addr.parse::<IpAddr>().ok()?;
    let prefix = prefix.parse::<u8>().ok()?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    (prefix <= max).then_some(addr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_ip_families() {
        assert!(is_ip("203.0.113.5"));
        assert!(is_ip("2001:db8::1"));
        assert!(is_ipv4("10.0.0.1"));
        assert!(!is_ipv4("2001:db8::1"));
        assert!(is_ipv6("::1"));
        assert!(!is_ipv6("10.0.0.1"));
        assert!(!is_ip("256.0.0.1"));
        assert!(!is_ip("localhost"));
    }

    #[test_case("00:1a:2b:3c:4d:5e", true)]
    #[test_case("00-1A-2B-3C-4D-5E", true)]
    #[test_case("001a.2b3c.4d5e", true)]
    #[test_case("00:1a:2b:3c:4d:5e:6f:70", true)]
    #[test_case("00:1a-2b:3c:4d:5e", false)]
    #[test_case("00:1a:2b:3c:4d", false)]
    fn test_mac(input: &str, expected: bool) {
        assert_eq!(is_mac(input), expected);
    }

    #[test]
    fn test_cidr() {
        assert!(is_cidr("192.168.0.0/16"));
        assert!(is_cidr("2001:db8::/32"));
        assert!(is_cidrv4("10.0.0.0/8"));
        assert!(!is_cidrv4("2001:db8::/32"));
        assert!(is_cidrv6("2001:db8::/128"));
        assert!(!is_cidr("10.0.0.0/33"));
        assert!(!is_cidr("10.0.0.0"));
        assert!(!is_cidr("10.0.0.0/+8"));
    }
}
