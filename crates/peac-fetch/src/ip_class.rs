//! IP range classification per RFC 6890 plus extra ranges worth blocking
//! for SSRF purposes: TEST-NETs, benchmarking, CGNAT, IPv6 documentation
//! ranges, NAT64, and 6to4.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The security classification of an address a DNS answer resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpClass {
    /// Globally routable and not otherwise reserved.
    Public,
    /// Private, loopback, link-local, or another reserved range a
    /// publisher-controlled fetch must never be allowed to reach.
    Private,
}

/// Must equal the literal acknowledgement string before CGNAT
/// (100.64.0.0/10) addresses are treated as anything but [`IpClass::Private`].
pub const ACK_CGNAT: &str = "I_UNDERSTAND_CGNAT_SECURITY_RISKS";

/// Classify `addr`, treating the CGNAT range as private unless `ack_cgnat`
/// is exactly [`ACK_CGNAT`].
#[must_use]
pub fn classify_ip(addr: IpAddr, ack_cgnat: Option<&str>) -> IpClass {
    match addr {
        IpAddr::V4(v4) => classify_ipv4(v4, ack_cgnat),
        IpAddr::V6(v6) => classify_ipv6(v6, ack_cgnat),
    }
}

fn classify_ipv4(addr: Ipv4Addr, ack_cgnat: Option<&str>) -> IpClass {
    if addr.is_private()
        || addr.is_loopback()
        || addr.is_link_local()
        || addr.is_broadcast()
        || addr.is_documentation()
        || addr.is_unspecified()
    {
        return IpClass::Private;
    }
    let octets = addr.octets();
    // TEST-NET-1 192.0.2.0/24, TEST-NET-2 198.51.100.0/24, TEST-NET-3 203.0.113.0/24.
    if (octets[0] == 192 && octets[1] == 0 && octets[2] == 2)
        || (octets[0] == 198 && octets[1] == 51 && octets[2] == 100)
        || (octets[0] == 203 && octets[1] == 0 && octets[2] == 113)
    {
        return IpClass::Private;
    }
    // Benchmarking, 198.18.0.0/15.
    if octets[0] == 198 && (octets[1] == 18 || octets[1] == 19) {
        return IpClass::Private;
    }
    // CGNAT, 100.64.0.0/10.
    if octets[0] == 100 && (64..=127).contains(&octets[1]) {
        return if ack_cgnat == Some(ACK_CGNAT) {
            IpClass::Public
        } else {
            IpClass::Private
        };
    }
    IpClass::Public
}

fn classify_ipv6(addr: Ipv6Addr, ack_cgnat: Option<&str>) -> IpClass {
    if addr.is_loopback() || addr.is_unspecified() {
        return IpClass::Private;
    }
    // Unique local addresses, fc00::/7.
    if (addr.segments()[0] & 0xfe00) == 0xfc00 {
        return IpClass::Private;
    }
    // Link-local, fe80::/10.
    if (addr.segments()[0] & 0xffc0) == 0xfe80 {
        return IpClass::Private;
    }
    // Documentation: 2001:db8::/32 (legacy) and 3fff::/20.
    if addr.segments()[0] == 0x2001 && addr.segments()[1] == 0x0db8 {
        return IpClass::Private;
    }
    if (addr.segments()[0] & 0xfff0) == 0x3fff {
        return IpClass::Private;
    }
    // 6to4, 2002::/16.
    if addr.segments()[0] == 0x2002 {
        return IpClass::Private;
    }
    // NAT64 well-known prefix, 64:ff9b::/96.
    if addr.segments()[0..6] == [0x0064, 0xff9b, 0, 0, 0, 0] {
        let v4_mapped = Ipv4Addr::new(
            (addr.segments()[6] >> 8) as u8,
            (addr.segments()[6] & 0xff) as u8,
            (addr.segments()[7] >> 8) as u8,
            (addr.segments()[7] & 0xff) as u8,
        );
        return classify_ipv4(v4_mapped, ack_cgnat);
    }
    // IPv4-mapped addresses, ::ffff:0:0/96.
    if let Some(v4) = addr.to_ipv4_mapped() {
        return classify_ipv4(v4, ack_cgnat);
    }
    IpClass::Public
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_rfc1918_private_ranges() {
        assert_eq!(
            classify_ip("10.0.0.1".parse().unwrap(), None),
            IpClass::Private
        );
        assert_eq!(
            classify_ip("172.16.0.1".parse().unwrap(), None),
            IpClass::Private
        );
        assert_eq!(
            classify_ip("192.168.1.1".parse().unwrap(), None),
            IpClass::Private
        );
    }

    #[test]
    fn classifies_loopback_and_link_local() {
        assert_eq!(
            classify_ip("127.0.0.1".parse().unwrap(), None),
            IpClass::Private
        );
        assert_eq!(
            classify_ip("169.254.1.1".parse().unwrap(), None),
            IpClass::Private
        );
    }

    #[test]
    fn classifies_test_nets() {
        assert_eq!(
            classify_ip("192.0.2.1".parse().unwrap(), None),
            IpClass::Private
        );
        assert_eq!(
            classify_ip("198.51.100.1".parse().unwrap(), None),
            IpClass::Private
        );
        assert_eq!(
            classify_ip("203.0.113.1".parse().unwrap(), None),
            IpClass::Private
        );
    }

    #[test]
    fn classifies_benchmarking_range() {
        assert_eq!(
            classify_ip("198.18.0.1".parse().unwrap(), None),
            IpClass::Private
        );
        assert_eq!(
            classify_ip("198.19.255.255".parse().unwrap(), None),
            IpClass::Private
        );
    }

    #[test]
    fn cgnat_is_private_without_ack() {
        assert_eq!(
            classify_ip("100.64.0.1".parse().unwrap(), None),
            IpClass::Private
        );
    }

    #[test]
    fn cgnat_is_public_with_exact_ack() {
        assert_eq!(
            classify_ip("100.64.0.1".parse().unwrap(), Some(ACK_CGNAT)),
            IpClass::Public
        );
    }

    #[test]
    fn cgnat_ignores_wrong_ack_string() {
        assert_eq!(
            classify_ip("100.64.0.1".parse().unwrap(), Some("yes")),
            IpClass::Private
        );
    }

    #[test]
    fn classifies_public_ipv4() {
        assert_eq!(
            classify_ip("8.8.8.8".parse().unwrap(), None),
            IpClass::Public
        );
    }

    #[test]
    fn classifies_ipv6_documentation_ranges() {
        assert_eq!(
            classify_ip("2001:db8::1".parse().unwrap(), None),
            IpClass::Private
        );
        assert_eq!(
            classify_ip("3fff::1".parse().unwrap(), None),
            IpClass::Private
        );
    }

    #[test]
    fn classifies_ipv6_unique_local_and_link_local() {
        assert_eq!(classify_ip("fc00::1".parse().unwrap(), None), IpClass::Private);
        assert_eq!(classify_ip("fe80::1".parse().unwrap(), None), IpClass::Private);
    }

    #[test]
    fn classifies_6to4_and_nat64() {
        assert_eq!(classify_ip("2002::1".parse().unwrap(), None), IpClass::Private);
        // 64:ff9b::7f00:1 embeds 127.0.0.1 (loopback, private).
        assert_eq!(
            classify_ip("64:ff9b::7f00:1".parse().unwrap(), None),
            IpClass::Private
        );
    }

    #[test]
    fn classifies_public_ipv6() {
        assert_eq!(
            classify_ip("2606:4700:4700::1111".parse().unwrap(), None),
            IpClass::Public
        );
    }
}
