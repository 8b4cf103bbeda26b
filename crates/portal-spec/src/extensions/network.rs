use std::net::Ipv4Addr;

use serde_json::Value;

pub const INDEX_OUT_OF_RANGE: &str = "Index out of range";
pub const NETMASK_UNKNOWN: &str = "Cannot determine netmask";

const DEFAULT_PREFIX: u8 = 24;

/// IPv4 network with its host bits cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ipv4Net {
    base: u32,
    prefix: u8,
}

impl Ipv4Net {
    /// Parses `addr[/prefix]`; a bare address implies `/24`, the prefix may also
    /// be spelled as a dotted netmask.
    fn parse(net: &str) -> Option<Self> {
        let net = net.trim();
        let (host, prefix) = match net.split_once('/') {
            Some((host, prefix)) => (host, parse_prefix(prefix)?),
            None => (net, DEFAULT_PREFIX),
        };
        let addr: Ipv4Addr = host.parse().ok()?;
        Some(Self {
            base: u32::from(addr) & mask_bits(prefix),
            prefix,
        })
    }

    fn mask(&self) -> Ipv4Addr {
        Ipv4Addr::from(mask_bits(self.prefix))
    }

    /// First usable host and number of usable hosts.
    fn hosts(&self) -> (u32, u64) {
        match self.prefix {
            32 => (self.base, 1),
            31 => (self.base, 2),
            prefix => (self.base + 1, (1u64 << (32 - prefix)) - 2),
        }
    }

    /// Address of the 1-based `index`-th usable host.
    fn host(&self, index: i64) -> Option<Ipv4Addr> {
        let (first, count) = self.hosts();
        let offset = u64::try_from(index).ok()?.checked_sub(1)?;
        if offset >= count {
            return None;
        }
        u32::try_from(offset)
            .ok()
            .map(|offset| Ipv4Addr::from(first + offset))
    }
}

fn parse_prefix(raw: &str) -> Option<u8> {
    if let Ok(prefix) = raw.parse::<u8>() {
        return (prefix <= 32).then_some(prefix);
    }
    let bits = u32::from(raw.parse::<Ipv4Addr>().ok()?);
    let ones = bits.leading_ones();
    (bits.checked_shl(ones).unwrap_or(0) == 0).then(|| ones as u8)
}

fn mask_bits(prefix: u8) -> u32 {
    match prefix {
        0 => 0,
        prefix => u32::MAX << (32 - u32::from(prefix)),
    }
}

/// Address of the `index`-th usable host (1-based) inside `net`.
///
/// Returns an empty string for an empty network, [`INDEX_OUT_OF_RANGE`] when
/// the network has fewer hosts, and the bare address part of `net` when
/// either argument cannot be parsed.
pub fn subnet(net: &str, index: &Value) -> String {
    if net.trim().is_empty() {
        return String::new();
    }
    let base_address = || net.split('/').next().unwrap_or(net).trim().to_string();

    let Some(network) = Ipv4Net::parse(net) else {
        return base_address();
    };
    let Some(index) = host_index(index) else {
        return base_address();
    };
    match network.host(index) {
        Some(addr) => addr.to_string(),
        None => INDEX_OUT_OF_RANGE.to_string(),
    }
}

/// Dotted-quad netmask of `net`, or [`NETMASK_UNKNOWN`].
pub fn netmask(net: &str) -> String {
    if net.trim().is_empty() {
        return String::new();
    }
    match Ipv4Net::parse(net) {
        Some(network) => network.mask().to_string(),
        None => NETMASK_UNKNOWN.to_string(),
    }
}

fn host_index(index: &Value) -> Option<i64> {
    match index {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subnet_picks_hosts_by_one_based_index() {
        assert_eq!(subnet("192.168.1.0/24", &json!(1)), "192.168.1.1");
        assert_eq!(subnet("192.168.1.0/24", &json!(254)), "192.168.1.254");
        assert_eq!(subnet("10.0.0.0/16", &json!("256")), "10.0.1.0");
    }

    #[test]
    fn subnet_defaults_to_slash_24() {
        assert_eq!(subnet("172.16.10.7", &json!(10)), "172.16.10.10");
    }

    #[test]
    fn subnet_reports_out_of_range() {
        assert_eq!(subnet("192.168.1.0/24", &json!(255)), INDEX_OUT_OF_RANGE);
        assert_eq!(subnet("192.168.1.0/24", &json!(1000)), INDEX_OUT_OF_RANGE);
        assert_eq!(subnet("192.168.1.0/24", &json!(0)), INDEX_OUT_OF_RANGE);
    }

    #[test]
    fn subnet_falls_back_to_base_address() {
        assert_eq!(subnet("", &json!(1)), "");
        assert_eq!(subnet("not-a-net/24", &json!(1)), "not-a-net");
        assert_eq!(subnet("10.0.0.0/24", &json!("first")), "10.0.0.0");
    }

    #[test]
    fn small_networks_use_every_address() {
        assert_eq!(subnet("10.0.0.4/31", &json!(2)), "10.0.0.5");
        assert_eq!(subnet("10.0.0.4/32", &json!(1)), "10.0.0.4");
    }

    #[test]
    fn netmask_from_prefix_or_mask() {
        assert_eq!(netmask("10.0.0.0/24"), "255.255.255.0");
        assert_eq!(netmask("10.0.0.0/255.255.0.0"), "255.255.0.0");
        assert_eq!(netmask("10.0.0.1"), "255.255.255.0");
        assert_eq!(netmask("10.0.0.0/33"), NETMASK_UNKNOWN);
        assert_eq!(netmask("10.0.0.0/255.0.255.0"), NETMASK_UNKNOWN);
        assert_eq!(netmask(""), "");
    }
}
