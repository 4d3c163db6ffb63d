//! Validated addresses and address sets
//!
//! Feeds hand us loosely formatted text. Everything that reaches the
//! reconciler has already been parsed into an [`Address`], so an
//! [`AddressSet`] can only ever contain valid host addresses.

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::net::{AddrParseError, IpAddr};
use std::str::FromStr;

/// A validated IPv4 or IPv6 host address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(IpAddr);

impl Address {
    /// Wrap an already parsed IP address
    pub fn new(ip: IpAddr) -> Self {
        Self(ip)
    }

    /// The underlying IP address
    pub fn ip(&self) -> IpAddr {
        self.0
    }

    /// Host CIDR form used by the IP-set service (`/32` or `/128`)
    pub fn to_cidr(&self) -> String {
        IpNet::from(self.0).to_string()
    }
}

impl FromStr for Address {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<IpAddr>().map(Self)
    }
}

impl From<IpAddr> for Address {
    fn from(ip: IpAddr) -> Self {
        Self(ip)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A set of unique addresses
///
/// Built fresh on every run and never persisted. Iteration is ordered by
/// address so log output is stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressSet(BTreeSet<Address>);

impl AddressSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse each token as an address, dropping the ones that don't parse
    ///
    /// Returns the set and the number of dropped tokens.
    pub fn parse_lossy<'a, I>(tokens: I) -> (Self, usize)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut set = Self::new();
        let mut dropped = 0;

        for token in tokens {
            match token.parse::<Address>() {
                Ok(address) => {
                    set.insert(address);
                }
                Err(_) => {
                    tracing::debug!("Dropping malformed address: {:?}", token);
                    dropped += 1;
                }
            }
        }

        (set, dropped)
    }

    /// Insert an address, returning `false` if it was already present
    pub fn insert(&mut self, address: Address) -> bool {
        self.0.insert(address)
    }

    /// Check membership
    pub fn contains(&self, address: &Address) -> bool {
        self.0.contains(address)
    }

    /// Number of addresses
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in address order
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.0.iter()
    }

    /// Union with another set
    pub fn merge(mut self, other: AddressSet) -> AddressSet {
        self.0.extend(other.0);
        self
    }

    /// Host CIDR strings, ordered lexicographically
    pub fn to_cidr_set(&self) -> BTreeSet<String> {
        self.0.iter().map(Address::to_cidr).collect()
    }
}

impl FromIterator<Address> for AddressSet {
    fn from_iter<T: IntoIterator<Item = Address>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Address> for AddressSet {
    fn extend<T: IntoIterator<Item = Address>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}

impl IntoIterator for AddressSet {
    type Item = Address;
    type IntoIter = std::collections::btree_set::IntoIter<Address>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Union of two address sets
pub fn merge(a: AddressSet, b: AddressSet) -> AddressSet {
    a.merge(b)
}

/// Canonical text for a CIDR entry read back from the IP-set service
///
/// Entries that don't parse are returned trimmed but otherwise untouched,
/// so they still show up as a difference against the desired set.
pub fn canonical_cidr(raw: &str) -> String {
    let raw = raw.trim();
    raw.parse::<IpNet>()
        .map(|net| net.to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> AddressSet {
        items.iter().map(|s| s.parse::<Address>().unwrap()).collect()
    }

    #[test]
    fn test_merge_is_union() {
        let merged = merge(set(&["1.1.1.1", "2.2.2.2"]), set(&["2.2.2.2", "3.3.3.3"]));
        assert_eq!(merged, set(&["1.1.1.1", "2.2.2.2", "3.3.3.3"]));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_merge_ignores_argument_order() {
        let a = set(&["1.1.1.1", "2.2.2.2"]);
        let b = set(&["2.2.2.2", "3.3.3.3"]);
        assert_eq!(merge(a.clone(), b.clone()), merge(b, a));
    }

    #[test]
    fn test_address_is_canonicalized() {
        let a: Address = "  2001:DB8:0:0::1 ".parse().unwrap();
        assert_eq!(a.to_string(), "2001:db8::1");
    }

    #[test]
    fn test_cidr_suffix_per_family() {
        let v4: Address = "5.6.7.8".parse().unwrap();
        let v6: Address = "2001:db8::1".parse().unwrap();
        assert_eq!(v4.to_cidr(), "5.6.7.8/32");
        assert_eq!(v6.to_cidr(), "2001:db8::1/128");
    }

    #[test]
    fn test_cidr_set_is_lexicographic() {
        let cidrs: Vec<String> = set(&["9.9.9.9", "10.0.0.1", "2001:db8::1"])
            .to_cidr_set()
            .into_iter()
            .collect();
        assert_eq!(cidrs, vec!["10.0.0.1/32", "2001:db8::1/128", "9.9.9.9/32"]);
    }

    #[test]
    fn test_parse_lossy_drops_bad_tokens() {
        let (parsed, dropped) = AddressSet::parse_lossy(["1.2.3.4", "not-an-ip", "", "1.2.3.4"]);
        assert_eq!(parsed, set(&["1.2.3.4"]));
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_canonical_cidr() {
        assert_eq!(canonical_cidr("2001:DB8::1/128"), "2001:db8::1/128");
        assert_eq!(canonical_cidr(" 1.2.3.4/32"), "1.2.3.4/32");
        assert_eq!(canonical_cidr("garbage"), "garbage");
    }
}
