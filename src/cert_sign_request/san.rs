use std::{
    collections::BTreeSet,
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

use log::debug;
use rcgen::SanType;

use super::CertError;
use crate::utils::Prompt;

/// A subject alternative name after classification.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AltName {
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Dns(String),
}

impl AltName {
    pub fn to_san_type(&self) -> Result<SanType, CertError> {
        match self {
            AltName::Ipv4(addr) => Ok(SanType::IpAddress(IpAddr::V4(*addr))),
            AltName::Ipv6(addr) => Ok(SanType::IpAddress(IpAddr::V6(*addr))),
            AltName::Dns(name) => name
                .clone()
                .try_into()
                .map(SanType::DnsName)
                .map_err(|_| CertError::InvalidDnsName(name.clone())),
        }
    }
}

impl From<IpAddr> for AltName {
    fn from(value: IpAddr) -> Self {
        match value {
            IpAddr::V4(addr) => AltName::Ipv4(addr),
            IpAddr::V6(addr) => AltName::Ipv6(addr),
        }
    }
}

impl fmt::Display for AltName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AltName::Ipv4(addr) => write!(f, "IP:{addr}"),
            AltName::Ipv6(addr) => write!(f, "IP:{addr}"),
            AltName::Dns(name) => write!(f, "DNS:{name}"),
        }
    }
}

fn parse_ipv4(name: &str) -> Option<Ipv4Addr> {
    name.parse().ok()
}

fn parse_ipv6(name: &str) -> Option<Ipv6Addr> {
    name.parse().ok()
}

/// IPv4 first, then IPv6, and whatever is left is taken as a DNS name
/// without any hostname checks.
pub fn classify(name: &str) -> AltName {
    if let Some(addr) = parse_ipv4(name) {
        AltName::Ipv4(addr)
    } else if let Some(addr) = parse_ipv6(name) {
        AltName::Ipv6(addr)
    } else {
        AltName::Dns(name.to_owned())
    }
}

/// The set of names that end up in the SAN extension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltNames {
    names: BTreeSet<String>,
}

impl AltNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the set from the resolved common name, if there is one.
    pub fn seeded(common_name: Option<&str>) -> Self {
        Self::new().with_name(common_name.unwrap_or_default())
    }

    /// Adds a trimmed name; blank names are ignored and repeats absorbed.
    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        let name = name.trim();
        if !name.is_empty() {
            self.names.insert(name.to_owned());
        }
        self
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn classify(&self) -> Vec<AltName> {
        self.iter()
            .map(|name| {
                let alt_name = classify(name);
                debug!("{name:?} classified as {alt_name}");
                alt_name
            })
            .collect()
    }

    pub fn to_san_types(&self) -> Result<Vec<SanType>, CertError> {
        self.classify().iter().map(AltName::to_san_type).collect()
    }
}

impl<'a> Extend<&'a str> for AltNames {
    fn extend<T: IntoIterator<Item = &'a str>>(&mut self, iter: T) {
        for name in iter {
            *self = std::mem::take(self).with_name(name);
        }
    }
}

pub fn get_alt_names_interactive(
    rl: &mut impl Prompt,
    mut names: AltNames,
) -> anyhow::Result<AltNames> {
    loop {
        let name = rl.read_line("Alternative name: ")?;
        if name.trim().is_empty() {
            break;
        }
        names = names.with_name(&name);
    }
    Ok(names)
}
