//! Contains the option types that can be given to the [`Server`](crate::Server).

use std::fmt::{self, Debug, Formatter};
use std::net::{IpAddr, Ipv4Addr};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const DEFAULT_GREETING: &str = "Welcome to the bucketftp FTP server";
pub(crate) const DEFAULT_IDLE_SESSION_TIMEOUT_SECS: u64 = 600;
pub(crate) const DEFAULT_PASSIVE_HOST: PassiveHost = PassiveHost::FromConnection;
pub(crate) const DEFAULT_PASSIVE_PORTS: RangeInclusive<u16> = 49152..=65535;

/// How the IP address communicated in the PASV reply is determined.
#[derive(Clone)]
pub enum PassiveHost {
    /// Use the IP address of the control connection.
    FromConnection,
    /// Advertise this specific IP address.
    Ip(Ipv4Addr),
    /// Ask the embedder, per connecting client. The usual use is WAN IP
    /// discovery or split horizon setups where internal clients should get
    /// the internal address.
    Resolver(Arc<dyn Fn(IpAddr) -> Ipv4Addr + Send + Sync>),
}

impl Debug for PassiveHost {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PassiveHost::FromConnection => write!(f, "FromConnection"),
            PassiveHost::Ip(ip) => write!(f, "Ip({})", ip),
            PassiveHost::Resolver(_) => write!(f, "Resolver(..)"),
        }
    }
}

impl PartialEq for PassiveHost {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PassiveHost::FromConnection, PassiveHost::FromConnection) => true,
            (PassiveHost::Ip(a), PassiveHost::Ip(b)) => a == b,
            _ => false,
        }
    }
}

impl From<Ipv4Addr> for PassiveHost {
    fn from(ip: Ipv4Addr) -> Self {
        PassiveHost::Ip(ip)
    }
}

impl From<[u8; 4]> for PassiveHost {
    fn from(ip: [u8; 4]) -> Self {
        PassiveHost::Ip(ip.into())
    }
}

/// An IPv4 network in CIDR form. Useful for [`PassiveHost::Resolver`]
/// closures that advertise an internal address to clients on the local
/// subnet and the WAN address to everyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Net {
    addr: Ipv4Addr,
    prefix: u8,
}

impl Ipv4Net {
    /// A network of `addr` with the given prefix length (0–32).
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Self {
        Ipv4Net { addr, prefix: prefix.min(32) }
    }

    fn mask_bits(&self) -> u32 {
        match self.prefix {
            0 => 0,
            p => u32::MAX << (32 - u32::from(p)),
        }
    }

    /// Applies the network mask to `ip`, yielding its network address.
    pub fn mask(&self, ip: Ipv4Addr) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(ip) & self.mask_bits())
    }

    /// Tells whether `ip` lies inside this network.
    pub fn contains(&self, ip: Ipv4Addr) -> bool {
        u32::from(ip) & self.mask_bits() == u32::from(self.addr) & self.mask_bits()
    }
}

/// The long-listing format used for LIST replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListFormat {
    /// Classic `ls -l` style lines.
    Ls,
    /// The Easily Parsed LIST Format (EPLF).
    Ep,
    /// RFC 3659 machine readable fact lines.
    Mlsd,
}

/// A sliding window rate limit: at most `max` events per `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    /// The number of events allowed inside the window.
    pub max: u32,
    /// The length of the window.
    pub window: Duration,
}

impl RateLimit {
    /// A limit of `max` events per `window`.
    pub fn new(max: u32, window: Duration) -> Self {
        RateLimit { max, window }
    }

    /// The default limit on connections per client IP: 30 per minute.
    pub fn connections_default() -> Self {
        RateLimit::new(30, Duration::from_secs(60))
    }

    /// The default limit on commands per session: 300 per minute.
    pub fn commands_default() -> Self {
        RateLimit::new(300, Duration::from_secs(60))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn net_mask_and_contains() {
        let net = Ipv4Net::new(Ipv4Addr::new(10, 1, 0, 0), 16);
        assert_eq!(net.mask(Ipv4Addr::new(10, 1, 2, 3)), Ipv4Addr::new(10, 1, 0, 0));
        assert!(net.contains(Ipv4Addr::new(10, 1, 255, 255)));
        assert!(!net.contains(Ipv4Addr::new(10, 2, 0, 1)));
    }

    #[test]
    fn masking_an_address_never_leaves_its_network() {
        // A network built from any address contains that address's masked
        // form, for every prefix length.
        for &ip in &[
            Ipv4Addr::new(192, 168, 1, 77),
            Ipv4Addr::new(8, 8, 8, 8),
            Ipv4Addr::new(255, 255, 255, 255),
            Ipv4Addr::new(0, 0, 0, 0),
        ] {
            for prefix in 0..=32 {
                let net = Ipv4Net::new(ip, prefix);
                assert!(net.contains(net.mask(ip)), "ip {} prefix {}", ip, prefix);
            }
        }
    }

    #[test]
    fn zero_prefix_contains_everything() {
        let net = Ipv4Net::new(Ipv4Addr::new(0, 0, 0, 0), 0);
        assert!(net.contains(Ipv4Addr::new(203, 0, 113, 9)));
    }
}
