//! The passive port allocator. Hands out one port at a time from the
//! configured range, never the same port twice while it is leased, and
//! walks past ports the OS reports as busy.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::ops::RangeInclusive;
use std::sync::{Arc, Mutex};
use tokio::net::{TcpListener, TcpSocket};

// How many candidate ports we try before reporting the range exhausted.
const MAX_PROBE_ATTEMPTS: usize = 5;

/// A process wide allocator for the passive port range.
#[derive(Debug)]
pub struct PortPool {
    range: RangeInclusive<u16>,
    state: Mutex<PoolState>,
}

#[derive(Debug)]
struct PoolState {
    // Cursor into the range; allocation walks round-robin from here.
    cursor: u16,
    // Ports currently leased out.
    in_use: HashSet<u16>,
}

/// A leased port. Dropping the lease returns the port to the pool.
#[derive(Debug)]
pub struct PortLease {
    port: u16,
    pool: Arc<PortPool>,
}

impl PortLease {
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for PortLease {
    fn drop(&mut self) {
        let mut state = self.pool.state.lock().expect("port pool lock");
        state.in_use.remove(&self.port);
    }
}

impl PortPool {
    pub fn new(range: RangeInclusive<u16>) -> Arc<Self> {
        let cursor = *range.start();
        Arc::new(PortPool {
            range,
            state: Mutex::new(PoolState {
                cursor,
                in_use: HashSet::new(),
            }),
        })
    }

    // Reserves the next free port, advancing the cursor. None if every port
    // in the range is leased.
    fn reserve(self: &Arc<Self>) -> Option<PortLease> {
        let span = (*self.range.end() - *self.range.start()) as u32 + 1;
        let mut state = self.state.lock().expect("port pool lock");
        for _ in 0..span {
            let candidate = state.cursor;
            state.cursor = if candidate == *self.range.end() { *self.range.start() } else { candidate + 1 };
            if state.in_use.insert(candidate) {
                return Some(PortLease {
                    port: candidate,
                    pool: Arc::clone(self),
                });
            }
        }
        None
    }

    /// Binds a listener on `ip` and a leased port from the range, with a
    /// backlog of one: exactly one inbound data connection is expected.
    /// Ports the OS rejects (typically `EADDRINUSE` from another process)
    /// are skipped, up to a bounded number of attempts.
    pub async fn bind(self: &Arc<Self>, ip: IpAddr) -> io::Result<(TcpListener, PortLease)> {
        let mut last_err = io::Error::new(io::ErrorKind::AddrInUse, "no free port in passive range");
        for _ in 0..MAX_PROBE_ATTEMPTS {
            let lease = match self.reserve() {
                Some(lease) => lease,
                None => return Err(io::Error::new(io::ErrorKind::AddrInUse, "passive port range exhausted")),
            };
            match Self::listen_on(SocketAddr::new(ip, lease.port())) {
                Ok(listener) => return Ok((listener, lease)),
                Err(e) => {
                    last_err = e;
                    // lease drops here, freeing the port for other sessions
                }
            }
        }
        Err(last_err)
    }

    fn listen_on(addr: SocketAddr) -> io::Result<TcpListener> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        socket.listen(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_port_is_handed_out_twice_while_leased() {
        let pool = PortPool::new(40000..=40003);
        let leases: Vec<PortLease> = (0..4).map(|_| pool.reserve().unwrap()).collect();
        let mut ports: Vec<u16> = leases.iter().map(|l| l.port()).collect();
        ports.sort_unstable();
        assert_eq!(ports, vec![40000, 40001, 40002, 40003]);
        assert!(pool.reserve().is_none());
    }

    #[test]
    fn dropping_a_lease_returns_the_port() {
        let pool = PortPool::new(40010..=40010);
        let lease = pool.reserve().unwrap();
        assert!(pool.reserve().is_none());
        drop(lease);
        assert_eq!(pool.reserve().unwrap().port(), 40010);
    }

    #[tokio::test]
    async fn bind_skips_busy_ports() {
        let pool = PortPool::new(41200..=41204);
        // Occupy the first port of the range outside of the pool.
        let _squatter = TcpListener::bind("127.0.0.1:41200").await.unwrap();
        let (listener, lease) = pool.bind("127.0.0.1".parse().unwrap()).await.unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 41200);
        assert_eq!(listener.local_addr().unwrap().port(), lease.port());
    }

    #[tokio::test]
    async fn concurrent_binds_get_distinct_ports() {
        let pool = PortPool::new(41300..=41310);
        let a = pool.bind("127.0.0.1".parse().unwrap()).await.unwrap();
        let b = pool.bind("127.0.0.1".parse().unwrap()).await.unwrap();
        assert_ne!(a.1.port(), b.1.port());
    }
}
