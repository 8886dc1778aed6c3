//! Happy Eyeballs (RFC 8305) address racing: given a set of candidate
//! addresses ordered IPv6-first, race a TCP connect to the first IPv6
//! candidate against the first IPv4 candidate, giving IPv6 a 250ms head
//! start, and cancel whichever attempt loses.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;

const IPV6_HEAD_START: Duration = Duration::from_millis(250);

/// Race a connect to the winning address among `addrs` (already ordered
/// IPv6-first by the caller), returning the first successfully connected
/// stream and the address it connected to. The loser's in-flight attempt
/// is dropped (and with it, cancelled) once a winner is established.
pub async fn connect_preferring_ipv6(
    addrs: &[IpAddr],
    port: u16,
) -> std::io::Result<(TcpStream, SocketAddr)> {
    let v6 = addrs.iter().find(|a| a.is_ipv6()).copied();
    let v4 = addrs.iter().find(|a| a.is_ipv4()).copied();

    match (v6, v4) {
        (Some(v6), Some(v4)) => race(v6, v4, port).await,
        (Some(only), None) | (None, Some(only)) => {
            let addr = SocketAddr::new(only, port);
            TcpStream::connect(addr).await.map(|s| (s, addr))
        }
        (None, None) => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "no candidate addresses to connect to",
        )),
    }
}

async fn race(v6: IpAddr, v4: IpAddr, port: u16) -> std::io::Result<(TcpStream, SocketAddr)> {
    let v6_addr = SocketAddr::new(v6, port);
    let v4_addr = SocketAddr::new(v4, port);

    let v6_attempt = TcpStream::connect(v6_addr);
    let v4_attempt = async {
        tokio::time::sleep(IPV6_HEAD_START).await;
        TcpStream::connect(v4_addr).await
    };

    tokio::select! {
        result = v6_attempt => result.map(|s| (s, v6_addr)),
        result = v4_attempt => result.map(|s| (s, v4_addr)),
    }
}
