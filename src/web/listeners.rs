use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::net::TcpListener;

const LISTEN_BACKLOG: i32 = 1024;

/// Binds the HTTP listener. `*` means every interface, preferring an IPv6
/// dual-stack socket and falling back to IPv4 when IPv6 is unavailable.
pub async fn create_listener(host: &str, port: u16) -> std::io::Result<(String, TcpListener)> {
    if host == "*" {
        return bind_wildcard(port);
    }

    let addr = format!("{}:{}", host, port);
    tracing::info!("Binding listener to {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    Ok((addr, listener))
}

fn bind_wildcard(port: u16) -> std::io::Result<(String, TcpListener)> {
    match bind_socket(SocketAddr::from((Ipv6Addr::UNSPECIFIED, port))) {
        Ok(bound) => Ok(bound),
        Err(e) => {
            tracing::warn!("IPv6 wildcard bind failed ({}), retrying on IPv4 only", e);
            bind_socket(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
        }
    }
}

fn bind_socket(addr: SocketAddr) -> std::io::Result<(String, TcpListener)> {
    let domain = if addr.is_ipv6() {
        Domain::IPV6
    } else {
        Domain::IPV4
    };
    tracing::info!("Binding listener to {}", addr);

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if addr.is_ipv6() {
        // Not every platform allows dual-stack; an IPv6-only socket is still usable
        if let Err(e) = socket.set_only_v6(false) {
            tracing::warn!("Could not enable dual-stack on {}: {}", addr, e);
        }
    }
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;

    let listener = TcpListener::from_std(socket.into())?;
    Ok((addr.to_string(), listener))
}
