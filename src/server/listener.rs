// Listener module
// Creates the TCP listener with socket options applied before bind

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Pending-connection queue length passed to `listen`
const BACKLOG: i32 = 1024;

/// Create a non-blocking `TcpListener` with `SO_REUSEADDR` enabled.
///
/// Rebinding a port still in `TIME_WAIT` succeeds, so a restarted server
/// comes back on the same address immediately. Port `0` binds an ephemeral
/// port; read it back with `local_addr`.
pub fn create_reusable_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(BACKLOG)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}
