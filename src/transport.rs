use std::{
    io::{self, Read, Write},
    net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream},
};

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::Error;

/// An in-memory transport with scriptable peers.
pub mod mock;

/// A connected, non-blocking byte stream.
///
/// Both operations return [`io::ErrorKind::WouldBlock`] instead of waiting.
pub trait Stream {
    /// Send some bytes. Returns how many were taken.
    fn send(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Receive into the given buffer.
    /// `Ok(0)` means the peer closed the connection.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Creates listeners and accepts connections from them.
///
/// Resources are released by dropping them.
pub trait Transport {
    /// A listening endpoint.
    type Listener;

    /// A connection accepted from a [`Transport::Listener`].
    type Stream: Stream;

    /// Start listening on all interfaces on the given port.
    /// The listener must be non-blocking.
    fn listen(&mut self, port: u16) -> Result<Self::Listener, Error>;

    /// Accept a pending connection, if any.
    /// The returned stream must be non-blocking.
    fn accept(&mut self, listener: &mut Self::Listener) -> io::Result<(Self::Stream, SocketAddr)>;

    /// Where the listener ended up being bound.
    fn local_addr(&self, listener: &Self::Listener) -> io::Result<SocketAddr>;
}

/// Plain TCP, on IPv4.
#[derive(Debug, Clone, Copy)]
pub struct TcpTransport {
    backlog: i32,
}

impl TcpTransport {
    /// The listen backlog used unless told otherwise.
    /// There is only ever one client, so there is no use in queueing more.
    pub const DEFAULT_BACKLOG: i32 = 1;

    /// Use a different listen backlog.
    pub fn set_backlog(mut self, backlog: i32) -> Self {
        self.backlog = backlog;
        self
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self {
            backlog: Self::DEFAULT_BACKLOG,
        }
    }
}

impl Transport for TcpTransport {
    type Listener = TcpListener;
    type Stream = TcpStream;

    fn listen(&mut self, port: u16) -> Result<TcpListener, Error> {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));

        // On early return the socket is dropped, which closes it.
        let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
            .map_err(Error::Socket)?;
        socket
            .set_reuse_address(true)
            .map_err(Error::SocketOption)?;
        socket
            .bind(&addr.into())
            .map_err(|source| Error::Bind { port, source })?;
        socket
            .listen(self.backlog)
            .map_err(|source| Error::Listen { port, source })?;
        socket.set_nonblocking(true).map_err(Error::NonBlocking)?;

        Ok(socket.into())
    }

    fn accept(&mut self, listener: &mut TcpListener) -> io::Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = listener.accept()?;
        stream.set_nonblocking(true)?;

        Ok((stream, peer))
    }

    fn local_addr(&self, listener: &TcpListener) -> io::Result<SocketAddr> {
        listener.local_addr()
    }
}

impl Stream for TcpStream {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write(buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    #[test]
    fn listener_does_not_block() {
        let mut transport = TcpTransport::default();
        let mut listener = transport.listen(0).unwrap();

        let e = transport.accept(&mut listener).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn occupied_port_fails_bind() {
        let mut transport = TcpTransport::default();
        let first = transport.listen(0).unwrap();
        let port = transport.local_addr(&first).unwrap().port();

        // Address reuse does not allow two active listeners on the same port.
        let e = transport.listen(port).unwrap_err();
        assert!(matches!(e, Error::Bind { port: p, .. } if p == port));
    }

    #[test]
    fn accepted_stream_does_not_block() {
        let mut transport = TcpTransport::default();
        let mut listener = transport.listen(0).unwrap();
        let port = transport.local_addr(&listener).unwrap().port();

        let _client = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).unwrap();

        let mut accepted = None;
        for _ in 0..500 {
            match transport.accept(&mut listener) {
                Ok((stream, _)) => {
                    accepted = Some(stream);
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(2))
                }
                Err(e) => panic!("Unexpected accept error: {e:?}"),
            }
        }

        let mut stream = accepted.expect("Client should be accepted");
        let mut buf = [0u8; 8];
        let e = stream.recv(&mut buf).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::WouldBlock);
    }
}
