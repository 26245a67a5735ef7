//! A mock transport.
//! Connections are made with [`MockTransport::connect`], which hands back a [`MockPeer`].
//! The peer decides what the bridge receives, and how its sends go.
//!
//! Useful for exercising exactly the conditions which are hard to provoke
//! with real sockets, such as a send that would block.

use std::{
    cell::RefCell,
    collections::VecDeque,
    io,
    net::{Ipv4Addr, SocketAddr},
    rc::Rc,
};

use super::{Stream, Transport};
use crate::error::Error;

/// What happens to the next send attempt on a [`MockStream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// The bytes are taken.
    Accept,

    /// The send would block, nothing is taken.
    WouldBlock,

    /// The send fails with this kind of error.
    Fail(io::ErrorKind),
}

#[derive(Debug)]
enum Inbound {
    Data(Vec<u8>),
    Closed,
    Error(io::ErrorKind),
}

#[derive(Debug, Default)]
struct PeerState {
    inbound: VecDeque<Inbound>,
    send_outcomes: VecDeque<SendOutcome>,
    received: Vec<u8>,
    closed: usize,
}

/// The remote side of a mock connection.
#[derive(Debug, Clone)]
pub struct MockPeer {
    state: Rc<RefCell<PeerState>>,
    addr: SocketAddr,
}

impl MockPeer {
    /// Send bytes; they arrive at the bridge in a single receive
    /// if its buffer is large enough.
    pub fn send(&self, bytes: &[u8]) {
        self.state
            .borrow_mut()
            .inbound
            .push_back(Inbound::Data(bytes.to_vec()));
    }

    /// Close orderly, after anything already sent.
    pub fn close(&self) {
        self.state.borrow_mut().inbound.push_back(Inbound::Closed);
    }

    /// Make the bridge's next receive (after anything already sent) fail.
    pub fn fail_recv(&self, kind: io::ErrorKind) {
        self.state
            .borrow_mut()
            .inbound
            .push_back(Inbound::Error(kind));
    }

    /// Decide the outcome of an upcoming send attempt.
    /// Attempts without a planned outcome are accepted.
    pub fn plan_send(&self, outcome: SendOutcome) {
        self.state.borrow_mut().send_outcomes.push_back(outcome);
    }

    /// All bytes the bridge managed to send to this peer.
    pub fn received(&self) -> Vec<u8> {
        self.state.borrow().received.clone()
    }

    /// How many times the bridge side of this connection was closed.
    pub fn close_count(&self) -> usize {
        self.state.borrow().closed
    }

    /// The address the bridge sees this peer as.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// The bridge's side of a mock connection.
#[derive(Debug)]
pub struct MockStream {
    state: Rc<RefCell<PeerState>>,
}

impl Stream for MockStream {
    fn send(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();

        match state.send_outcomes.pop_front().unwrap_or(SendOutcome::Accept) {
            SendOutcome::Accept => {
                state.received.extend_from_slice(buf);
                Ok(buf.len())
            }
            SendOutcome::WouldBlock => Err(io::ErrorKind::WouldBlock.into()),
            SendOutcome::Fail(kind) => Err(kind.into()),
        }
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.borrow_mut();

        match state.inbound.pop_front() {
            None => Err(io::ErrorKind::WouldBlock.into()),
            Some(Inbound::Data(mut data)) => {
                let taken = data.len().min(buf.len());
                buf[..taken].copy_from_slice(&data[..taken]);

                if taken < data.len() {
                    state.inbound.push_front(Inbound::Data(data.split_off(taken)));
                }

                Ok(taken)
            }
            Some(Inbound::Closed) => {
                // Stays closed.
                state.inbound.push_front(Inbound::Closed);
                Ok(0)
            }
            Some(Inbound::Error(kind)) => Err(kind.into()),
        }
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.state.borrow_mut().closed += 1;
    }
}

/// A listener handed out by [`MockTransport`].
#[derive(Debug)]
pub struct MockListener {
    port: u16,
}

#[derive(Debug, Default)]
struct Network {
    failing_listens: usize,
    listens: usize,
    accepts: usize,
    pending: VecDeque<(MockStream, SocketAddr)>,
    next_peer_port: u16,
}

/// See the module level docs.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    network: Rc<RefCell<Network>>,
}

impl MockTransport {
    /// Queue a new incoming connection.
    pub fn connect(&self) -> MockPeer {
        let mut network = self.network.borrow_mut();
        network.next_peer_port += 1;

        let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, 40_000 + network.next_peer_port));
        let state = Rc::new(RefCell::new(PeerState::default()));

        network.pending.push_back((
            MockStream {
                state: state.clone(),
            },
            addr,
        ));

        MockPeer { state, addr }
    }

    /// The next `count` listen attempts fail.
    pub fn fail_next_listens(&self, count: usize) {
        self.network.borrow_mut().failing_listens = count;
    }

    /// Successful listen attempts so far.
    pub fn listens(&self) -> usize {
        self.network.borrow().listens
    }

    /// Accept attempts so far, whether anything was pending or not.
    pub fn accepts(&self) -> usize {
        self.network.borrow().accepts
    }

    /// Connections queued but not yet accepted.
    pub fn pending(&self) -> usize {
        self.network.borrow().pending.len()
    }
}

impl Transport for MockTransport {
    type Listener = MockListener;
    type Stream = MockStream;

    fn listen(&mut self, port: u16) -> Result<MockListener, Error> {
        let mut network = self.network.borrow_mut();

        if network.failing_listens > 0 {
            network.failing_listens -= 1;
            return Err(Error::Bind {
                port,
                source: io::ErrorKind::AddrInUse.into(),
            });
        }

        network.listens += 1;
        Ok(MockListener { port })
    }

    fn accept(&mut self, _listener: &mut MockListener) -> io::Result<(MockStream, SocketAddr)> {
        let mut network = self.network.borrow_mut();
        network.accepts += 1;

        network
            .pending
            .pop_front()
            .ok_or_else(|| io::ErrorKind::WouldBlock.into())
    }

    fn local_addr(&self, listener: &MockListener) -> io::Result<SocketAddr> {
        Ok((Ipv4Addr::LOCALHOST, listener.port).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recv_splits_large_chunks() {
        let mut transport = MockTransport::default();
        let mut listener = transport.listen(1).unwrap();
        let peer = transport.connect();
        let (mut stream, addr) = transport.accept(&mut listener).unwrap();
        assert_eq!(addr, peer.addr());

        peer.send(&[1, 2, 3, 4, 5]);

        let mut buf = [0u8; 3];
        assert_eq!(stream.recv(&mut buf).unwrap(), 3);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(stream.recv(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[4, 5]);

        let e = stream.recv(&mut buf).unwrap_err();
        assert_eq!(e.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn closed_stays_closed() {
        let mut transport = MockTransport::default();
        let mut listener = transport.listen(1).unwrap();
        let peer = transport.connect();
        let (mut stream, _) = transport.accept(&mut listener).unwrap();

        peer.close();

        let mut buf = [0u8; 4];
        assert_eq!(stream.recv(&mut buf).unwrap(), 0);
        assert_eq!(stream.recv(&mut buf).unwrap(), 0);

        drop(stream);
        assert_eq!(peer.close_count(), 1);
    }

    #[test]
    fn planned_send_outcomes() {
        let mut transport = MockTransport::default();
        let mut listener = transport.listen(1).unwrap();
        let peer = transport.connect();
        let (mut stream, _) = transport.accept(&mut listener).unwrap();

        peer.plan_send(SendOutcome::WouldBlock);
        peer.plan_send(SendOutcome::Fail(io::ErrorKind::BrokenPipe));

        assert_eq!(
            stream.send(b"a").unwrap_err().kind(),
            io::ErrorKind::WouldBlock
        );
        assert_eq!(
            stream.send(b"b").unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
        assert_eq!(stream.send(b"c").unwrap(), 1);
        assert_eq!(peer.received(), b"c".to_vec());
    }

    #[test]
    fn listen_failures_are_counted_down() {
        let mut transport = MockTransport::default();
        transport.fail_next_listens(1);

        assert!(transport.listen(5).is_err());
        assert!(transport.listen(5).is_ok());
        assert_eq!(transport.listens(), 1);
    }
}
