use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Answers whether the network is currently connected.
///
/// Polled once per tick. There is no event variant.
pub trait NetworkStatus {
    /// Is the network connected right now?
    fn is_connected(&self) -> bool;
}

impl<F: Fn() -> bool> NetworkStatus for F {
    fn is_connected(&self) -> bool {
        self()
    }
}

/// Use when the host has no notion of the network going away.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConnected;

impl NetworkStatus for AlwaysConnected {
    fn is_connected(&self) -> bool {
        true
    }
}

/// Considers the network connected if the OS has a route to some target.
///
/// A UDP socket is connected to the target, which only consults the routing table.
/// No traffic is sent.
#[derive(Debug, Clone, Copy)]
pub struct RouteProbe {
    target: SocketAddr,
}

impl RouteProbe {
    /// Probe for routes towards this target.
    pub fn new(target: SocketAddr) -> Self {
        Self { target }
    }
}

impl NetworkStatus for RouteProbe {
    fn is_connected(&self) -> bool {
        let local: SocketAddr = match self.target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let routed = UdpSocket::bind(local).and_then(|socket| socket.connect(self.target));

        if let Err(e) = &routed {
            trace!(?e, %self.target, "No route");
        }

        routed.is_ok()
    }
}

/// How the network readiness should be determined, as given in configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum NetworkCheck {
    /// See [`AlwaysConnected`].
    #[default]
    Always,

    /// See [`RouteProbe`].
    Route(SocketAddr),
}

impl NetworkStatus for NetworkCheck {
    fn is_connected(&self) -> bool {
        match self {
            NetworkCheck::Always => AlwaysConnected.is_connected(),
            NetworkCheck::Route(target) => RouteProbe::new(*target).is_connected(),
        }
    }
}
