use std::{io, net::SocketAddr};

use tracing::{debug, error, info, trace, warn};

use crate::{
    component::{Component, SetupPriority},
    network::NetworkStatus,
    transport::{Stream, TcpTransport, Transport},
    uart::Uart,
};

/// The default port to listen on.
pub const DEFAULT_PORT: u16 = 8888;

/// How many bytes are received from the client per tick, at most.
pub const RECV_BUFFER_SIZE: usize = 64;

/// Counters kept over the lifetime of a bridge.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BridgeStats {
    /// Clients accepted.
    pub accepted: u64,

    /// Bytes read from the UART and sent to a client.
    pub to_client: u64,

    /// Bytes received from a client and written to the UART.
    pub to_uart: u64,

    /// Bytes read from the UART but dropped since the client was not ready for them.
    pub dropped: u64,
}

fn would_block(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
}

/// Exposes a [`Uart`] to a single TCP client.
///
/// Every [`SerialBridge::tick`] does, without blocking:
///
/// 1. Start listening, if not already listening and the network is connected.
/// 2. Accept a client, if none is connected.
/// 3. Send everything the UART has available to the client, one byte at a time.
/// 4. Receive once from the client and write it all to the UART.
///
/// The listener is kept once created.
/// Clients are dropped when they close, fail, or the network goes away.
pub struct SerialBridge<'u, U: ?Sized, N, T: Transport = TcpTransport> {
    uart: &'u mut U,
    network: N,
    transport: T,
    port: u16,
    listener: Option<T::Listener>,
    client: Option<T::Stream>,
    stats: BridgeStats,
}

impl<'u, U, N> SerialBridge<'u, U, N, TcpTransport>
where
    U: Uart + ?Sized,
    N: NetworkStatus,
{
    /// A bridge over TCP, on the [`DEFAULT_PORT`].
    pub fn new(uart: &'u mut U, network: N) -> Self {
        Self::with_transport(uart, network, TcpTransport::default())
    }
}

impl<'u, U, N, T> SerialBridge<'u, U, N, T>
where
    U: Uart + ?Sized,
    N: NetworkStatus,
    T: Transport,
{
    /// A bridge over some other transport, on the [`DEFAULT_PORT`].
    pub fn with_transport(uart: &'u mut U, network: N, transport: T) -> Self {
        Self {
            uart,
            network,
            transport,
            port: DEFAULT_PORT,
            listener: None,
            client: None,
            stats: BridgeStats::default(),
        }
    }

    /// Set the port to listen on.
    /// Only has an effect if not listening yet.
    pub fn set_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// The port the bridge was configured with.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Is the listener up?
    pub fn listening(&self) -> bool {
        self.listener.is_some()
    }

    /// Is a client connected?
    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// The address actually listened on, if listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        let listener = self.listener.as_ref()?;

        match self.transport.local_addr(listener) {
            Ok(addr) => Some(addr),
            Err(e) => {
                debug!(?e, "Could not get local address");
                None
            }
        }
    }

    /// See [`BridgeStats`].
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// A single non-blocking pass. See [`SerialBridge`].
    pub fn tick(&mut self) {
        let connected = self.network.is_connected();

        if self.listener.is_none() {
            if !connected {
                return;
            }

            self.start_listening();

            if self.listener.is_none() {
                return;
            }
        }

        if !connected {
            if self.client.is_some() {
                info!("Network lost, closing client");
                self.close_client();
            }
            return;
        }

        if self.client.is_none() {
            self.accept();
        }

        if self.client.is_some() && self.uart_to_client() {
            self.client_to_uart();
        }
    }

    fn start_listening(&mut self) {
        match self.transport.listen(self.port) {
            Ok(listener) => {
                self.listener = Some(listener);
                info!(port = self.port, "TCP server started");
            }
            Err(e) => {
                error!(?e, port = self.port, "Could not start TCP server, retrying next tick");
            }
        }
    }

    fn accept(&mut self) {
        let Some(listener) = self.listener.as_mut() else {
            return;
        };

        match self.transport.accept(listener) {
            Ok((stream, peer)) => {
                self.stats.accepted += 1;
                self.client = Some(stream);
                info!(%peer, "Client connected");
            }
            Err(e) if would_block(&e) => {}
            Err(e) => {
                debug!(?e, "Accept failed");
            }
        }
    }

    /// Drains the UART into the client.
    /// Returns false if the client was lost while doing so.
    fn uart_to_client(&mut self) -> bool {
        let Some(client) = self.client.as_mut() else {
            return false;
        };

        while self.uart.available() {
            let Some(byte) = self.uart.read_byte() else {
                trace!("UART had data available but read failed");
                break;
            };

            match client.send(&[byte]) {
                Ok(_) => self.stats.to_client += 1,
                Err(e) if would_block(&e) => {
                    self.stats.dropped += 1;
                    trace!(byte, "Client not ready, byte dropped");
                }
                Err(e) => {
                    debug!(?e, "Client disconnected (send failed)");
                    self.close_client();
                    return false;
                }
            }
        }

        true
    }

    fn client_to_uart(&mut self) {
        let Some(client) = self.client.as_mut() else {
            return;
        };

        let mut buffer = [0u8; RECV_BUFFER_SIZE];

        match client.recv(&mut buffer) {
            Ok(0) => {
                info!("Client disconnected");
                self.close_client();
            }
            Ok(received) => {
                for &byte in &buffer[..received] {
                    self.uart.write_byte(byte);
                }
                self.stats.to_uart += received as u64;
            }
            Err(e) if would_block(&e) => {}
            Err(e) => {
                warn!(?e, "Recv error, closing client");
                self.close_client();
            }
        }
    }

    fn close_client(&mut self) {
        if let Some(client) = self.client.take() {
            drop(client);
            debug!(stats = ?self.stats, "Client closed");
        }
    }
}

impl<U, N, T> Component for SerialBridge<'_, U, N, T>
where
    U: Uart + ?Sized,
    N: NetworkStatus,
    T: Transport,
{
    fn setup(&mut self) {
        info!(
            port = self.port,
            "Serial bridge component ready, will start server when the network connects"
        );
    }

    fn tick(&mut self) {
        SerialBridge::tick(self)
    }

    fn setup_priority(&self) -> SetupPriority {
        SetupPriority::AfterNetwork
    }
}
