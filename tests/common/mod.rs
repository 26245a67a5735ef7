#![allow(dead_code)]

use std::{
    net::{Ipv4Addr, SocketAddr, TcpListener},
    time::Duration,
};

use color_eyre::{eyre::eyre, Result};
use serial_bridge::{
    bridge::SerialBridge, logging, network::NetworkStatus, transport::TcpTransport,
    uart::mock::MockUart,
};
use tokio::{
    io::AsyncReadExt,
    net::TcpStream,
    time::{sleep, timeout, Instant},
};
use tracing::{info, Level};

pub type Bridge<'u, N> = SerialBridge<'u, MockUart, N, TcpTransport>;

pub async fn init_logging() {
    logging::init(Level::DEBUG, None).await;
}

/// A bridge over real TCP, on an arbitrary available port.
pub fn bridge<N: NetworkStatus>(uart: &mut MockUart, network: N) -> Bridge<'_, N> {
    SerialBridge::new(uart, network).set_port(0)
}

/// A port which was free a moment ago.
pub fn free_port() -> Result<u16> {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0))?;
    Ok(listener.local_addr()?.port())
}

/// Tick the bridge until the condition holds.
/// Sleeps a little between ticks to let the other side of the socket make progress.
pub async fn tick_until<'u, N: NetworkStatus>(
    bridge: &mut Bridge<'u, N>,
    what: &str,
    condition: impl Fn(&Bridge<'u, N>) -> bool,
) -> Result<()> {
    let deadline = Instant::now() + Duration::from_secs(5);

    loop {
        bridge.tick();

        if condition(&*bridge) {
            return Ok(());
        }

        if Instant::now() > deadline {
            return Err(eyre!("Timed out waiting for: {what}"));
        }

        sleep(Duration::from_millis(1)).await;
    }
}

/// Tick a fixed number of times, sleeping a little in between.
pub async fn tick_n<N: NetworkStatus>(bridge: &mut Bridge<'_, N>, ticks: usize) {
    for _ in 0..ticks {
        bridge.tick();
        sleep(Duration::from_millis(1)).await;
    }
}

fn loopback(addr: SocketAddr) -> SocketAddr {
    (Ipv4Addr::LOCALHOST, addr.port()).into()
}

/// Connect a client to the (listening) bridge and tick until it is accepted.
pub async fn connect<N: NetworkStatus>(bridge: &mut Bridge<'_, N>) -> Result<TcpStream> {
    let addr = bridge
        .local_addr()
        .ok_or_else(|| eyre!("Bridge is not listening"))?;

    info!("Connecting to bridge on {addr}");
    let client = TcpStream::connect(loopback(addr)).await?;

    tick_until(bridge, "client accepted", |bridge| bridge.has_client()).await?;

    Ok(client)
}

/// Connect without ticking any bridge, retrying until something listens.
pub async fn connect_when_listening(port: u16) -> Result<TcpStream> {
    let deadline = Instant::now() + Duration::from_secs(5);

    loop {
        match TcpStream::connect((Ipv4Addr::LOCALHOST, port)).await {
            Ok(stream) => return Ok(stream),
            Err(e) if Instant::now() > deadline => return Err(e.into()),
            Err(_) => sleep(Duration::from_millis(5)).await,
        }
    }
}

pub async fn read_exactly(client: &mut TcpStream, len: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    timeout(Duration::from_secs(5), client.read_exact(&mut buf)).await??;

    Ok(buf)
}
