//! TCP transport

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use vscard_core::{frame, LENGTH_SIZE, OPCODE_SIZE};

use crate::{error::*, Transport};

/// One live connection to the reader driver
///
/// The halves sit behind their own async locks so a reader blocked on the
/// socket never holds the slot lock in [`TcpTransport`]; `closed` is
/// cancelled by `disconnect()` to abort whatever is pending on either half.
struct Conn {
    peer: SocketAddr,
    reader: Arc<tokio::sync::Mutex<OwnedReadHalf>>,
    writer: Arc<tokio::sync::Mutex<OwnedWriteHalf>>,
    closed: CancellationToken,
}

/// TCP transport to the virtual reader driver
///
/// Holds at most one connection at a time. The connection slot is replaced
/// wholesale by `reconnect()`; concurrent reads observe a single
/// connection-closed error and pick up the new connection on their next call.
pub struct TcpTransport {
    addr: String,
    port: u16,
    connect_timeout: Duration,
    conn: Mutex<Option<Conn>>,
}

impl TcpTransport {
    /// Create a new TCP transport
    pub fn new(addr: impl Into<String>, port: u16) -> Self {
        Self {
            addr: addr.into(),
            port,
            connect_timeout: Duration::from_secs(5),
            conn: Mutex::new(None),
        }
    }

    /// Set connection timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Resolve the configured host:port to a socket address
    async fn resolve_addr(&self) -> Result<SocketAddr> {
        let addr_str = format!("{}:{}", self.addr, self.port);

        let addrs: Vec<SocketAddr> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", addr_str, e)))?
            .collect();

        addrs
            .first()
            .copied()
            .ok_or_else(|| Error::InvalidAddress(format!("No addresses found for {}", addr_str)))
    }

    /// Grab the read half of the current connection
    fn reader(&self) -> Result<(Arc<tokio::sync::Mutex<OwnedReadHalf>>, CancellationToken)> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(Error::NotConnected)?;
        Ok((Arc::clone(&conn.reader), conn.closed.clone()))
    }

    /// Grab the write half of the current connection
    fn writer(&self) -> Result<(Arc<tokio::sync::Mutex<OwnedWriteHalf>>, CancellationToken)> {
        let guard = self.conn.lock();
        let conn = guard.as_ref().ok_or(Error::NotConnected)?;
        Ok((Arc::clone(&conn.writer), conn.closed.clone()))
    }

    /// Fill `buf` from the read half, aborting if the connection is closed
    async fn read_exact(
        half: &mut OwnedReadHalf,
        closed: &CancellationToken,
        buf: &mut [u8],
    ) -> Result<()> {
        tokio::select! {
            biased;
            _ = closed.cancelled() => Err(Error::ConnectionClosed),
            res = half.read_exact(buf) => match res {
                Ok(_) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    Err(Error::ConnectionClosed)
                }
                Err(e) => Err(Error::Io(e)),
            },
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        let addr = self.resolve_addr().await?;

        debug!("Connecting to {}...", addr);

        let stream = timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| Error::ConnectionTimeout)?
            .map_err(Error::Io)?;

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        debug!("Connected to {}", addr);

        let (read_half, write_half) = stream.into_split();
        *self.conn.lock() = Some(Conn {
            peer: addr,
            reader: Arc::new(tokio::sync::Mutex::new(read_half)),
            writer: Arc::new(tokio::sync::Mutex::new(write_half)),
            closed: CancellationToken::new(),
        });

        Ok(())
    }

    async fn disconnect(&self) {
        let conn = self.conn.lock().take();

        if let Some(conn) = conn {
            debug!("Disconnecting from {}...", conn.peer);

            // Unblock any read or write pending on this connection
            conn.closed.cancel();

            // Graceful shutdown; the socket fully closes once both halves drop
            let mut writer = conn.writer.lock().await;
            let _ = writer.shutdown().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.conn.lock().is_some()
    }

    async fn read_command(&self) -> Result<u8> {
        let (reader, closed) = self.reader()?;
        let mut half = reader.lock().await;

        let mut opcode = [0u8; OPCODE_SIZE];
        Self::read_exact(&mut half, &closed, &mut opcode).await?;

        trace!("Received command opcode 0x{:02X}", opcode[0]);

        Ok(opcode[0])
    }

    async fn read_data(&self) -> Result<Bytes> {
        let (reader, closed) = self.reader()?;
        // Hold the read half for the whole frame so a racing reconnect cannot
        // interleave the prefix and payload across two connections
        let mut half = reader.lock().await;

        let mut prefix = [0u8; LENGTH_SIZE];
        Self::read_exact(&mut half, &closed, &mut prefix).await?;

        let len = frame::payload_len(prefix);
        let mut payload = BytesMut::zeroed(len);
        Self::read_exact(&mut half, &closed, &mut payload).await?;

        trace!("Received {} bytes: {:02X?}", len, &payload[..len.min(16)]);

        Ok(payload.freeze())
    }

    async fn write_data(&self, data: &[u8]) -> Result<()> {
        let framed = frame::encode(data)?;
        let (writer, closed) = self.writer()?;
        let mut half = writer.lock().await;

        trace!("Sending {} bytes: {:02X?}", data.len(), &data[..data.len().min(16)]);

        tokio::select! {
            biased;
            _ = closed.cancelled() => return Err(Error::ConnectionClosed),
            res = async {
                half.write_all(&framed).await?;
                half.flush().await
            } => res?,
        }

        Ok(())
    }

    fn remote_addr(&self) -> String {
        self.conn
            .lock()
            .as_ref()
            .map(|conn| conn.peer.to_string())
            .unwrap_or_else(|| format!("{}:{}", self.addr, self.port))
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("TCP transport dropped while still connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::net::TcpListener;

    async fn driver_listener() -> (TcpListener, String, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr.ip().to_string(), addr.port())
    }

    #[tokio::test]
    async fn test_not_connected_fails_fast() {
        let transport = TcpTransport::new("127.0.0.1", 1);

        assert!(!transport.is_connected());
        assert!(matches!(
            transport.read_command().await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            transport.read_data().await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(
            transport.write_data(&[0x90, 0x00]).await,
            Err(Error::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let (listener, host, port) = driver_listener().await;
        drop(listener);

        let transport = TcpTransport::new(host, port);
        assert!(transport.connect().await.is_err());
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_connect_twice() {
        let (listener, host, port) = driver_listener().await;
        let transport = TcpTransport::new(host, port);

        transport.connect().await.unwrap();
        let _driver = listener.accept().await.unwrap();

        assert!(transport.is_connected());
        assert!(matches!(
            transport.connect().await,
            Err(Error::AlreadyConnected)
        ));
    }

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let (listener, host, port) = driver_listener().await;
        let transport = TcpTransport::new(host, port);
        transport.connect().await.unwrap();
        let (mut driver, _) = listener.accept().await.unwrap();

        // Bridge to driver: length prefix then payload, nothing else
        transport.write_data(&[0x90, 0x00]).await.unwrap();
        let mut buf = [0u8; 4];
        driver.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x00, 0x02, 0x90, 0x00]);

        // Driver to bridge: empty payload
        driver.write_all(&[0x00, 0x00]).await.unwrap();
        assert!(transport.read_data().await.unwrap().is_empty());

        // Driver to bridge: APDU payload
        driver
            .write_all(&[0x00, 0x04, 0x00, 0xA4, 0x04, 0x00])
            .await
            .unwrap();
        let payload = transport.read_data().await.unwrap();
        assert_eq!(payload.as_ref(), &[0x00, 0xA4, 0x04, 0x00]);
    }

    #[tokio::test]
    async fn test_read_command() {
        let (listener, host, port) = driver_listener().await;
        let transport = TcpTransport::new(host, port);
        transport.connect().await.unwrap();
        let (mut driver, _) = listener.accept().await.unwrap();

        driver.write_all(&[0x04, 0x0A]).await.unwrap();
        assert_eq!(transport.read_command().await.unwrap(), 0x04);
        assert_eq!(transport.read_command().await.unwrap(), 0x0A);
    }

    #[tokio::test]
    async fn test_disconnect_idempotent() {
        let transport = TcpTransport::new("127.0.0.1", 1);

        // Never connected: both calls are no-ops
        transport.disconnect().await;
        transport.disconnect().await;
        assert!(!transport.is_connected());

        let (listener, host, port) = driver_listener().await;
        let transport = TcpTransport::new(host, port);
        transport.connect().await.unwrap();
        let _driver = listener.accept().await.unwrap();

        transport.disconnect().await;
        transport.disconnect().await;
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_unblocks_read() {
        let (listener, host, port) = driver_listener().await;
        let transport = Arc::new(TcpTransport::new(host, port));
        transport.connect().await.unwrap();
        let _driver = listener.accept().await.unwrap();

        let blocked = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { transport.read_command().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        transport.disconnect().await;

        let res = blocked.await.unwrap();
        assert!(matches!(res, Err(Error::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_reconnect_transparency() {
        let (listener, host, port) = driver_listener().await;
        let transport = Arc::new(TcpTransport::new(host, port));
        transport.connect().await.unwrap();
        let _first = listener.accept().await.unwrap();

        let blocked = {
            let transport = Arc::clone(&transport);
            tokio::spawn(async move { transport.read_command().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        transport.reconnect().await.unwrap();
        assert!(transport.is_connected());

        // The in-flight read fails exactly once...
        let res = blocked.await.unwrap();
        assert!(res.is_err());

        // ...and the next read succeeds against the new connection
        let (mut second, _) = listener.accept().await.unwrap();
        second.write_all(&[0x02]).await.unwrap();
        assert_eq!(transport.read_command().await.unwrap(), 0x02);
    }

    #[tokio::test]
    async fn test_reconnect_failure_leaves_unconnected() {
        let (listener, host, port) = driver_listener().await;
        let transport = TcpTransport::new(host, port);
        transport.connect().await.unwrap();
        let _driver = listener.accept().await.unwrap();

        // Nothing listens on the port any more
        drop(listener);
        drop(_driver);

        assert!(transport.reconnect().await.is_err());
        assert!(!transport.is_connected());
        assert!(matches!(
            transport.read_command().await,
            Err(Error::NotConnected)
        ));
    }
}
