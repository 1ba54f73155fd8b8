//! Connection management: transport, framing and request correlation.
//!
//! The protocol carries no request ids. A reply is matched to the oldest
//! pending request with the same (device_id, command_id) pair, so two
//! concurrent requests on the same pair resolve strictly in issue order.
//! Callers that interleave same-pair requests without awaiting accept that
//! FIFO attribution.

use crate::error::ClientError;
use bytes::{Bytes, BytesMut};
use openrgb_protocol::{descriptor, Command, Packet, Reader, DEFAULT_PORT, PROTOCOL_VERSION};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio::task::JoinHandle;

/// Default read buffer size (8 KiB).
pub const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

/// Minimum read buffer size (1 KiB).
pub const MIN_READ_BUFFER_SIZE: usize = 1024;

/// Maximum read buffer size (1 MiB).
pub const MAX_READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Capacity of the notification broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Connection configuration.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Server address.
    pub addr: SocketAddr,
    /// Connection timeout, also bounds version negotiation.
    pub connect_timeout: Duration,
    /// Per-request reply timeout.
    pub request_timeout: Duration,
    /// Name announced to the server after negotiation.
    pub client_name: String,
    /// Protocol version to assume when the server never answers
    /// negotiation (pre-versioning servers).
    pub forced_protocol_version: Option<u32>,
    /// Read buffer size for socket reads.
    pub read_buffer_size: usize,
}

impl ConnectionConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            client_name: "openrgb-client".to_string(),
            forced_protocol_version: None,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
        }
    }

    pub fn with_client_name(mut self, name: impl Into<String>) -> Self {
        self.client_name = name.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_forced_protocol_version(mut self, version: u32) -> Self {
        self.forced_protocol_version = Some(version);
        self
    }

    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.clamp(MIN_READ_BUFFER_SIZE, MAX_READ_BUFFER_SIZE);
        self
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)))
    }
}

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Disconnected = 0,
    Connecting = 1,
    Negotiating = 2,
    Ready = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Negotiating,
            3 => Self::Ready,
            _ => Self::Disconnected,
        }
    }
}

/// Server-initiated notifications, decoupled from request matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The server's device list changed; cached descriptors are stale.
    DeviceListUpdated,
}

/// A request awaiting its reply.
struct PendingRequest {
    token: u64,
    device_id: u32,
    command_id: u32,
    tx: oneshot::Sender<Bytes>,
}

/// FIFO table of in-flight requests.
///
/// Dropping an entry fails its awaiter, so `clear` doubles as the
/// disconnect path that cancels everything in flight.
#[derive(Default)]
struct PendingTable {
    entries: VecDeque<PendingRequest>,
    next_token: u64,
}

impl PendingTable {
    fn register(&mut self, device_id: u32, command_id: u32) -> (u64, oneshot::Receiver<Bytes>) {
        let (tx, rx) = oneshot::channel();
        let token = self.next_token;
        self.next_token += 1;
        self.entries.push_back(PendingRequest {
            token,
            device_id,
            command_id,
            tx,
        });
        (token, rx)
    }

    /// Fulfills the oldest entry matching the pair. Returns false when no
    /// entry matches and the packet should be dropped.
    fn resolve(&mut self, device_id: u32, command_id: u32, body: Bytes) -> bool {
        let idx = self
            .entries
            .iter()
            .position(|p| p.device_id == device_id && p.command_id == command_id);
        match idx.and_then(|idx| self.entries.remove(idx)) {
            Some(entry) => {
                let _ = entry.tx.send(body);
                true
            }
            None => false,
        }
    }

    /// Removes an entry whose caller gave up waiting.
    fn forget(&mut self, token: u64) {
        self.entries.retain(|p| p.token != token);
    }

    /// Drops every entry, failing all awaiters. Returns how many were
    /// in flight.
    fn clear(&mut self) -> usize {
        let dropped = self.entries.len();
        self.entries.clear();
        dropped
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// A connection to an OpenRGB SDK server.
pub struct Connection {
    config: ConnectionConfig,
    /// Write half of the stream (for sending requests).
    writer: Mutex<Option<WriteHalf<TcpStream>>>,
    /// Read half of the stream (owned by the read loop).
    reader: Mutex<Option<ReadHalf<TcpStream>>>,
    /// Stream reassembly buffer for the framing layer.
    recv_buf: Mutex<BytesMut>,
    /// Requests waiting for replies.
    pending: Mutex<PendingTable>,
    /// Handle of the spawned read loop, aborted on close so a quiet
    /// server cannot stall disconnect.
    read_task: Mutex<Option<JoinHandle<()>>>,
    /// Session lifecycle state.
    state: AtomicU8,
    /// Version agreed with the server; 0 before negotiation completes.
    negotiated_version: AtomicU32,
    /// Broadcast channel for server notifications.
    events: broadcast::Sender<Event>,
}

impl Connection {
    /// Creates a new connection (not yet connected).
    pub fn new(config: ConnectionConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
            recv_buf: Mutex::new(BytesMut::with_capacity(DEFAULT_READ_BUFFER_SIZE)),
            pending: Mutex::new(PendingTable::default()),
            read_task: Mutex::new(None),
            state: AtomicU8::new(SessionState::Disconnected as u8),
            negotiated_version: AtomicU32::new(0),
            events,
        }
    }

    /// Subscribes to server notifications.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub fn state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Whether the session reached `Ready` and is still up.
    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Negotiated protocol version; 0 before negotiation completes.
    pub fn protocol_version(&self) -> u32 {
        self.negotiated_version.load(Ordering::SeqCst)
    }

    /// Returns the number of requests currently in flight.
    pub fn pending_count(&self) -> usize {
        self.pending.try_lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Opens the transport, negotiates the protocol version and announces
    /// the client name. The session accepts requests only after this
    /// returns.
    pub async fn connect(self: &Arc<Self>) -> Result<(), ClientError> {
        self.state
            .store(SessionState::Connecting as u8, Ordering::SeqCst);
        tracing::debug!("connecting to {}", self.config.addr);

        let stream = match tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(self.config.addr),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => {
                self.state
                    .store(SessionState::Disconnected as u8, Ordering::SeqCst);
                return Err(ClientError::Io(err));
            }
            Err(_) => {
                self.state
                    .store(SessionState::Disconnected as u8, Ordering::SeqCst);
                return Err(ClientError::Timeout);
            }
        };
        stream.set_nodelay(true).ok();

        let (read_half, write_half) = tokio::io::split(stream);
        *self.writer.lock().await = Some(write_half);
        *self.reader.lock().await = Some(read_half);
        self.recv_buf.lock().await.clear();
        self.pending.lock().await.clear();

        let conn = Arc::clone(self);
        let task = tokio::spawn(async move {
            if let Err(err) = conn.read_loop().await {
                tracing::debug!("read loop ended: {}", err);
            }
        });
        *self.read_task.lock().await = Some(task);

        self.state
            .store(SessionState::Negotiating as u8, Ordering::SeqCst);
        match self.handshake().await {
            Ok(()) => {
                self.state.store(SessionState::Ready as u8, Ordering::SeqCst);
                tracing::debug!(version = self.protocol_version(), "session ready");
                Ok(())
            }
            Err(err) => {
                let _ = self.close().await;
                Err(err)
            }
        }
    }

    /// Negotiates the protocol version, then announces the client name.
    async fn handshake(&self) -> Result<(), ClientError> {
        let client_version = self
            .config
            .forced_protocol_version
            .unwrap_or(PROTOCOL_VERSION);

        let negotiated = match self
            .request_with_timeout(
                Command::RequestProtocolVersion,
                0,
                descriptor::encode_version(client_version).freeze(),
                self.config.connect_timeout,
            )
            .await
        {
            Ok(reply) => {
                let server_version = Reader::new(&reply).read_u32()?;
                let negotiated = server_version.min(client_version);
                tracing::debug!(server_version, negotiated, "protocol version negotiated");
                negotiated
            }
            // Pre-versioning servers never answer; fall back if configured.
            Err(ClientError::Timeout) => match self.config.forced_protocol_version {
                Some(version) => {
                    tracing::warn!(version, "server silent on version negotiation, forcing");
                    version
                }
                None => return Err(ClientError::ProtocolMismatch),
            },
            Err(err) => return Err(err),
        };
        self.negotiated_version.store(negotiated, Ordering::SeqCst);

        self.send(
            Command::SetClientName,
            0,
            descriptor::encode_name(&self.config.client_name).freeze(),
        )
        .await
    }

    fn ensure_writable(&self) -> Result<(), ClientError> {
        match self.state() {
            SessionState::Negotiating | SessionState::Ready => Ok(()),
            _ => Err(ClientError::NotConnected),
        }
    }

    /// Writes one framed packet. Fire-and-forget commands use this
    /// directly; there is no reply to wait for.
    pub async fn send(
        &self,
        command: Command,
        device_id: u32,
        body: Bytes,
    ) -> Result<(), ClientError> {
        self.ensure_writable()?;
        let encoded = Packet::new(device_id, command.into(), body).encode();

        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer.write_all(&encoded).await.map_err(ClientError::Io)?;
        tracing::debug!(?command, device_id, len = encoded.len(), "packet sent");
        Ok(())
    }

    /// Sends a request and waits for the matching reply body.
    pub async fn request(
        &self,
        command: Command,
        device_id: u32,
        body: Bytes,
    ) -> Result<Bytes, ClientError> {
        self.request_with_timeout(command, device_id, body, self.config.request_timeout)
            .await
    }

    async fn request_with_timeout(
        &self,
        command: Command,
        device_id: u32,
        body: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, ClientError> {
        self.ensure_writable()?;

        // Register before writing so a reply cannot race past the table.
        let (token, rx) = self.pending.lock().await.register(device_id, command.into());

        if let Err(err) = self.send(command, device_id, body).await {
            self.pending.lock().await.forget(token);
            return Err(err);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                self.pending.lock().await.forget(token);
                tracing::debug!(?command, device_id, "request timed out");
                Err(ClientError::Timeout)
            }
        }
    }

    /// Drives the framing layer: reads stream data, reassembles packets
    /// and dispatches them to awaiters or the event channel. Runs until
    /// the stream ends or a framing error poisons the buffer.
    async fn read_loop(&self) -> Result<(), ClientError> {
        let mut buf = vec![0u8; self.config.read_buffer_size];
        loop {
            let n = {
                let mut reader_guard = self.reader.lock().await;
                let Some(reader) = reader_guard.as_mut() else {
                    // Closed locally; pending requests were already failed.
                    return Ok(());
                };
                match reader.read(&mut buf).await {
                    Ok(n) => n,
                    Err(err) => {
                        drop(reader_guard);
                        self.teardown().await;
                        return Err(ClientError::Io(err));
                    }
                }
            };

            if n == 0 {
                tracing::debug!("server closed the connection");
                self.teardown().await;
                return Err(ClientError::ConnectionClosed);
            }

            // Drain every complete packet before suspending on the socket
            // again; several may have arrived in one read.
            let packets = {
                let mut recv = self.recv_buf.lock().await;
                recv.extend_from_slice(&buf[..n]);
                let mut packets = Vec::new();
                loop {
                    match Packet::decode(&mut recv) {
                        Ok(Some(packet)) => packets.push(packet),
                        Ok(None) => break,
                        Err(err) => {
                            // A bad header leaves the buffer misaligned and
                            // would corrupt every later packet.
                            tracing::warn!("framing error, dropping connection: {}", err);
                            drop(recv);
                            self.teardown().await;
                            return Err(err.into());
                        }
                    }
                }
                packets
            };

            for packet in packets {
                self.dispatch(packet).await;
            }
        }
    }

    async fn dispatch(&self, packet: Packet) {
        if packet.command_id == Command::DeviceListUpdated as u32 {
            tracing::debug!("device list updated notification");
            let _ = self.events.send(Event::DeviceListUpdated);
            return;
        }

        let resolved = self
            .pending
            .lock()
            .await
            .resolve(packet.device_id, packet.command_id, packet.body);
        if !resolved {
            tracing::debug!(
                device_id = packet.device_id,
                command_id = packet.command_id,
                "dropping unmatched packet"
            );
        }
    }

    /// Transitions to `Disconnected` and fails every pending awaiter.
    /// Leaving them hanging would stall their callers forever.
    async fn teardown(&self) {
        self.state
            .store(SessionState::Disconnected as u8, Ordering::SeqCst);
        let dropped = self.pending.lock().await.clear();
        if dropped > 0 {
            tracing::debug!(dropped, "failed pending requests on disconnect");
        }
        *self.writer.lock().await = None;
    }

    /// Closes the connection. In-flight requests fail with
    /// `ConnectionClosed`; callers must treat a disconnect as implicit
    /// cancellation.
    pub async fn close(&self) -> Result<(), ClientError> {
        tracing::debug!("closing connection");
        self.state
            .store(SessionState::Disconnected as u8, Ordering::SeqCst);

        // Stop the read loop first; it may be parked in a read holding the
        // reader lock, and a quiet server would never wake it.
        if let Some(task) = self.read_task.lock().await.take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        let _ = self.reader.lock().await.take();

        self.pending.lock().await.clear();
        self.negotiated_version.store(0, Ordering::SeqCst);
        Ok(())
    }
}
