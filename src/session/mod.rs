//! Authenticated RCON sessions
//!
//! A [`Session`] is one TCP connection to one backend after the RCON
//! authentication handshake. It carries at most one request at a time: the
//! `&mut self` receiver on [`Session::execute`] makes concurrent use a
//! compile error, and the pool lends a session to a single holder.
//!
//! Any failed exchange leaves the connection in an unknown position within
//! the byte stream, so the session closes itself and must be replaced.

mod state;

pub use state::SessionState;

use std::time::{Duration, Instant};

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, trace};

use crate::backend::BackendDescriptor;
use crate::connection_error::{ConnectionError, SessionPhase};
use crate::constants::protocol::AUTH_REJECTED_ID;
use crate::network;
use crate::protocol::{FrameError, Packet, PacketType, read_packet, validate_command, write_packet};
use crate::types::{BackendName, Credential};

pub struct Session {
    backend: BackendName,
    stream: Option<TcpStream>,
    state: SessionState,
    next_request_id: i32,
    last_activity: Instant,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("backend", &self.backend)
            .field("state", &self.state)
            .field("next_request_id", &self.next_request_id)
            .field("idle_for", &self.idle_for())
            .finish()
    }
}

impl Session {
    /// Connect to the backend and authenticate
    ///
    /// The whole operation, DNS through handshake, is bounded by
    /// `connect_timeout`.
    pub async fn open(
        descriptor: &BackendDescriptor,
        connect_timeout: Duration,
    ) -> Result<Self, ConnectionError> {
        let attempt = async {
            let stream = network::connect_tcp(&descriptor.host, descriptor.port.get()).await?;
            let mut session = Self::from_stream(descriptor.name.clone(), stream);
            session.authenticate(&descriptor.credential).await?;
            Ok(session)
        };

        match tokio::time::timeout(connect_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout {
                backend: descriptor.name.to_string(),
                phase: SessionPhase::Open,
                after: connect_timeout,
            }),
        }
    }

    /// Wrap an already connected stream; the session starts unauthenticated
    #[must_use]
    pub fn from_stream(backend: BackendName, stream: TcpStream) -> Self {
        Self {
            backend,
            stream: Some(stream),
            state: SessionState::Unauthenticated,
            next_request_id: 1,
            last_activity: Instant::now(),
        }
    }

    /// Run the authentication handshake
    ///
    /// Empty `RESPONSE_VALUE` packets sent ahead of the `AUTH_RESPONSE` are
    /// skipped. A response id of -1 means the credential was rejected.
    pub async fn authenticate(&mut self, credential: &Credential) -> Result<(), ConnectionError> {
        if self.state != SessionState::Unauthenticated {
            return Err(ConnectionError::protocol(
                &self.backend,
                format!("cannot authenticate a session that is {}", self.state),
            ));
        }
        self.transition(SessionState::Authenticating);

        let request_id = self.allocate_request_id();
        match self.auth_exchange(request_id, credential).await {
            Ok(()) => {
                self.transition(SessionState::Ready);
                self.last_activity = Instant::now();
                debug!(backend = %self.backend, "Session authenticated");
                Ok(())
            }
            Err(e) => {
                self.close_now();
                Err(e)
            }
        }
    }

    async fn auth_exchange(
        &mut self,
        request_id: i32,
        credential: &Credential,
    ) -> Result<(), ConnectionError> {
        let backend = &self.backend;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ConnectionError::protocol(backend, "session has no transport"))?;

        write_packet(stream, &Packet::auth(request_id, credential.expose()))
            .await
            .map_err(|e| auth_failed(backend, format!("transport closed: {}", e)))?;

        loop {
            let packet = read_packet(stream).await.map_err(|e| match e {
                FrameError::Io(e) => auth_failed(backend, format!("transport closed: {}", e)),
                other => ConnectionError::protocol(backend, other.to_string()),
            })?;

            match packet.packet_type {
                PacketType::RESPONSE_VALUE if packet.body.is_empty() => {
                    trace!(backend = %backend, "Skipping empty packet before auth response");
                }
                PacketType::AUTH_RESPONSE if packet.request_id == AUTH_REJECTED_ID => {
                    return Err(auth_failed(backend, "credential rejected".to_string()));
                }
                PacketType::AUTH_RESPONSE if packet.request_id == request_id => return Ok(()),
                PacketType::AUTH_RESPONSE => {
                    return Err(ConnectionError::protocol(
                        backend,
                        format!(
                            "auth response id {} does not match request {}",
                            packet.request_id, request_id
                        ),
                    ));
                }
                other => {
                    return Err(ConnectionError::protocol(
                        backend,
                        format!("unexpected {:?} packet during authentication", other),
                    ));
                }
            }
        }
    }

    /// Send one command and wait for its response
    ///
    /// Invalid commands are refused before anything is written and leave the
    /// session usable. Every other failure closes the session.
    pub async fn execute(
        &mut self,
        command: &str,
        timeout: Duration,
    ) -> Result<String, ConnectionError> {
        validate_command(command)
            .map_err(|e| ConnectionError::protocol(&self.backend, e.to_string()))?;
        if self.state != SessionState::Ready {
            return Err(ConnectionError::protocol(
                &self.backend,
                format!("session is {}, not ready", self.state),
            ));
        }

        let request_id = self.allocate_request_id();
        let result = tokio::time::timeout(timeout, self.exchange(request_id, command)).await;
        let outcome = match result {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::Timeout {
                backend: self.backend.to_string(),
                phase: SessionPhase::Execute,
                after: timeout,
            }),
        };

        match outcome {
            Ok(text) => {
                self.last_activity = Instant::now();
                Ok(text)
            }
            Err(e) => {
                debug!(backend = %self.backend, error = %e, "Closing session after failed exchange");
                self.close_now();
                Err(e)
            }
        }
    }

    async fn exchange(&mut self, request_id: i32, command: &str) -> Result<String, ConnectionError> {
        let backend = &self.backend;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ConnectionError::protocol(backend, "session has no transport"))?;

        write_packet(stream, &Packet::exec(request_id, command))
            .await
            .map_err(|e| ConnectionError::write_failed(backend, e))?;

        let packet = read_packet(stream).await.map_err(|e| match e {
            FrameError::Io(e) => ConnectionError::read_failed(backend, e),
            other => ConnectionError::protocol(backend, other.to_string()),
        })?;

        if packet.packet_type != PacketType::RESPONSE_VALUE {
            return Err(ConnectionError::protocol(
                backend,
                format!("expected RESPONSE_VALUE, got {:?}", packet.packet_type),
            ));
        }
        if packet.request_id != request_id {
            return Err(ConnectionError::protocol(
                backend,
                format!(
                    "response id {} does not match request {}",
                    packet.request_id, request_id
                ),
            ));
        }
        Ok(packet.body_text())
    }

    /// Shut down the transport; safe to call more than once
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
            debug!(backend = %self.backend, "Session closed");
        }
        self.transition(SessionState::Closed);
    }

    fn close_now(&mut self) {
        self.stream = None;
        self.transition(SessionState::Closed);
    }

    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal session transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    fn allocate_request_id(&mut self) -> i32 {
        let id = self.next_request_id;
        self.next_request_id = if id == i32::MAX { 1 } else { id + 1 };
        id
    }

    #[must_use]
    pub fn backend(&self) -> &BackendName {
        &self.backend
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Time since the last successful exchange
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity.elapsed()
    }

    /// Underlying socket, for liveness probes
    pub(crate) fn tcp_stream(&self) -> Option<&TcpStream> {
        self.stream.as_ref()
    }
}

fn auth_failed(backend: &BackendName, reason: String) -> ConnectionError {
    ConnectionError::AuthenticationFailed {
        backend: backend.to_string(),
        reason,
    }
}
