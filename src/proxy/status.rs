//! Backend status summaries

use serde::Serialize;

use crate::backend::BackendDescriptor;
use crate::error::{ErrorKind, ProxyError};
use crate::pool::BackendRuntimeState;
use crate::protocol::PlayerList;

/// Reachability reported by a status probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Online,
    /// Could not connect
    Offline,
    /// Connected (or tried to) but the exchange failed
    Error,
}

impl ServerStatus {
    fn from_failure(error: &ProxyError) -> Self {
        match error.kind() {
            ErrorKind::ConnectFailed => Self::Offline,
            _ => Self::Error,
        }
    }
}

/// What `GET /backends` reports for one backend
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendStatus {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub status: ServerStatus,
    pub online_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_players: Option<u32>,
    pub session: BackendRuntimeState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BackendStatus {
    pub(crate) fn probed(
        descriptor: &BackendDescriptor,
        probe: Result<PlayerList, ProxyError>,
        session: BackendRuntimeState,
    ) -> Self {
        let mut status = Self {
            name: descriptor.name.to_string(),
            host: descriptor.host.to_string(),
            port: descriptor.port.get(),
            status: ServerStatus::Online,
            online_count: 0,
            max_players: None,
            session,
            description: descriptor.description.clone(),
            error: None,
        };
        match probe {
            Ok(players) => {
                status.online_count = players.online;
                status.max_players = players.max;
            }
            Err(e) => {
                status.status = ServerStatus::from_failure(&e);
                status.error = Some(e.to_string());
            }
        }
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection_error::ConnectionError;
    use crate::types::{Credential, Port};
    use std::io;
    use std::sync::Arc;

    fn descriptor() -> BackendDescriptor {
        BackendDescriptor::builder(
            "lobby".parse().unwrap(),
            "mc.local".parse().unwrap(),
            Port::RCON,
            Credential::new("pw"),
        )
        .description(Some("Lobby".into()))
        .build()
        .unwrap()
    }

    #[test]
    fn test_online_summary_serializes_camel_case() {
        let players = PlayerList::parse("There are 2 of a max of 20 players online: a, b");
        let status =
            BackendStatus::probed(&descriptor(), Ok(players), BackendRuntimeState::Online);
        let json = serde_json::to_value(&status).unwrap();

        assert_eq!(json["status"], "online");
        assert_eq!(json["onlineCount"], 2);
        assert_eq!(json["maxPlayers"], 20);
        assert_eq!(json["session"], "online");
        assert_eq!(json["description"], "Lobby");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_connect_failure_is_offline() {
        let err = ProxyError::from(ConnectionError::TcpConnect {
            host: "mc.local".into(),
            port: 25575,
            source: Arc::new(io::Error::from(io::ErrorKind::ConnectionRefused)),
        });
        let status = BackendStatus::probed(&descriptor(), Err(err), BackendRuntimeState::Degraded);

        assert_eq!(status.status, ServerStatus::Offline);
        assert_eq!(status.online_count, 0);
        assert!(status.error.unwrap().contains("mc.local"));
    }

    #[test]
    fn test_other_failure_is_error() {
        let err = ProxyError::from(ConnectionError::AuthenticationFailed {
            backend: "lobby".into(),
            reason: "rejected".into(),
        });
        let status = BackendStatus::probed(&descriptor(), Err(err), BackendRuntimeState::Degraded);
        assert_eq!(status.status, ServerStatus::Error);
    }
}
