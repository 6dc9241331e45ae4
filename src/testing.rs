//! In-process RCON server for unit tests

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::backend::BackendDescriptor;
use crate::constants::protocol::AUTH_REJECTED_ID;
use crate::protocol::{Packet, PacketType, read_packet, write_packet};
use crate::types::{Credential, Port};

pub(crate) const PASSWORD: &str = "secret";

type Reply = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Accepts connections, checks the password and answers each command with
/// the reply function's output; `None` leaves the command unanswered
#[derive(Clone)]
pub(crate) struct MockRcon {
    pub port: u16,
    pub accepted: Arc<AtomicUsize>,
    pub commands: Arc<Mutex<Vec<String>>>,
}

impl MockRcon {
    pub async fn echo() -> Self {
        Self::with_reply(|cmd| Some(format!("ok: {}", cmd))).await
    }

    pub async fn with_reply<F>(reply: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        Self::with_reply_after(Duration::ZERO, reply).await
    }

    /// Like [`with_reply`](Self::with_reply) but each answer is sent after
    /// `delay`
    pub async fn with_reply_after<F>(delay: Duration, reply: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let mock = Self {
            port,
            accepted: Arc::new(AtomicUsize::new(0)),
            commands: Arc::new(Mutex::new(Vec::new())),
        };
        let reply: Reply = Arc::new(reply);

        let server = mock.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                server.accepted.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(
                    stream,
                    delay,
                    Arc::clone(&reply),
                    Arc::clone(&server.commands),
                ));
            }
        });
        mock
    }

    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    pub async fn commands(&self) -> Vec<String> {
        self.commands.lock().await.clone()
    }

    pub fn descriptor(&self, name: &str) -> BackendDescriptor {
        self.descriptor_with(name, PASSWORD)
    }

    pub fn descriptor_with(&self, name: &str, password: &str) -> BackendDescriptor {
        BackendDescriptor::builder(
            name.parse().unwrap(),
            "127.0.0.1".parse().unwrap(),
            Port::new(self.port).unwrap(),
            Credential::new(password),
        )
        .command_timeout(Duration::from_millis(500))
        .build()
        .unwrap()
    }
}

async fn serve(
    mut stream: TcpStream,
    delay: Duration,
    reply: Reply,
    commands: Arc<Mutex<Vec<String>>>,
) {
    let Ok(auth) = read_packet(&mut stream).await else {
        return;
    };
    let id = if auth.body_text() == PASSWORD {
        auth.request_id
    } else {
        AUTH_REJECTED_ID
    };
    if write_packet(&mut stream, &Packet::new(id, PacketType::AUTH_RESPONSE, ""))
        .await
        .is_err()
        || id == AUTH_REJECTED_ID
    {
        return;
    }

    while let Ok(packet) = read_packet(&mut stream).await {
        let command = packet.body_text();
        commands.lock().await.push(command.clone());
        match reply(&command) {
            Some(text) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let response = Packet::new(packet.request_id, PacketType::RESPONSE_VALUE, text);
                if write_packet(&mut stream, &response).await.is_err() {
                    return;
                }
            }
            None => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                return;
            }
        }
    }
}
