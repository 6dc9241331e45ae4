//! Session factory used by the pool

use async_trait::async_trait;
use std::time::Duration;

use crate::backend::BackendDescriptor;
use crate::connection_error::ConnectionError;
use crate::session::Session;

/// Opens authenticated sessions for the pool
///
/// The pool only ever calls this from a spawned single-flight task, so an
/// implementation sees at most one concurrent call per backend.
#[async_trait]
pub trait Connector: Send + Sync + std::fmt::Debug + 'static {
    async fn open(
        &self,
        descriptor: &BackendDescriptor,
        connect_timeout: Duration,
    ) -> Result<Session, ConnectionError>;
}

/// Plain TCP connector
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn open(
        &self,
        descriptor: &BackendDescriptor,
        connect_timeout: Duration,
    ) -> Result<Session, ConnectionError> {
        Session::open(descriptor, connect_timeout).await
    }
}
