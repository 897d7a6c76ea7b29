//! Optional TCP gateway
//!
//! Grounded in `original_source/src/net/Gate.cpp`/`gate.h`: a
//! connection-accepting server that assigns each client a serial and
//! forwards its framed packets elsewhere. Reimplemented as a thin
//! length-delimited bridge onto the router rather than reproducing the
//! original's bespoke `ClientHeader`/heartbeat/XOR-obfuscation wire
//! format — this crate's core never constructs a `Gateway`; it exists
//! for embedders that want one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures_util::StreamExt;
use tokio::net::TcpListener;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{info, warn};

use crate::domain_types::ServiceIdentity;
use crate::router::Router;

const SERIAL_PREFIX: u64 = 10_000;

/// A length-delimited TCP front door that hands each connection its own
/// synthetic identity and forwards inbound frames to `destination`
/// through the router.
pub struct Gateway {
    router: Router,
    destination: ServiceIdentity,
    next_serial: AtomicU64,
}

impl Gateway {
    /// Builds a gateway that forwards every inbound frame to
    /// `destination`.
    #[must_use]
    pub fn new(router: Router, destination: ServiceIdentity) -> Arc<Self> {
        Arc::new(Self {
            router,
            destination,
            next_serial: AtomicU64::new(SERIAL_PREFIX),
        })
    }

    /// Binds `addr` and accepts connections until the listener errors or
    /// the process shuts down.
    ///
    /// # Errors
    /// Returns the I/O error from binding the listener.
    pub async fn serve(self: Arc<Self>, addr: &str) -> std::io::Result<()> {
        let listener = TcpListener::bind(addr).await?;
        info!(addr, "gateway listening");
        loop {
            let (socket, peer_addr) = listener.accept().await?;
            let serial = self.next_serial.fetch_add(1, Ordering::SeqCst);
            let gateway = Arc::clone(&self);
            tokio::spawn(async move {
                info!(serial, %peer_addr, "gateway connection accepted");
                if let Err(error) = gateway.handle_connection(socket, serial).await {
                    warn!(serial, %error, "gateway connection ended with error");
                }
            });
        }
    }

    async fn handle_connection(
        &self,
        socket: tokio::net::TcpStream,
        serial: u64,
    ) -> std::io::Result<()> {
        let mut framed = Framed::new(socket, LengthDelimitedCodec::new());
        let identity = match ServiceIdentity::try_new(format!("gw{serial}")) {
            Ok(identity) => identity,
            Err(_) => ServiceIdentity::dummy(),
        };

        while let Some(frame) = framed.next().await {
            let bytes: Bytes = frame?.freeze();
            if self
                .router
                .submit(crate::router::Frame {
                    source: identity.clone(),
                    destination: self.destination.to_string(),
                    payload: bytes,
                })
                .is_err()
            {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_types::MaxIpcMsgSize;

    #[tokio::test]
    async fn new_builds_without_binding() {
        let (router, _inbound_rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        let destination = ServiceIdentity::try_new("echo").unwrap();
        let gateway = Gateway::new(router, destination);
        assert_eq!(gateway.next_serial.load(Ordering::SeqCst), SERIAL_PREFIX);
    }
}
