//! Identity-addressed message router
//!
//! Replaces the original ZeroMQ ROUTER/DEALER socket pair with a Tokio
//! `mpsc` channel model: the one semantic that must survive is that a
//! receiver always sees its sender's identity as the first element of
//! what it gets back.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::domain_types::{MaxIpcMsgSize, ServiceIdentity, SYS_IDENTITY};
use crate::error::RouterError;

/// Inert artifact of the socket-based lineage this router replaces; kept
/// only as a trace-span field, never as an actual connection target.
pub const ROUTER_ADDRESS: &str = "inproc://ringbus.router";

/// A single routed message: who sent it, who it's for, and its payload.
///
/// `destination` is a plain string rather than [`ServiceIdentity`] because
/// the reserved control address `"sys"` is a valid routing destination but
/// an invalid service name — the two types intentionally diverge here.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Sending service's identity.
    pub source: ServiceIdentity,
    /// Destination address: a registered service's identity, or `"sys"`.
    pub destination: String,
    /// Message body.
    pub payload: Bytes,
}

type Route = mpsc::UnboundedSender<(ServiceIdentity, Bytes)>;

#[derive(Debug)]
struct RouterInner {
    routes: Mutex<HashMap<String, Route>>,
    inbound_tx: mpsc::UnboundedSender<Frame>,
    stopping: AtomicBool,
    max_msg_size: MaxIpcMsgSize,
}

/// Cheaply-`Clone`able handle to the router's shared state.
#[derive(Debug, Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// Creates the routing table and returns both the handle and the
    /// receiver half of the inbound channel that [`Router::dispatch_loop`]
    /// drains.
    #[must_use]
    pub fn bind(max_msg_size: MaxIpcMsgSize) -> (Self, mpsc::UnboundedReceiver<Frame>) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let router = Self {
            inner: Arc::new(RouterInner {
                routes: Mutex::new(HashMap::new()),
                inbound_tx,
                stopping: AtomicBool::new(false),
                max_msg_size,
            }),
        };
        (router, inbound_rx)
    }

    /// Configured maximum payload size.
    #[must_use]
    pub fn max_msg_size(&self) -> MaxIpcMsgSize {
        self.inner.max_msg_size
    }

    /// Whether the router has observed `sys/shutdown`.
    #[must_use]
    pub fn is_stopping(&self) -> bool {
        self.inner.stopping.load(Ordering::SeqCst)
    }

    /// Registers `identity` and returns its private inbox receiver.
    ///
    /// # Errors
    /// Returns [`RouterError::DuplicateIdentity`] if `identity` is already
    /// registered.
    pub fn register(
        &self,
        identity: &ServiceIdentity,
    ) -> Result<mpsc::UnboundedReceiver<(ServiceIdentity, Bytes)>, RouterError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut routes = self.inner.routes.lock().expect("router mutex poisoned");
        if routes.contains_key(identity.as_str()) {
            return Err(RouterError::DuplicateIdentity {
                identity: identity.to_string(),
            });
        }
        routes.insert(identity.to_string(), tx);
        Ok(rx)
    }

    /// Removes `identity`'s route. Called by the registry on service
    /// exit, never by the mailbox itself.
    pub fn deregister(&self, identity: &ServiceIdentity) {
        self.inner
            .routes
            .lock()
            .expect("router mutex poisoned")
            .remove(identity.as_str());
    }

    /// Submits `frame` onto the router's inbound channel.
    ///
    /// # Errors
    /// Returns [`RouterError::Closed`] if the dispatch loop has already
    /// exited.
    pub fn submit(&self, frame: Frame) -> Result<(), RouterError> {
        self.inner
            .inbound_tx
            .send(frame)
            .map_err(|_| RouterError::Closed)
    }

    /// Routes a single frame: forwards to its destination's route, or
    /// interprets it as a system command when addressed to `"sys"`.
    #[instrument(skip(self, frame), fields(router = ROUTER_ADDRESS))]
    fn route(&self, frame: Frame) {
        if frame.destination == SYS_IDENTITY {
            self.handle_system_command(&frame);
            return;
        }

        let routes = self.inner.routes.lock().expect("router mutex poisoned");
        match routes.get(&frame.destination) {
            Some(route) => {
                if route.send((frame.source, frame.payload)).is_err() {
                    warn!(destination = %frame.destination, "route closed, dropping frame");
                }
            }
            None => {
                warn!(destination = %frame.destination, "unknown destination, dropping frame");
            }
        }
    }

    fn handle_system_command(&self, frame: &Frame) {
        let command = String::from_utf8_lossy(&frame.payload);
        match command.as_ref() {
            "exit" => self.fan_out_exit(),
            "shutdown" => {
                debug!("router observed sys/shutdown");
                self.inner.stopping.store(true, Ordering::SeqCst);
            }
            other => warn!(command = other, "unknown system command, ignoring"),
        }
    }

    fn fan_out_exit(&self) {
        let sys = ServiceIdentity::dummy();
        let routes = self.inner.routes.lock().expect("router mutex poisoned");
        for route in routes.values() {
            let _ = route.send((sys.clone(), Bytes::from_static(b"exit")));
        }
    }

    /// Drains the inbound channel until `sys/shutdown` is observed.
    pub async fn dispatch_loop(&self, mut inbound_rx: mpsc::UnboundedReceiver<Frame>) {
        while let Some(frame) = inbound_rx.recv().await {
            self.route(frame);
            if self.is_stopping() {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_types::MaxIpcMsgSize;

    fn test_identity(name: &str) -> ServiceIdentity {
        ServiceIdentity::try_new(name).unwrap()
    }

    #[test]
    fn register_rejects_duplicate() {
        let (router, _rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        let a = test_identity("alice");
        let _rx1 = router.register(&a).unwrap();
        let err = router.register(&a).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateIdentity { .. }));
    }

    #[tokio::test]
    async fn route_forwards_payload_with_sender_identity() {
        let (router, mut inbound_rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        let alice = test_identity("alice");
        let bob = test_identity("bob");
        let mut bob_rx = router.register(&bob).unwrap();
        let _alice_rx = router.register(&alice).unwrap();

        router
            .submit(Frame {
                source: alice.clone(),
                destination: bob.to_string(),
                payload: Bytes::from_static(b"hello"),
            })
            .unwrap();

        let frame = inbound_rx.recv().await.unwrap();
        router.route(frame);

        let (from, payload) = bob_rx.recv().await.unwrap();
        assert_eq!(from, alice);
        assert_eq!(&payload[..], b"hello");
    }

    #[test]
    fn route_to_unknown_destination_is_silently_dropped() {
        let (router, _rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        router.route(Frame {
            source: test_identity("alice"),
            destination: "ghost".to_string(),
            payload: Bytes::from_static(b"hi"),
        });
    }

    #[test]
    fn sys_shutdown_sets_stopping() {
        let (router, _rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        router.route(Frame {
            source: ServiceIdentity::dummy(),
            destination: SYS_IDENTITY.to_string(),
            payload: Bytes::from_static(b"shutdown"),
        });
        assert!(router.is_stopping());
    }

    #[test]
    fn sys_exit_fans_out_to_every_route() {
        let (router, _rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        let alice = test_identity("alice");
        let mut alice_rx = router.register(&alice).unwrap();
        router.route(Frame {
            source: ServiceIdentity::dummy(),
            destination: SYS_IDENTITY.to_string(),
            payload: Bytes::from_static(b"exit"),
        });
        let (_, payload) = alice_rx.try_recv().unwrap();
        assert_eq!(&payload[..], b"exit");
    }
}
