//! Per-service mailbox
//!
//! The endpoint a worker thread uses to talk to every other service
//! through the router. Every public method is `async fn`; the worker
//! thread that owns a mailbox drives a small single-threaded Tokio
//! runtime so synchronous script callbacks (Lua) can `block_on` them.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain_types::{MaxIpcMsgSize, RecvTimeoutMs, ServiceIdentity};
use crate::error::RouterError;
use crate::router::{Frame, Router};

/// A service's bound endpoint: its own identity, plus a reference back
/// to the router for sending and an owned inbox for receiving.
pub struct Mailbox {
    identity: ServiceIdentity,
    router: Router,
    inbox: mpsc::UnboundedReceiver<(ServiceIdentity, Bytes)>,
    recv_timeout: RecvTimeoutMs,
}

impl Mailbox {
    /// Registers `identity` with `router` and returns the bound mailbox.
    ///
    /// # Errors
    /// Returns [`RouterError::DuplicateIdentity`] if `identity` is already
    /// registered.
    pub fn bind(
        identity: ServiceIdentity,
        router: Router,
        recv_timeout: RecvTimeoutMs,
    ) -> Result<Self, RouterError> {
        let inbox = router.register(&identity)?;
        Ok(Self {
            identity,
            router,
            inbox,
            recv_timeout,
        })
    }

    /// This mailbox's own identity.
    #[must_use]
    pub fn identity(&self) -> &ServiceIdentity {
        &self.identity
    }

    /// Sends `payload` to `peer` (a registered identity, or `"sys"`).
    ///
    /// Never blocks: the underlying channel is unbounded, matching the
    /// "production workloads never hit the high-water mark" assumption.
    ///
    /// # Errors
    /// Returns [`RouterError::MessageTooLarge`] if `payload` exceeds the
    /// router's configured `max_ipc_msg_size`, or [`RouterError::Closed`]
    /// if the dispatch loop has already exited.
    pub fn send(&self, peer: &str, payload: Bytes) -> Result<(), RouterError> {
        let max_size = self.router.max_msg_size().as_usize();
        if payload.len() > max_size {
            return Err(RouterError::MessageTooLarge {
                size: payload.len(),
                max_size,
            });
        }
        self.router.submit(Frame {
            source: self.identity.clone(),
            destination: peer.to_string(),
            payload,
        })
    }

    /// Awaits the next message, up to this mailbox's configured
    /// `max_recv_timeout`, and invokes `handler(source, payload)`.
    ///
    /// Returns the number of messages delivered: `1` if `handler` ran,
    /// `0` on timeout or channel close.
    pub async fn recv_blocking<F>(&mut self, handler: F) -> usize
    where
        F: FnOnce(&ServiceIdentity, &Bytes),
    {
        let received = match self.recv_timeout.as_duration() {
            Some(duration) => match tokio::time::timeout(duration, self.inbox.recv()).await {
                Ok(message) => message,
                Err(_) => None,
            },
            None => self.inbox.recv().await,
        };

        match received {
            Some((source, payload)) => {
                handler(&source, &payload);
                1
            }
            None => 0,
        }
    }

    /// Polls for a message without waiting; invokes `handler` only if one
    /// was already queued. Returns `1` if delivered, `0` if the inbox was
    /// empty.
    pub fn recv_nonblocking<F>(&mut self, handler: F) -> usize
    where
        F: FnOnce(&ServiceIdentity, &Bytes),
    {
        match self.inbox.try_recv() {
            Ok((source, payload)) => {
                handler(&source, &payload);
                1
            }
            Err(mpsc::error::TryRecvError::Empty) => 0,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                warn!(identity = %self.identity, "mailbox inbox disconnected");
                0
            }
        }
    }
}

impl Drop for Mailbox {
    fn drop(&mut self) {
        self.router.deregister(&self.identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_types::MaxIpcMsgSize;
    use std::time::Duration;

    fn identity(name: &str) -> ServiceIdentity {
        ServiceIdentity::try_new(name).unwrap()
    }

    #[tokio::test]
    async fn bind_registers_with_router_and_rejects_duplicate() {
        let (router, _inbound_rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        let alice = Mailbox::bind(identity("alice"), router.clone(), RecvTimeoutMs::default())
            .unwrap();
        let err = Mailbox::bind(identity("alice"), router, RecvTimeoutMs::default()).unwrap_err();
        assert!(matches!(err, RouterError::DuplicateIdentity { .. }));
        drop(alice);
    }

    #[tokio::test]
    async fn drop_deregisters_identity() {
        let (router, _inbound_rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        let alice = Mailbox::bind(identity("alice"), router.clone(), RecvTimeoutMs::default())
            .unwrap();
        drop(alice);
        // Re-binding the same identity must now succeed.
        let _alice2 = Mailbox::bind(identity("alice"), router, RecvTimeoutMs::default()).unwrap();
    }

    #[tokio::test]
    async fn send_rejects_oversized_payload() {
        let (router, _inbound_rx) = Router::bind(MaxIpcMsgSize::try_new(4).unwrap());
        let alice = Mailbox::bind(identity("alice"), router, RecvTimeoutMs::default()).unwrap();
        let err = alice.send("bob", Bytes::from_static(b"toolong")).unwrap_err();
        assert!(matches!(err, RouterError::MessageTooLarge { .. }));
    }

    #[tokio::test]
    async fn recv_blocking_times_out() {
        let (router, _inbound_rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        let mut mailbox = Mailbox::bind(
            identity("alice"),
            router,
            RecvTimeoutMs::from_config_value(10),
        )
        .unwrap();
        let count = mailbox.recv_blocking(|_, _| unreachable!()).await;
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn recv_nonblocking_empty_inbox_returns_zero() {
        let (router, _inbound_rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        let mut mailbox =
            Mailbox::bind(identity("alice"), router, RecvTimeoutMs::default()).unwrap();
        assert_eq!(mailbox.recv_nonblocking(|_, _| unreachable!()), 0);
    }

    #[tokio::test]
    async fn end_to_end_routing_via_dispatch_loop() {
        let (router, inbound_rx) = Router::bind(MaxIpcMsgSize::try_new(1024).unwrap());
        let alice = Mailbox::bind(identity("alice"), router.clone(), RecvTimeoutMs::default())
            .unwrap();
        let mut bob = Mailbox::bind(identity("bob"), router.clone(), RecvTimeoutMs::default())
            .unwrap();

        let dispatch_router = router.clone();
        let dispatch_handle =
            tokio::spawn(async move { dispatch_router.dispatch_loop(inbound_rx).await });

        alice.send("bob", Bytes::from_static(b"hello")).unwrap();

        let received = tokio::time::timeout(Duration::from_millis(500), async {
            loop {
                let mut got = None;
                let count = bob.recv_nonblocking(|source, payload| {
                    got = Some((source.clone(), payload.clone()));
                });
                if count == 1 {
                    return got.unwrap();
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(received.0, identity("alice"));
        assert_eq!(&received.1[..], b"hello");

        router.submit(Frame {
            source: ServiceIdentity::dummy(),
            destination: "sys".to_string(),
            payload: Bytes::from_static(b"shutdown"),
        })
        .unwrap();
        let _ = tokio::time::timeout(Duration::from_millis(500), dispatch_handle).await;
    }
}
