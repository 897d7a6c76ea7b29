//! Domain types for the ringbus runtime
//!
//! Strongly-typed newtypes over the primitive values this crate passes
//! around, to prevent primitive obsession at the router/registry/config
//! boundaries.

use nutype::nutype;

/// Maximum byte length of a service identity (`source`/`destination` frame field).
pub const MAX_IDENTITY_LEN: usize = 16;

/// Reserved destination name interpreted by the router as a control channel.
pub const SYS_IDENTITY: &str = "sys";

/// A service's unique, process-wide name.
///
/// Non-empty, at most [`MAX_IDENTITY_LEN`] bytes, and never equal to the
/// reserved token `"sys"`.
#[nutype(
    validate(predicate = |name| {
        !name.is_empty() && name.len() <= MAX_IDENTITY_LEN && name != SYS_IDENTITY
    }),
    derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRef, Borrow)
)]
pub struct ServiceIdentity(String);

impl ServiceIdentity {
    /// The sentinel identity used by a disposable mailbox to issue a system
    /// command without a live, registered service behind it.
    #[must_use]
    pub fn dummy() -> Self {
        Self::try_new("#S$ZD@B").expect("dummy identity satisfies validation")
    }

    /// Returns the identity as a `&str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        let inner: &String = self.as_ref();
        inner.as_str()
    }
}

/// Upper bound on a single frame payload, in bytes (`max_ipc_msg_size`).
#[nutype(
    validate(greater = 0),
    derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)
)]
pub struct MaxIpcMsgSize(usize);

impl MaxIpcMsgSize {
    /// Returns the value as `usize`.
    #[must_use]
    pub fn as_usize(&self) -> usize {
        self.into_inner()
    }
}

/// Milliseconds a blocking mailbox receive waits before returning empty.
///
/// `None` means wait indefinitely, matching `max_recv_timeout = -1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecvTimeoutMs(Option<u64>);

impl RecvTimeoutMs {
    /// Builds a timeout from the raw config value (`-1` means infinite).
    #[must_use]
    pub fn from_config_value(value: i64) -> Self {
        if value < 0 {
            Self(None)
        } else {
            #[allow(clippy::cast_sign_loss)]
            Self(Some(value as u64))
        }
    }

    /// Returns the timeout as a [`std::time::Duration`], if finite.
    #[must_use]
    pub fn as_duration(&self) -> Option<std::time::Duration> {
        self.0.map(std::time::Duration::from_millis)
    }
}

impl Default for RecvTimeoutMs {
    fn default() -> Self {
        Self(None)
    }
}
