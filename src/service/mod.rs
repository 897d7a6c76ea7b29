//! Service lifecycle, typing, and implementations.

pub mod factory;
pub mod lua_service;
pub mod registry;
pub mod runner;
pub mod shared_service;

use async_trait::async_trait;

use crate::error::FrameworkError;
use crate::mailbox::Mailbox;

/// Common contract every service backend implements.
///
/// `argstring` is the creation-time argument string. Backends that need
/// a leading path token (script path, shared-library path) out of it
/// before they can even construct themselves pull it out upstream of
/// `run`, the way the original's per-service `Run` methods each did
/// their own parsing rather than sharing one split point.
#[async_trait]
pub trait ServiceImpl: Send {
    /// Runs the service to completion, returning its exit code.
    async fn run(&mut self, mailbox: Mailbox, argstring: String) -> Result<i32, FrameworkError>;
}
