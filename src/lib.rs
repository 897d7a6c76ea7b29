//! # ringbus - in-process multi-service runtime
//!
//! ringbus is a lightweight, single-process runtime for composing a
//! handful of cooperating services behind one identity-addressed
//! message router. Services are either embedded Lua scripts or
//! dynamically loaded shared libraries; every service talks to every
//! other service exclusively through its own [`mailbox::Mailbox`],
//! addressed by a short string identity.
//!
//! ## Core components
//!
//! - **Config store** ([`config`]): a write-once-per-key store
//!   populated by evaluating the startup config as a Lua chunk.
//! - **Router** ([`router`]): the identity-addressed message router,
//!   plus the reserved `"sys"` control channel (`exit`/`shutdown`).
//! - **Mailbox** ([`mailbox`]): the per-service send/recv endpoint.
//! - **Service registry** ([`service`]): name-unique service lifecycle
//!   management (`create`/`stop`/`on_service_exit`) and the two service
//!   backends (`LuaSandbox`, `Shared`).
//!
//! ## Non-goals
//!
//! No persistence, no distribution across processes, no cross-sender
//! ordering guarantees, no quota/fairness/priority scheduling.

pub mod config;
pub mod domain_types;
pub mod error;
pub mod gateway;
pub mod mailbox;
pub mod router;
pub mod service;
pub mod startup;
pub mod utils;

pub use config::ConfigStore;
pub use domain_types::ServiceIdentity;
pub use error::FrameworkError;
pub use mailbox::Mailbox;
pub use router::Router;
pub use service::registry::ServiceRegistry;
