//! Error taxonomy for ringbus
//!
//! One `thiserror` enum per subsystem, aggregated into [`FrameworkError`]
//! for callers that cross subsystem boundaries.

use thiserror::Error;

/// Configuration store errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("config script evaluation failed: {0}")]
    LuaEval(String),

    #[error("required config key missing: {key}")]
    MissingRequiredKey { key: String },

    #[error("invalid value for config key {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Message router errors.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("identity already registered: {identity}")]
    DuplicateIdentity { identity: String },

    #[error("payload of {size} bytes exceeds max_ipc_msg_size of {max_size} bytes")]
    MessageTooLarge { size: usize, max_size: usize },

    #[error("router dispatch channel closed")]
    Closed,
}

/// Service registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("service type must be non-empty")]
    EmptyType,

    #[error("service name must be non-empty and at most 16 bytes: {name}")]
    InvalidName { name: String },

    #[error("service name 'sys' is reserved")]
    ReservedName,

    #[error("argument string must be non-empty")]
    EmptyArgString,

    #[error("service name already registered: {name}")]
    DuplicateName { name: String },

    #[error("unknown service type: {type_tag}")]
    UnknownServiceType { type_tag: String },
}

/// Top-level error aggregating every subsystem's error type.
#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("service panicked: {0}")]
    ServicePanicked(String),

    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    #[error("shared library error: {0}")]
    SharedLibrary(String),
}
