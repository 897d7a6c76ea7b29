//! Service type dispatch
//!
//! Closed sum type over the two implementations this crate ships,
//! parsed once from the incoming type tag and never re-examined
//! afterward (per the Design Notes' "service typing" resolution).
//! Tags match spec.md §4.4's type factory verbatim: `"luasandbox"` /
//! `"LuaService"` both select the embedded Lua sandbox, `"SharedService"`
//! selects the dynamically loaded library backend.

use std::str::FromStr;

use crate::error::RegistryError;

/// Which [`super::ServiceImpl`] backs a given service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceType {
    /// An embedded Lua script running inside an `mlua::Lua` sandbox.
    LuaSandbox,
    /// A dynamically loaded shared library exposing `ringbus_service_run`.
    Shared,
}

impl FromStr for ServiceType {
    type Err = RegistryError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "luasandbox" | "LuaService" => Ok(Self::LuaSandbox),
            "SharedService" => Ok(Self::Shared),
            other => Err(RegistryError::UnknownServiceType {
                type_tag: other.to_string(),
            }),
        }
    }
}
