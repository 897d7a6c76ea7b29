//! Dynamically loaded shared-library services
//!
//! A service implementation ambient to this expansion (the distilled
//! spec names it only as an external collaborator): a `.so`/`.dll`
//! exposing a single C entry point, loaded with `libloading`.

use std::ffi::CString;
use std::os::raw::{c_char, c_int};

use async_trait::async_trait;
use libloading::{Library, Symbol};

use crate::error::FrameworkError;
use crate::mailbox::Mailbox;
use crate::service::ServiceImpl;

type RunFn = unsafe extern "C" fn(*const c_char) -> c_int;

/// One service instance backed by a dynamically loaded shared library.
pub struct SharedService {
    library: Library,
}

impl SharedService {
    /// Opens `path` as a shared library.
    ///
    /// # Errors
    /// Returns [`FrameworkError::SharedLibrary`] if the library cannot
    /// be opened.
    pub fn load(path: &str) -> Result<Self, FrameworkError> {
        // SAFETY: loading an operator-supplied shared library is
        // inherently unsafe; the crate trusts its configuration input
        // the same way the original trusted its service manifest.
        let library = unsafe { Library::new(path) }
            .map_err(|e| FrameworkError::SharedLibrary(e.to_string()))?;
        Ok(Self { library })
    }
}

#[async_trait]
impl ServiceImpl for SharedService {
    async fn run(&mut self, mailbox: Mailbox, argstring: String) -> Result<i32, FrameworkError> {
        // ringbus_service_run takes only the argstring; the mailbox exists
        // to satisfy the registry's registration/teardown contract for
        // this service kind, not to hand routing access to the library.
        let identity = mailbox.identity().clone();
        drop(mailbox);

        let run_fn: Symbol<RunFn> = unsafe {
            self.library
                .get(b"ringbus_service_run")
                .map_err(|e| FrameworkError::SharedLibrary(e.to_string()))?
        };
        let c_argstring = CString::new(argstring)
            .map_err(|e| FrameworkError::SharedLibrary(e.to_string()))?;

        tracing::debug!(name = %identity, "invoking shared service entry point");
        // SAFETY: `ringbus_service_run` is trusted to follow the
        // documented `extern "C" fn(*const c_char) -> c_int` contract.
        let code = unsafe { run_fn(c_argstring.as_ptr()) };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_fails_for_missing_library() {
        let err = SharedService::load("/nonexistent/libfoo.so").unwrap_err();
        assert!(matches!(err, FrameworkError::SharedLibrary(_)));
    }
}
