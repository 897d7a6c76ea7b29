//! Service lifecycle registry
//!
//! Owns the name→record map and the validation order for `create`,
//! mirroring `original_source`'s RB-tree-based service registry but
//! behind a single coarse-grained mutex, per spec.md §5's
//! shared-resource policy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::{debug, info};

use crate::config::ConfigStore;
use crate::domain_types::{RecvTimeoutMs, ServiceIdentity, SYS_IDENTITY};
use crate::error::RegistryError;
use crate::router::Router;
use crate::service::factory::ServiceType;
use crate::service::runner;

/// Bookkeeping for one live service.
pub struct ServiceRecord {
    /// The service type tag it was created with.
    pub service_type: ServiceType,
    /// Opaque argument string forwarded to the service implementation
    /// verbatim; each implementation interprets its own leading token
    /// (script or library path) and remainder.
    pub argstring: String,
    join_handle: Option<JoinHandle<()>>,
}

/// Name-uniqueness registry and worker-thread bookkeeping for every live
/// service in the process.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: Mutex<HashMap<ServiceIdentity, ServiceRecord>>,
}

impl std::fmt::Debug for ServiceRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRecord")
            .field("argstring", &self.argstring)
            .finish_non_exhaustive()
    }
}

impl ServiceRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `name`/`type_tag`/`argstring`, checks for a duplicate
    /// name, registers a record, and spawns the worker thread.
    ///
    /// Takes `registry` as an explicit `&Arc<Self>` rather than as a
    /// receiver, since only `Self`/`Box<Self>`/`Rc<Self>`/`Arc<Self>`
    /// (not references to them) are accepted as method receivers on
    /// stable Rust, and the worker thread needs its own owned `Arc`
    /// clone to report back through on exit.
    ///
    /// Validation order matches spec.md §4.4 exactly: type known, name
    /// shape, argstring non-empty, then the duplicate check.
    ///
    /// # Errors
    /// Returns [`RegistryError`] on any validation failure, including a
    /// name collision with an already-registered service.
    pub fn create(
        registry: &Arc<Self>,
        type_tag: &str,
        name: &str,
        argstring: &str,
        router: Router,
        config: Arc<ConfigStore>,
        recv_timeout: RecvTimeoutMs,
    ) -> Result<(), RegistryError> {
        if type_tag.is_empty() {
            return Err(RegistryError::EmptyType);
        }
        let service_type: ServiceType = type_tag.parse()?;

        if name.is_empty() || name.len() > crate::domain_types::MAX_IDENTITY_LEN {
            return Err(RegistryError::InvalidName {
                name: name.to_string(),
            });
        }
        if name == SYS_IDENTITY {
            return Err(RegistryError::ReservedName);
        }
        if argstring.is_empty() {
            return Err(RegistryError::EmptyArgString);
        }

        let identity = ServiceIdentity::try_new(name).map_err(|_| RegistryError::InvalidName {
            name: name.to_string(),
        })?;

        {
            let mut services = registry.services.lock().expect("registry mutex poisoned");
            if services.contains_key(&identity) {
                return Err(RegistryError::DuplicateName {
                    name: name.to_string(),
                });
            }
            services.insert(
                identity.clone(),
                ServiceRecord {
                    service_type,
                    argstring: argstring.to_string(),
                    join_handle: None,
                },
            );
        }

        info!(name, type_tag, "creating service");
        let handle = runner::spawn_worker(
            identity.clone(),
            service_type,
            argstring.to_string(),
            router,
            config,
            recv_timeout,
            Arc::clone(registry),
        );

        let mut services = registry.services.lock().expect("registry mutex poisoned");
        if let Some(record) = services.get_mut(&identity) {
            record.join_handle = Some(handle);
        }

        Ok(())
    }

    /// Removes `name`'s record; if the registry is now empty, routes
    /// `sys/shutdown` so the dispatch loop exits.
    pub fn on_service_exit(&self, name: &ServiceIdentity, router: &Router) {
        let now_empty = {
            let mut services = self.services.lock().expect("registry mutex poisoned");
            services.remove(name);
            services.is_empty()
        };
        debug!(name = %name, now_empty, "service exited");
        if now_empty {
            let _ = router.submit(crate::router::Frame {
                source: ServiceIdentity::dummy(),
                destination: SYS_IDENTITY.to_string(),
                payload: bytes::Bytes::from_static(b"shutdown"),
            });
        }
    }

    /// Whether no services are currently registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.services.lock().expect("registry mutex poisoned").is_empty()
    }

    /// Number of currently registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.lock().expect("registry mutex poisoned").len()
    }

    /// Sends `sys/exit` to every service (via a disposable sentinel
    /// mailbox) and waits until the registry drains, polling every 10ms.
    /// Idempotent: returns immediately if already empty.
    pub async fn stop(&self, router: &Router) {
        if self.is_empty() {
            return;
        }
        let _ = router.submit(crate::router::Frame {
            source: ServiceIdentity::dummy(),
            destination: SYS_IDENTITY.to_string(),
            payload: bytes::Bytes::from_static(b"exit"),
        });
        while !self.is_empty() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}
