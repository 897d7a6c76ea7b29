//! Worker-thread spawning for services
//!
//! Each service runs on its own dedicated OS thread driving a small
//! `current_thread` Tokio runtime, so synchronous script callbacks can
//! `block_on` async mailbox operations. Panics are caught at the thread
//! boundary, mirroring the original's `catch (std::exception&)/catch
//! (...)` pair around the thread callback.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{error, info};

use crate::config::ConfigStore;
use crate::domain_types::{RecvTimeoutMs, ServiceIdentity};
use crate::mailbox::Mailbox;
use crate::router::Router;
use crate::service::factory::ServiceType;
use crate::service::lua_service::LuaSandboxService;
use crate::service::registry::ServiceRegistry;
use crate::service::shared_service::SharedService;
use crate::service::ServiceImpl;

/// Spawns the OS thread that drives one service for its entire
/// lifetime, from mailbox construction through exit notification.
#[allow(clippy::too_many_arguments)]
pub fn spawn_worker(
    identity: ServiceIdentity,
    service_type: ServiceType,
    argstring: String,
    router: Router,
    config: Arc<ConfigStore>,
    recv_timeout: RecvTimeoutMs,
    registry: Arc<ServiceRegistry>,
) -> JoinHandle<()> {
    let thread_name = identity.to_string();
    std::thread::Builder::new()
        .name(thread_name)
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(error) => {
                    error!(name = %identity, %error, "failed to build service runtime");
                    registry.on_service_exit(&identity, &router);
                    return;
                }
            };

            let outcome = catch_unwind(AssertUnwindSafe(|| {
                runtime.block_on(run_service(
                    &identity,
                    service_type,
                    &argstring,
                    router.clone(),
                    &config,
                    recv_timeout,
                    &registry,
                ))
            }));

            match outcome {
                Ok(Ok(code)) => info!(name = %identity, code, "service exited"),
                Ok(Err(error)) => error!(name = %identity, %error, "service returned an error"),
                Err(panic) => {
                    let message = panic_message(&panic);
                    error!(name = %identity, message, "service panicked");
                }
            }

            registry.on_service_exit(&identity, &router);
        })
        .expect("failed to spawn service worker thread")
}

async fn run_service(
    identity: &ServiceIdentity,
    service_type: ServiceType,
    argstring: &str,
    router: Router,
    config: &Arc<ConfigStore>,
    recv_timeout: RecvTimeoutMs,
    registry: &Arc<ServiceRegistry>,
) -> Result<i32, crate::error::FrameworkError> {
    let mailbox = Mailbox::bind(identity.clone(), router.clone(), recv_timeout)?;
    match service_type {
        ServiceType::LuaSandbox => {
            let mut service = LuaSandboxService::new(
                Arc::clone(config),
                router,
                Arc::clone(registry),
                recv_timeout,
            );
            service.run(mailbox, argstring.to_string()).await
        }
        ServiceType::Shared => {
            let (lib_path, remainder) = crate::utils::strings::split_first(argstring, ' ');
            let mut service = SharedService::load(lib_path)?;
            service.run(mailbox, remainder.to_string()).await
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
