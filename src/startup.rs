//! Process entry point
//!
//! Implements spec.md §4.5's six-step bootstrap sequence over this
//! crate's config/router/registry stack.

use std::sync::Arc;

use tracing::error;

use crate::config::ConfigStore;
use crate::domain_types::{MaxIpcMsgSize, RecvTimeoutMs};
use crate::router::Router;
use crate::service::registry::ServiceRegistry;

const REQUIRED_KEYS: &[&str] = &["start_type", "start_name", "start_file"];

/// Runs the framework to completion, returning the process exit code.
///
/// No version check is performed (step 1 of the original bootstrap):
/// there is no external messaging library to version-check for an
/// in-process channel router, so this step is a Non-goal carryover.
pub async fn start(config_path: &str) -> i32 {
    let config = match ConfigStore::initialize(config_path) {
        Ok(config) => Arc::new(config),
        Err(error) => {
            error!(%error, config_path, "failed to initialize config store");
            return 1;
        }
    };

    if let Err(error) = config.validate_required(REQUIRED_KEYS) {
        error!(%error, "missing required configuration");
        return 1;
    }

    let max_msg_size = match MaxIpcMsgSize::try_new(usize_config(&config, "max_ipc_msg_size", 65536)) {
        Ok(size) => size,
        Err(_) => {
            error!("max_ipc_msg_size must be greater than zero");
            return 1;
        }
    };
    let recv_timeout = RecvTimeoutMs::from_config_value(config.get_int("max_recv_timeout"));

    let (router, inbound_rx) = Router::bind(max_msg_size);
    let registry = Arc::new(ServiceRegistry::new());

    let start_type = config.get("start_type");
    let start_name = config.get("start_name");
    let start_file = config.get("start_file");

    if let Err(error) = ServiceRegistry::create(
        &registry,
        &start_type,
        &start_name,
        &start_file,
        router.clone(),
        Arc::clone(&config),
        recv_timeout,
    ) {
        error!(%error, "failed to create bootstrap service");
        return 1;
    }

    router.dispatch_loop(inbound_rx).await;

    config.release();
    0
}

fn usize_config(config: &ConfigStore, key: &str, default: usize) -> usize {
    let value = config.get_int(key);
    if value > 0 {
        #[allow(clippy::cast_sign_loss)]
        {
            value as usize
        }
    } else {
        default
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use test_log::test;

    fn write_script(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test(tokio::test)]
    async fn start_fails_fast_on_missing_config_file() {
        let code = start("/nonexistent/config/path").await;
        assert_eq!(code, 1);
    }

    #[test(tokio::test)]
    async fn start_fails_fast_on_missing_required_key() {
        let file = write_script("start_type = \"luasandbox\"\n");
        let code = start(file.path().to_str().unwrap()).await;
        assert_eq!(code, 1);
    }

    #[test(tokio::test)]
    async fn start_fails_on_unknown_service_type() {
        let file = write_script(
            "start_type = \"wasm\"\nstart_name = \"main\"\nstart_file = \"x.lua arg\"\n",
        );
        let code = start(file.path().to_str().unwrap()).await;
        assert_eq!(code, 1);
    }

    #[test(tokio::test)]
    async fn start_runs_bootstrap_service_to_shutdown() {
        let mut script = tempfile::NamedTempFile::with_suffix(".lua").unwrap();
        script
            .write_all(b"ringbus.shutdown()\n")
            .unwrap();
        let script_path = script.path().to_str().unwrap().to_string();

        let config = write_script(&format!(
            "start_type = \"luasandbox\"\nstart_name = \"main\"\nstart_file = \"{script_path} noargs\"\n"
        ));

        let code = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            start(config.path().to_str().unwrap()),
        )
        .await
        .expect("start() did not complete after bootstrap service called shutdown()");
        assert_eq!(code, 0);
    }
}
