//! Embedded Lua scripting sandbox
//!
//! Grounded in `original_source/src/service/LuaService.cpp`
//! (`Initialize`/`LoadLibPath`/`Run`) and
//! `original_source/src/lualib-src/lua_qsf.cpp` (the host function
//! table). Each service gets its own `mlua::Lua` instance on its own
//! worker thread; no state is shared across Lua VMs.

use std::sync::Arc;

use async_trait::async_trait;
use mlua::{Lua, MultiValue, Value, Variadic};
use tokio::runtime::Handle;
use tracing::error;

use crate::config::ConfigStore;
use crate::domain_types::RecvTimeoutMs;
use crate::error::FrameworkError;
use crate::mailbox::Mailbox;
use crate::router::Router;
use crate::service::registry::ServiceRegistry;
use crate::service::ServiceImpl;

/// A single Lua-scripted service instance.
pub struct LuaSandboxService {
    config: Arc<ConfigStore>,
    router: Router,
    registry: Arc<ServiceRegistry>,
    recv_timeout: RecvTimeoutMs,
}

impl LuaSandboxService {
    /// Builds a service bound to the process-wide config store, router,
    /// and registry; the Lua VM itself is constructed lazily in
    /// [`ServiceImpl::run`] once the mailbox is available to bind host
    /// functions against.
    #[must_use]
    pub fn new(
        config: Arc<ConfigStore>,
        router: Router,
        registry: Arc<ServiceRegistry>,
        recv_timeout: RecvTimeoutMs,
    ) -> Self {
        Self {
            config,
            router,
            registry,
            recv_timeout,
        }
    }

    fn load_lib_path(lua: &Lua, config: &ConfigStore) -> mlua::Result<()> {
        let path = config.get("lua_path");
        if !path.is_empty() {
            let chunk = format!("package.path = package.path .. ';' .. '{path}'");
            lua.load(&chunk).exec()?;
        }
        let cpath = config.get("lua_cpath");
        if !cpath.is_empty() {
            let chunk = format!("package.cpath = package.cpath .. ';' .. '{cpath}'");
            lua.load(&chunk).exec()?;
        }
        Ok(())
    }
}

#[async_trait]
impl ServiceImpl for LuaSandboxService {
    async fn run(&mut self, mailbox: Mailbox, argstring: String) -> Result<i32, FrameworkError> {
        if argstring.is_empty() {
            return Ok(1);
        }
        let (filename, loader) = crate::utils::strings::split_first(&argstring, ' ');
        let filename = filename.to_string();
        let loader = loader.to_string();
        let identity = mailbox.identity().to_string();

        let lua = Lua::new();
        Self::load_lib_path(&lua, &self.config)?;
        bind_host_table(
            &lua,
            mailbox,
            self.router.clone(),
            Arc::clone(&self.config),
            Arc::clone(&self.registry),
            self.recv_timeout,
        )?;

        let handle = Handle::current();
        let run_result = tokio::task::spawn_blocking(move || {
            let _guard = handle.enter();
            let chunk = match std::fs::read_to_string(&filename) {
                Ok(chunk) => chunk,
                Err(error) => {
                    error!(%identity, %error, filename, "failed to read lua script");
                    return 1;
                }
            };
            match lua.load(&chunk).set_name(&filename).call::<_, ()>(loader) {
                Ok(()) => 0,
                Err(error) => {
                    error!(%identity, %error, "lua script raised an error");
                    1
                }
            }
        })
        .await
        .map_err(|e| FrameworkError::ServicePanicked(e.to_string()))?;

        Ok(run_result)
    }
}

/// Registers the `ringbus` host table (`send`, `recv`, `name`, `launch`,
/// `shutdown`, `sleep`, `tickcount`, `concurrency`) as a Lua global,
/// bridging the script to the owning mailbox, router, config store, and
/// service registry.
fn bind_host_table(
    lua: &Lua,
    mailbox: Mailbox,
    router: Router,
    config: Arc<ConfigStore>,
    registry: Arc<ServiceRegistry>,
    recv_timeout: RecvTimeoutMs,
) -> mlua::Result<()> {
    let table = lua.create_table()?;
    let identity_str = mailbox.identity().to_string();
    let mailbox = Arc::new(tokio::sync::Mutex::new(mailbox));
    let handle = Handle::current();

    table.set("name", identity_str)?;

    {
        let mailbox = Arc::clone(&mailbox);
        let handle = handle.clone();
        table.set(
            "send",
            lua.create_function(move |_, (peer, data): (String, mlua::String)| {
                let guard = handle.block_on(mailbox.lock());
                guard
                    .send(&peer, bytes::Bytes::copy_from_slice(data.as_bytes()))
                    .map_err(|e| mlua::Error::RuntimeError(e.to_string()))
            })?,
        )?;
    }

    {
        let mailbox = Arc::clone(&mailbox);
        let handle = handle.clone();
        table.set(
            "recv",
            lua.create_function(move |lua, option: Option<String>| {
                let dont_wait = option.as_deref() == Some("dontwait");
                let mailbox = Arc::clone(&mailbox);
                let (count, source_payload) = handle.block_on(async {
                    let mut guard = mailbox.lock().await;
                    let mut source_payload = None;
                    let count = if dont_wait {
                        guard.recv_nonblocking(|source, payload| {
                            source_payload = Some((source.to_string(), payload.clone()));
                        })
                    } else {
                        guard
                            .recv_blocking(|source, payload| {
                                source_payload = Some((source.to_string(), payload.clone()));
                            })
                            .await
                    };
                    (count, source_payload)
                });

                let mut result = MultiValue::new();
                if count == 1 {
                    if let Some((source, payload)) = source_payload {
                        result.push_back(Value::String(lua.create_string(&source)?));
                        result.push_back(Value::String(lua.create_string(&payload)?));
                    }
                }
                Ok(result)
            })?,
        )?;
    }

    {
        let router = router.clone();
        let config = Arc::clone(&config);
        let registry = Arc::clone(&registry);
        table.set(
            "launch",
            lua.create_function(move |_, args: Variadic<String>| -> mlua::Result<bool> {
                if !(2..=3).contains(&args.len()) {
                    return Err(mlua::Error::RuntimeError(
                        "launch requires name, script_path, argstring?".to_string(),
                    ));
                }
                let name = &args[0];
                let script_path = &args[1];
                // launch() always creates a luasandbox service: there is no
                // type argument on this surface. No implicit "father"
                // argument either, per the simpler lineage: argstring is
                // appended verbatim.
                let argstring = match args.get(2) {
                    Some(extra) => format!("{script_path} {extra}"),
                    None => format!("{script_path} "),
                };
                let created = ServiceRegistry::create(
                    &registry,
                    "luasandbox",
                    name,
                    &argstring,
                    router.clone(),
                    Arc::clone(&config),
                    recv_timeout,
                );
                Ok(created.is_ok())
            })?,
        )?;
    }

    table.set(
        "shutdown",
        lua.create_function(move |_, ()| {
            tracing::info!("lua script invoked shutdown()");
            let _ = router.submit(crate::router::Frame {
                source: crate::domain_types::ServiceIdentity::dummy(),
                destination: crate::domain_types::SYS_IDENTITY.to_string(),
                payload: bytes::Bytes::from_static(b"shutdown"),
            });
            Ok(())
        })?,
    )?;

    table.set(
        "sleep",
        lua.create_function(|_, millis: u64| {
            std::thread::sleep(std::time::Duration::from_millis(millis));
            Ok(())
        })?,
    )?;

    table.set(
        "tickcount",
        lua.create_function(|_, ()| Ok(crate::utils::tickcount()))?,
    )?;

    table.set(
        "concurrency",
        lua.create_function(|_, ()| Ok(num_cpus::get()))?,
    )?;

    lua.globals().set("ringbus", table)?;
    Ok(())
}
