//! Dispatcher
//!
//! Validates an invocation against the registry, resolves the VM path the
//! command-line tools need, routes to the right backend and reports one
//! normalized result.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vmware_core::Config;

use crate::args::Args;
use crate::backend::{BackendResult, Backends, CliBackend, Payload};
use crate::cache::LocatorCache;
use crate::error::DispatchError;
use crate::registry::{Handler, Operation, Registry};

pub struct Dispatcher {
    registry: Registry,
    backends: Backends,
    cache: Arc<LocatorCache>,
    strict_ids: bool,
}

impl Dispatcher {
    pub fn new(registry: Registry, backends: Backends) -> Self {
        Self {
            registry,
            backends,
            cache: Arc::new(LocatorCache::new()),
            strict_ids: false,
        }
    }

    /// Share an existing cache instead of starting empty
    pub fn with_cache(mut self, cache: Arc<LocatorCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Fail with `UnresolvedIdentifier` instead of passing an empty path
    pub fn strict(mut self, strict_ids: bool) -> Self {
        self.strict_ids = strict_ids;
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, DispatchError> {
        let backends = Backends::from_config(config)?;
        Ok(Self::new(Registry::with_catalog(), backends).strict(config.strict_ids))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn cache(&self) -> &LocatorCache {
        &self.cache
    }

    /// Run one invocation end to end
    pub async fn invoke(&self, name: &str, raw: &Map<String, Value>) -> BackendResult {
        let operation = self.registry.get_schema(name)?;
        let mut args = Args::decode(operation, raw)?;

        if operation.needs_locator() {
            if let Some(vm_id) = args.vm_id().map(str::to_string) {
                let locator = self.resolve(&vm_id).await?;
                args.set_locator(locator);
            }
        }

        let result = self.route(operation, &args).await;

        match &result {
            Ok(payload) => {
                if operation.refreshes_locators {
                    if let Some(listing) = payload.as_json() {
                        match self.cache.refresh_from_listing(listing) {
                            Some(count) => debug!("Cached paths for {} VMs", count),
                            None => warn!("VM listing is not an array, keeping cached paths"),
                        }
                    }
                }
                info!(tool = name, backend = operation.backend().as_str(), "tool call succeeded");
            }
            Err(e) => warn!(tool = name, kind = e.kind(), "tool call failed: {}", e),
        }

        result
    }

    async fn route(&self, operation: &Operation, args: &Args) -> BackendResult {
        match operation.handler {
            Handler::Rest(build) => {
                let request = build(args)?;
                self.backends.rest.execute(&request).await
            }
            Handler::VmRun(build) => {
                let command = build(args)?;
                self.backends.vmrun.run(&command).await.map(Payload::Text)
            }
            Handler::VmCli(build) => {
                let command = build(args)?;
                self.backends.vmcli.run(&command).await.map(Payload::Text)
            }
        }
    }

    /// vm_id to .vmx path, listing VMs over REST once on a miss
    ///
    /// In the default soft mode an id that stays unknown resolves to ""
    /// and the CLI tool reports the bad path itself.
    async fn resolve(&self, vm_id: &str) -> Result<String, DispatchError> {
        if let Some(path) = self.cache.get(vm_id) {
            return Ok(path);
        }

        debug!("No cached path for {}, listing VMs", vm_id);
        match self.backends.rest.list_vms().await {
            Ok(payload) => {
                if let Some(listing) = payload.as_json() {
                    self.cache.refresh_from_listing(listing);
                }
            }
            Err(e) if self.strict_ids => return Err(e),
            Err(e) => warn!("Could not list VMs to resolve {}: {}", vm_id, e),
        }

        match self.cache.get(vm_id) {
            Some(path) => Ok(path),
            None if self.strict_ids => Err(DispatchError::UnresolvedIdentifier(vm_id.to_string())),
            None => {
                warn!("Unknown vm_id {}, passing an empty path", vm_id);
                Ok(String::new())
            }
        }
    }
}
