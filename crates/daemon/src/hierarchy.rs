// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration → component tree.
//!
//! The built tree is `server` → (`services`, `applications`,
//! `endpoints`), one child per configured item. Services are inserted
//! first so they start before the endpoints that feed them and, by
//! reverse-order stop, shut down after those endpoints have drained.

use crate::component::{Component, ComponentError, ComponentHandle, ControlContext};
use crate::events::EventSource;
use crate::services::{
    ProcessInfoService, RateLimiterService, RequestLoggerService, ServiceBuildError,
    SystemLoggerService,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sy_config::{EndpointConfig, ServerConfig};
use sy_core::{ComponentName, LogRecord, TagLogger};
use sy_net::apps::{
    AppBuildError, AppRegistry, HostRouterApp, PathRouterApp, RedirectorApp,
    StaticFilesApp,
};
use sy_net::endpoint::RouterError;
use sy_net::{
    Application, EndpointRouter, HostManager, HostsError, ProtocolWrangler,
    RequestEventSink, WranglerConfig, WranglerError, WranglerServices,
};
use thiserror::Error;

/// Errors from hierarchy construction. Fatal at initial startup;
/// logged and ignored on reload (the old tree keeps serving).
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error(transparent)]
    Config(#[from] sy_config::ConfigError),

    #[error(transparent)]
    Hosts(#[from] HostsError),

    #[error(transparent)]
    AppBuild(#[from] AppBuildError),

    #[error(transparent)]
    ServiceBuild(#[from] ServiceBuildError),

    #[error(transparent)]
    Router(#[from] RouterError),

    #[error(transparent)]
    Wrangler(#[from] WranglerError),

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error("application {name:?}: unknown class {class:?}")]
    UnknownApplicationClass { name: String, class: String },

    #[error("service {name:?}: unknown class {class:?}")]
    UnknownServiceClass { name: String, class: String },

    #[error("router {router:?} references unknown application {target:?}")]
    UnknownRouteTarget { router: String, target: String },

    #[error("endpoint {endpoint:?}: service {service:?} is not a {expected}")]
    ServiceClassMismatch {
        endpoint: String,
        service: String,
        expected: &'static str,
    },

    #[error("invalid component name {0:?}")]
    BadName(String),
}

fn component_name(name: &str) -> Result<ComponentName, HierarchyError> {
    ComponentName::new(name).map_err(|_| HierarchyError::BadName(name.to_string()))
}

/// Structural component with no behavior of its own.
struct Group;

#[async_trait]
impl Component for Group {}

/// Tree node owning a configured application.
struct AppComponent {
    application: Arc<dyn Application>,
}

#[async_trait]
impl Component for AppComponent {
    async fn on_init(&self, ctx: &ControlContext) -> Result<(), ComponentError> {
        ctx.logger().emit(
            "configured",
            serde_json::json!({ "application": self.application.name() }),
        );
        Ok(())
    }
}

/// Tree node owning one endpoint's wrangler.
///
/// The router and wrangler are constructed at init so they carry the
/// component's own logger; everything fallible about their inputs is
/// checked at build time.
struct EndpointComponent {
    config: EndpointConfig,
    applications: HashMap<String, Arc<dyn Application>>,
    hosts: Option<Arc<HostManager>>,
    services: WranglerServices,
    wrangler: Mutex<Option<Arc<ProtocolWrangler>>>,
}

impl EndpointComponent {
    fn wrangler_config(&self) -> WranglerConfig {
        WranglerConfig {
            name: self.config.name.clone(),
            bind_address: self.config.interface.bind_address(),
            protocol: self.config.protocol,
            stop_grace: Duration::from_millis(self.config.stop_grace_ms),
        }
    }

    fn build_wrangler(
        &self,
        logger: &TagLogger,
    ) -> Result<Arc<ProtocolWrangler>, HierarchyError> {
        let router = Arc::new(EndpointRouter::new(
            &self.config.mounts,
            &self.applications,
            logger.clone(),
        )?);
        let wrangler = ProtocolWrangler::new(
            self.wrangler_config(),
            router,
            self.hosts.as_ref(),
            self.services.clone(),
            logger.clone(),
        )?;
        Ok(Arc::new(wrangler))
    }
}

#[async_trait]
impl Component for EndpointComponent {
    async fn on_init(&self, ctx: &ControlContext) -> Result<(), ComponentError> {
        let wrangler = self
            .build_wrangler(ctx.logger())
            .map_err(|e| ComponentError::failed(&self.config.name, e))?;
        *self.wrangler.lock() = Some(wrangler);
        Ok(())
    }

    async fn on_start(&self, ctx: &ControlContext) -> Result<(), ComponentError> {
        let wrangler = self.wrangler.lock().clone();
        let Some(wrangler) = wrangler else {
            return Err(ComponentError::failed(
                &self.config.name,
                std::io::Error::other("endpoint started before init"),
            ));
        };
        let address = wrangler
            .start()
            .await
            .map_err(|e| ComponentError::failed(&self.config.name, e))?;
        ctx.logger().emit(
            "endpoint-started",
            serde_json::json!({ "address": address.to_string() }),
        );
        Ok(())
    }

    async fn on_stop(
        &self,
        _ctx: &ControlContext,
        _will_reload: bool,
    ) -> Result<(), ComponentError> {
        let wrangler = self.wrangler.lock().clone();
        if let Some(wrangler) = wrangler {
            wrangler.stop().await;
        }
        Ok(())
    }
}

/// Build the full component tree from a validated configuration.
///
/// `base_dir` anchors relative paths (certificates, site directories,
/// log files); `log_records` is the process-wide structured-log chain
/// the system-logger service consumes.
pub fn build_hierarchy(
    config: &ServerConfig,
    base_dir: &Path,
    log_records: EventSource<LogRecord>,
) -> Result<ComponentHandle, HierarchyError> {
    let root = ComponentHandle::new(component_name("server")?, Arc::new(Group));

    let hosts = if config.hosts.is_empty() {
        None
    } else {
        Some(Arc::new(HostManager::from_configs(&config.hosts, base_dir)?))
    };

    // Services.
    let services_group =
        ComponentHandle::new(component_name("services")?, Arc::new(Group));
    let mut rate_limiters: HashMap<String, Arc<RateLimiterService>> = HashMap::new();
    let mut request_loggers: HashMap<String, Arc<RequestLoggerService>> = HashMap::new();
    for (name, service) in &config.services {
        let component: Arc<dyn Component> = match service.class.as_str() {
            "rate-limiter" => {
                let built = Arc::new(RateLimiterService::from_config(name, &service.options)?);
                rate_limiters.insert(name.clone(), Arc::clone(&built));
                built
            }
            "request-logger" => {
                let built = Arc::new(RequestLoggerService::from_config(
                    name,
                    &service.options,
                    base_dir,
                )?);
                request_loggers.insert(name.clone(), Arc::clone(&built));
                built
            }
            "system-logger" => Arc::new(SystemLoggerService::from_config(
                name,
                &service.options,
                base_dir,
                log_records.clone(),
            )?),
            "process-info-file" => {
                Arc::new(ProcessInfoService::from_config(name, &service.options, base_dir)?)
            }
            other => {
                return Err(HierarchyError::UnknownServiceClass {
                    name: name.clone(),
                    class: other.to_string(),
                })
            }
        };
        services_group.add_child(ComponentHandle::new(component_name(name)?, component))?;
    }
    root.add_child(services_group)?;

    // Applications, with router targets resolved through a shared
    // registry so definition order does not matter.
    let applications_group =
        ComponentHandle::new(component_name("applications")?, Arc::new(Group));
    let registry = Arc::new(AppRegistry::new());
    let mut router_targets: Vec<(String, String)> = Vec::new();
    for (name, application) in &config.applications {
        let built: Arc<dyn Application> = match application.class.as_str() {
            "static-files" => Arc::new(StaticFilesApp::from_config(
                name,
                &application.options,
                base_dir,
            )?),
            "redirector" => Arc::new(RedirectorApp::from_config(name, &application.options)?),
            "host-router" => {
                for target in HostRouterApp::target_names(&application.options) {
                    router_targets.push((name.clone(), target));
                }
                Arc::new(HostRouterApp::from_config(
                    name,
                    &application.options,
                    Arc::clone(&registry),
                )?)
            }
            "path-router" => {
                for target in PathRouterApp::target_names(&application.options) {
                    router_targets.push((name.clone(), target));
                }
                Arc::new(PathRouterApp::from_config(
                    name,
                    &application.options,
                    Arc::clone(&registry),
                )?)
            }
            other => {
                return Err(HierarchyError::UnknownApplicationClass {
                    name: name.clone(),
                    class: other.to_string(),
                })
            }
        };
        registry.insert(name.clone(), Arc::clone(&built));
        applications_group.add_child(ComponentHandle::new(
            component_name(name)?,
            Arc::new(AppComponent { application: built }),
        ))?;
    }
    for (router, target) in router_targets {
        if !registry.contains(&target) {
            return Err(HierarchyError::UnknownRouteTarget { router, target });
        }
    }
    root.add_child(applications_group)?;

    // Endpoints.
    let endpoints_group =
        ComponentHandle::new(component_name("endpoints")?, Arc::new(Group));
    let applications = registry.snapshot();
    for (name, endpoint) in &config.endpoints {
        let services = wrangler_services(endpoint, &rate_limiters, &request_loggers)?;
        let component = EndpointComponent {
            config: endpoint.clone(),
            applications: applications.clone(),
            hosts: hosts.clone(),
            services,
            wrangler: Mutex::new(None),
        };
        // Surface router construction problems at build time, not at
        // start.
        let _ = EndpointRouter::new(&endpoint.mounts, &applications, TagLogger::detached())?;
        if endpoint.protocol.is_secure() && hosts.is_none() {
            return Err(HierarchyError::Config(sy_config::ConfigError::MissingHosts {
                endpoint: name.clone(),
                protocol: endpoint.protocol,
            }));
        }
        endpoints_group
            .add_child(ComponentHandle::new(component_name(name)?, Arc::new(component)))?;
    }
    root.add_child(endpoints_group)?;

    Ok(root)
}

fn wrangler_services(
    endpoint: &EndpointConfig,
    rate_limiters: &HashMap<String, Arc<RateLimiterService>>,
    request_loggers: &HashMap<String, Arc<RequestLoggerService>>,
) -> Result<WranglerServices, HierarchyError> {
    let mut services = WranglerServices::default();

    if let Some(name) = &endpoint.services.rate_limiter {
        let limiter =
            rate_limiters
                .get(name)
                .ok_or_else(|| HierarchyError::ServiceClassMismatch {
                    endpoint: endpoint.name.clone(),
                    service: name.clone(),
                    expected: "rate-limiter",
                })?;
        services.connection_bucket = limiter.connection_bucket();
        services.data_bucket = limiter.data_bucket();
    }

    if let Some(name) = &endpoint.services.request_logger {
        let logger =
            request_loggers
                .get(name)
                .ok_or_else(|| HierarchyError::ServiceClassMismatch {
                    endpoint: endpoint.name.clone(),
                    service: name.clone(),
                    expected: "request-logger",
                })?;
        services.request_sink = Some(Arc::clone(logger) as Arc<dyn RequestEventSink>);
    }

    Ok(services)
}

#[cfg(test)]
#[path = "hierarchy_tests.rs"]
mod tests;
