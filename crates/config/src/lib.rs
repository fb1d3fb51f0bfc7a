// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sy-config: Declarative server configuration.
//!
//! The configuration file is HCL with four block kinds:
//!
//! ```hcl
//! host {
//!   hostnames   = ["localhost", "*"]
//!   certificate = "/etc/sy/cert.pem"
//!   private_key = "/etc/sy/key.pem"
//! }
//!
//! endpoint "main" {
//!   hostnames = ["*"]
//!   interface = "0.0.0.0:8080"
//!   protocol  = "http"
//!   mount { application = "site", hostname = "*", path = "/*" }
//! }
//!
//! application "site" {
//!   class          = "static-files"
//!   site_directory = "/var/www"
//! }
//!
//! service "requests" {
//!   class = "request-logger"
//!   path  = "/var/log/sy/requests.log"
//! }
//! ```
//!
//! Parsing produces typed records; [`ServerConfig::validate`] performs
//! the semantic checks that make a config runnable (valid names and
//! patterns, resolvable references, no duplicate mounts).

mod application;
mod endpoint;
mod host;
mod service;
mod validate;

pub use application::ApplicationConfig;
pub use endpoint::{
    EndpointConfig, EndpointServices, InterfaceConfig, MountConfig, Protocol,
};
pub use host::HostConfig;
pub use service::ServiceConfig;

use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] hcl::Error),

    #[error("invalid {kind} name {name:?}: {source}")]
    BadName {
        kind: &'static str,
        name: String,
        #[source]
        source: sy_core::NameError,
    },

    #[error("endpoint {endpoint:?}: invalid hostname pattern {pattern:?}: {source}")]
    BadHostPattern {
        endpoint: String,
        pattern: String,
        #[source]
        source: sy_core::PathKeyError,
    },

    #[error("endpoint {endpoint:?}: invalid path pattern {pattern:?}: {source}")]
    BadPathPattern {
        endpoint: String,
        pattern: String,
        #[source]
        source: sy_core::PathKeyError,
    },

    #[error("endpoint {endpoint:?}: mount references unknown application {application:?}")]
    UnknownApplication { endpoint: String, application: String },

    #[error("endpoint {endpoint:?}: references unknown service {service:?}")]
    UnknownService { endpoint: String, service: String },

    #[error("endpoint {endpoint:?}: duplicate mount for hostname {hostname:?} path {path:?}")]
    DuplicateMount { endpoint: String, hostname: String, path: String },

    #[error("endpoint {endpoint:?}: no mounts configured")]
    NoMounts { endpoint: String },

    #[error("endpoint {endpoint:?} uses protocol {protocol} but no host blocks are configured")]
    MissingHosts { endpoint: String, protocol: Protocol },

    #[error("host block has no hostnames")]
    HostWithoutHostnames,

    #[error("no endpoints configured")]
    NoEndpoints,
}

/// The whole declarative configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// TLS host material (certificate per set of hostnames).
    #[serde(rename = "host", default, deserialize_with = "one_or_many")]
    pub hosts: Vec<HostConfig>,

    /// Listening endpoints by name.
    #[serde(rename = "endpoint", default)]
    pub endpoints: IndexMap<String, EndpointConfig>,

    /// Applications by name.
    #[serde(rename = "application", default)]
    pub applications: IndexMap<String, ApplicationConfig>,

    /// Services by name.
    #[serde(rename = "service", default)]
    pub services: IndexMap<String, ServiceConfig>,
}

impl ServerConfig {
    /// Parse a config from HCL text. Names are injected from block
    /// labels; no semantic validation happens here.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config: ServerConfig = hcl::from_str(text)?;
        for (name, endpoint) in &mut config.endpoints {
            endpoint.name = name.clone();
        }
        for (name, application) in &mut config.applications {
            application.name = name.clone();
        }
        for (name, service) in &mut config.services {
            service.name = name.clone();
        }
        Ok(config)
    }

    /// Read, parse, and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&text)?;
        config.validate()?;
        Ok(config)
    }
}

/// Accept a single HCL block or a repeated one as a list.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Helper<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Helper::deserialize(deserializer)? {
        Helper::Many(items) => items,
        Helper::One(item) => vec![item],
    })
}
