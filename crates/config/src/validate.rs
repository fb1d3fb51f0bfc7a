// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Semantic validation of a parsed configuration.

use crate::{ConfigError, ServerConfig};
use std::collections::HashSet;
use sy_core::{ComponentName, PathKey};

impl ServerConfig {
    /// Check everything that makes a parsed config runnable: valid
    /// names and patterns, resolvable references, no duplicate mounts,
    /// TLS material present for secure protocols.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::NoEndpoints);
        }

        for host in &self.hosts {
            if host.hostnames.is_empty() {
                return Err(ConfigError::HostWithoutHostnames);
            }
            for pattern in &host.hostnames {
                PathKey::parse_hostname(pattern, true).map_err(|source| {
                    ConfigError::BadHostPattern {
                        endpoint: "(host block)".to_string(),
                        pattern: pattern.clone(),
                        source,
                    }
                })?;
            }
        }

        for (name, application) in &self.applications {
            check_name("application", name)?;
            debug_assert_eq!(&application.name, name);
        }
        for (name, service) in &self.services {
            check_name("service", name)?;
            debug_assert_eq!(&service.name, name);
        }

        for (name, endpoint) in &self.endpoints {
            check_name("endpoint", name)?;

            if endpoint.protocol.is_secure() && self.hosts.is_empty() {
                return Err(ConfigError::MissingHosts {
                    endpoint: name.clone(),
                    protocol: endpoint.protocol,
                });
            }

            for pattern in &endpoint.hostnames {
                PathKey::parse_hostname(pattern, true).map_err(|source| {
                    ConfigError::BadHostPattern {
                        endpoint: name.clone(),
                        pattern: pattern.clone(),
                        source,
                    }
                })?;
            }

            if endpoint.mounts.is_empty() {
                return Err(ConfigError::NoMounts { endpoint: name.clone() });
            }

            let mut seen = HashSet::new();
            for mount in &endpoint.mounts {
                if !self.applications.contains_key(&mount.application) {
                    return Err(ConfigError::UnknownApplication {
                        endpoint: name.clone(),
                        application: mount.application.clone(),
                    });
                }
                let host_key =
                    PathKey::parse_hostname(&mount.hostname, true).map_err(|source| {
                        ConfigError::BadHostPattern {
                            endpoint: name.clone(),
                            pattern: mount.hostname.clone(),
                            source,
                        }
                    })?;
                let path_key =
                    PathKey::parse_path_pattern(&mount.path).map_err(|source| {
                        ConfigError::BadPathPattern {
                            endpoint: name.clone(),
                            pattern: mount.path.clone(),
                            source,
                        }
                    })?;
                if !seen.insert((host_key, path_key)) {
                    return Err(ConfigError::DuplicateMount {
                        endpoint: name.clone(),
                        hostname: mount.hostname.clone(),
                        path: mount.path.clone(),
                    });
                }
            }

            for service in [
                endpoint.services.rate_limiter.as_ref(),
                endpoint.services.request_logger.as_ref(),
            ]
            .into_iter()
            .flatten()
            {
                if !self.services.contains_key(service) {
                    return Err(ConfigError::UnknownService {
                        endpoint: name.clone(),
                        service: service.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn check_name(kind: &'static str, name: &str) -> Result<(), ConfigError> {
    ComponentName::new(name).map_err(|source| ConfigError::BadName {
        kind,
        name: name.to_string(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
