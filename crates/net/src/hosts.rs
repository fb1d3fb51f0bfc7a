// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hostname-to-certificate manager with SNI resolution.
//!
//! Each `host { }` block yields one certified key shared by all of the
//! block's hostname patterns. Lookups take the most-specific match;
//! `*` is the terminal fallback and also serves clients that send no
//! SNI at all.

use rustls::crypto::aws_lc_rs::sign::any_supported_type;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::ServerConfig;
use rustls_pki_types::{CertificateDer, PrivateKeyDer};
use std::path::Path;
use std::sync::Arc;
use sy_config::{HostConfig, Protocol};
use sy_core::{PathKey, PathMap};
use thiserror::Error;

/// Errors from host-manager construction.
#[derive(Debug, Error)]
pub enum HostsError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no certificates found in {0}")]
    NoCertificates(String),

    #[error("no private key found in {0}")]
    NoPrivateKey(String),

    #[error("invalid certificate material in {origin}: {detail}")]
    BadMaterial { origin: String, detail: String },

    #[error("invalid hostname pattern {pattern:?}: {source}")]
    BadHostname {
        pattern: String,
        #[source]
        source: sy_core::PathKeyError,
    },

    #[error("hostname bound twice: {0:?}")]
    DuplicateHostname(String),
}

/// Immutable map from hostname patterns to TLS material.
pub struct HostManager {
    map: PathMap<Arc<CertifiedKey>>,
}

impl std::fmt::Debug for HostManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostManager")
            .field("hostnames", &self.map.len())
            .finish()
    }
}

impl HostManager {
    /// Build from `host` blocks. Relative certificate/key paths are
    /// resolved against `base_dir`.
    pub fn from_configs(hosts: &[HostConfig], base_dir: &Path) -> Result<Self, HostsError> {
        let mut map = PathMap::new();
        for host in hosts {
            let certified = Arc::new(load_certified_key(host, base_dir)?);
            for pattern in &host.hostnames {
                let key = PathKey::parse_hostname(pattern, true).map_err(|source| {
                    HostsError::BadHostname { pattern: pattern.clone(), source }
                })?;
                map.add(&key, Arc::clone(&certified))
                    .map_err(|_| HostsError::DuplicateHostname(pattern.clone()))?;
            }
        }
        Ok(Self { map })
    }

    /// Number of bound hostname patterns.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Most-specific certificate for `name`, if any.
    pub fn find_context(&self, name: &str) -> Option<Arc<CertifiedKey>> {
        let key = PathKey::parse_hostname(name, true).ok()?;
        self.map.find(&key).map(|hit| Arc::clone(hit.value()))
    }

    /// The `*` fallback entry, used when a client sends no SNI.
    pub fn default_context(&self) -> Option<Arc<CertifiedKey>> {
        self.map
            .find(&PathKey::any())
            .map(|hit| Arc::clone(hit.value()))
    }

    /// A rustls server config using this manager for SNI, with ALPN
    /// set for `protocol`.
    pub fn server_config(self: &Arc<Self>, protocol: Protocol) -> ServerConfig {
        let mut config = ServerConfig::builder()
            .with_no_client_auth()
            .with_cert_resolver(Arc::clone(self) as Arc<dyn ResolvesServerCert>);
        config.alpn_protocols = match protocol {
            Protocol::Http2 => vec![b"h2".to_vec(), b"http/1.1".to_vec()],
            _ => vec![b"http/1.1".to_vec()],
        };
        config
    }
}

impl ResolvesServerCert for HostManager {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        match client_hello.server_name() {
            Some(name) => self.find_context(name).or_else(|| self.default_context()),
            None => self.default_context(),
        }
    }
}

/// Read a PEM value that is either inline material or a file path.
fn read_pem(value: &str, base_dir: &Path) -> Result<(Vec<u8>, String), HostsError> {
    if HostConfig::is_inline_pem(value) {
        return Ok((value.as_bytes().to_vec(), "(inline pem)".to_string()));
    }
    let path = base_dir.join(value);
    let origin = path.display().to_string();
    let bytes = std::fs::read(&path).map_err(|source| HostsError::Io {
        path: origin.clone(),
        source,
    })?;
    Ok((bytes, origin))
}

fn load_certified_key(host: &HostConfig, base_dir: &Path) -> Result<CertifiedKey, HostsError> {
    let (cert_pem, cert_origin) = read_pem(&host.certificate, base_dir)?;
    let certs: Vec<CertificateDer<'static>> =
        rustls_pemfile::certs(&mut cert_pem.as_slice())
            .collect::<Result<_, _>>()
            .map_err(|error| HostsError::BadMaterial {
                origin: cert_origin.clone(),
                detail: error.to_string(),
            })?;
    if certs.is_empty() {
        return Err(HostsError::NoCertificates(cert_origin));
    }

    let (key_pem, key_origin) = read_pem(&host.private_key, base_dir)?;
    let key: PrivateKeyDer<'static> =
        rustls_pemfile::private_key(&mut key_pem.as_slice())
            .map_err(|error| HostsError::BadMaterial {
                origin: key_origin.clone(),
                detail: error.to_string(),
            })?
            .ok_or_else(|| HostsError::NoPrivateKey(key_origin.clone()))?;

    let signing_key = any_supported_type(&key).map_err(|error| HostsError::BadMaterial {
        origin: key_origin,
        detail: error.to_string(),
    })?;

    Ok(CertifiedKey::new(certs, signing_key))
}

#[cfg(test)]
#[path = "hosts_tests.rs"]
mod tests;
