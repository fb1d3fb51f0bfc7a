// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint blocks: listening sockets with protocol, mounts, and
//! attached services.

use serde::{Deserialize, Deserializer, Serialize};

fn default_hostnames() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_mount_hostname() -> String {
    "*".to_string()
}

fn default_mount_path() -> String {
    "/*".to_string()
}

fn default_stop_grace_ms() -> u64 {
    5_000
}

/// Application-layer protocol served by an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Plain HTTP/1.1.
    Http,
    /// TLS + HTTP/1.1.
    Https,
    /// TLS + HTTP/2 with HTTP/1.1 fallback per ALPN.
    Http2,
}

impl Protocol {
    pub fn is_secure(&self) -> bool {
        !matches!(self, Protocol::Http)
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Protocol::Http => "http",
            Protocol::Https => "https",
            Protocol::Http2 => "http2",
        })
    }
}

/// Listen address and port.
///
/// Short form: `interface = "0.0.0.0:8080"`.
/// Block form: `interface = { address = "0.0.0.0", port = 8080 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceConfig {
    pub address: String,
    pub port: u16,
}

impl InterfaceConfig {
    /// The `address:port` string `TcpListener::bind` takes.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

impl<'de> Deserialize<'de> for InterfaceConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Short(String),
            Block { address: String, port: u16 },
        }

        match Helper::deserialize(deserializer)? {
            Helper::Short(s) => {
                let (address, port) = s.rsplit_once(':').ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "interface must be \"address:port\": {s:?}"
                    ))
                })?;
                let port = port.parse().map_err(|_| {
                    serde::de::Error::custom(format!("invalid port in interface: {s:?}"))
                })?;
                Ok(InterfaceConfig { address: address.to_string(), port })
            }
            Helper::Block { address, port } => Ok(InterfaceConfig { address, port }),
        }
    }
}

/// One `mount { }` block: (hostname pattern, path pattern) → application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountConfig {
    /// Name of the application to dispatch to.
    pub application: String,
    /// Hostname pattern (default `*`).
    #[serde(default = "default_mount_hostname")]
    pub hostname: String,
    /// Path pattern (default `/*`).
    #[serde(default = "default_mount_path")]
    pub path: String,
}

/// Service attachments for an endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointServices {
    /// Rate-limiter service name.
    #[serde(default)]
    pub rate_limiter: Option<String>,
    /// Request-logger service name.
    #[serde(default)]
    pub request_logger: Option<String>,
}

/// One `endpoint "name" { }` block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Endpoint name (injected from the block label)
    #[serde(skip)]
    pub name: String,
    /// Hostname patterns this endpoint answers for (default `["*"]`).
    #[serde(default = "default_hostnames")]
    pub hostnames: Vec<String>,
    /// Listen interface.
    pub interface: InterfaceConfig,
    /// Protocol: `http`, `https`, or `http2`.
    pub protocol: Protocol,
    /// Mounts, most-specific match wins at dispatch time.
    #[serde(rename = "mount", default, deserialize_with = "crate::one_or_many")]
    pub mounts: Vec<MountConfig>,
    /// Attached services.
    #[serde(default)]
    pub services: EndpointServices,
    /// How long `stop` waits for in-flight requests before forcing
    /// connections closed.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}
