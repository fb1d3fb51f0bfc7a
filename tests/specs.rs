//! Workspace-level end-to-end specs.
//!
//! Each spec drives the built `syd` binary with a real config file
//! and raw TCP exchanges.

#[path = "specs/prelude.rs"]
mod prelude;

#[path = "specs/server.rs"]
mod server;
