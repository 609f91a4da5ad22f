//! Infrastructure layer for the client application.
//!
//! Contains the adapters the application layer is wired to at startup.
//!
//! **Dependency rule**: this layer may depend on `application` and `vail_core`,
//! but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`hardware`** – implementations of the `Hardware` trait: the host pin
//!   bank with its tone driver, and a scripted mock for tests.
//!
//! - **`network`** – TCP connect and the upgrade handshake that turns the
//!   socket into a frame stream to the relay.
//!
//! - **`storage`** – the TOML configuration file.

pub mod hardware;
pub mod network;
pub mod storage;
