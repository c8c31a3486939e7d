//! # System Interaction Layer
//!
//! Boundary between the launcher and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns the child, wires its standard streams and waits for it.
//!   Handles the shell/no-shell split and durable file output.
//! - **`service`**: the reference count and shutdown hooks of the shared router service.
//! - **`settings_store`**: persists generated settings documents for `--settings`.

pub mod executor;
pub mod service;
pub mod settings_store;
