/*
 * This module talks to devices.
 * It knows how to open a session, authenticate, and walk a subtree,
 * but not what any of the walked tables mean. That lives in `neighbors`.
 */

pub mod core;
pub mod credential;
pub mod path;
pub mod snmp;
pub mod walk;

#[cfg(test)]
pub(crate) mod mock;
