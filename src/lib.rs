//! Fedora workstation provisioning engine.
//!
//! A playbook lists steps in order. Set-based steps (packages, repositories,
//! fonts, language packages) read a desired set of identifiers, probe what
//! is already installed, and install only the difference. Dotfile modules
//! are bare git repositories checked out once into the home directory.
//! Running the same playbook twice changes nothing the second time.
//!
//! - **[`config`]**: parse and validate the TOML playbook
//! - **[`inventory`]**, **[`probe`]**, **[`delta`]**: desired sets, existing sets, their difference
//! - **[`tasks`]**: one task per step kind, wired to the run [`tasks::Context`]
//! - **[`dotfiles`]**: the bare-repository state machine
//! - **[`fetch`]**, **[`hash`]**, **[`exec`]**: HTTPS downloads, digests, external commands
//! - **[`commands`]**: subcommand orchestration (`run`, `dtf`, `hash`, `fetch`)
//!
//! Runs take no lock. Two concurrent runs against the same home directory
//! race on package managers and dotfile checkouts and must not be started.
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod delta;
pub mod dotfiles;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod hash;
pub mod inventory;
pub mod logging;
pub mod probe;
pub mod tasks;

#[cfg(test)]
mod test_support;
