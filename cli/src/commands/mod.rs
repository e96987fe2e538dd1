// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Hivemind CLI

pub mod cache;
pub mod config;
pub mod fingerprint;

pub use self::cache::CacheCommand;
pub use self::config::ConfigCommand;
pub use self::fingerprint::FingerprintCommand;
