// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Domain Layer
//!
//! Pure types and contracts for command coordination: fingerprints, records,
//! tool and event-sink interfaces, the storage contract and node configuration.

pub mod agent;
pub mod command;
pub mod events;
pub mod fingerprint;
pub mod node_config;
pub mod repository;
pub mod tool;
pub mod validation;
