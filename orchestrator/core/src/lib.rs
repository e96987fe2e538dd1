// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Command coordination and execution engine.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Deduplicate concurrent identical tool invocations, cache their
//!   output and report their lifecycle

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::*;
