// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! Hivemind CLI library - exposes testable components
//!
//! # Architecture
//!
//! - **Layer:** Interface / Presentation Layer
//! - **Purpose:** Operator commands and in-process wiring of the coordinator services

pub mod commands;
pub mod embedded;
