// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0
//! # `hivemind-swarm` - Agent Registry & Discovery Feed
//!
//! Shared knowledge state for agents working the same project: who is
//! active, and an append-only feed of what they have found.
//!
//! ## Crate Layout
//!
//! | Module | Layer | Contents |
//! |--------|-------|----------|
//! | [`domain`] | Domain | `AgentRegistration`, `Discovery` |
//! | [`application`] | Application | `SwarmService` trait, `AgentRegistry` |
//!
//! ## Key Concepts
//!
//! - **Registration**: one entry per `AgentId`, created when an agent starts
//!   and removed when it stops.
//! - **Discovery Feed**: per-project, append-only, ordered by a per-project
//!   sequence number. Readers always get a snapshot; entries already returned
//!   are never reordered.
//! - **Project reset**: when a scan concludes the whole project state is
//!   dropped in one operation. Nothing expires on its own.
//!
//! State is held in memory only.

pub mod application;
pub mod domain;

pub use application::{AgentRegistry, ProjectReset, SwarmService};
pub use domain::*;
