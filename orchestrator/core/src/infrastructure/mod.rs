// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod db;
pub mod event_bus;
pub mod repositories;
pub mod tool_registry;

pub use event_bus::EventBus;
pub use tool_registry::ToolRegistry;
