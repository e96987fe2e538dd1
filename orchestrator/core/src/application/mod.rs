// Copyright (c) 2026 Hivemind Contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod coordination;
pub mod execution_gateway;
pub mod repository_factory;
pub mod result_store;

pub use coordination::{CoordinationError, CoordinationTable};
pub use execution_gateway::{ExecutionGateway, GatewayError};
pub use result_store::ResultStore;
