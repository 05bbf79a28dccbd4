// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod errors;
pub mod handlers;
pub mod server;

pub use errors::{ApiError, ErrorResponse};
pub use handlers::{ChatbotForm, ChatbotResponse, HealthResponse};
pub use server::{build_router, serve, ApiServer};
