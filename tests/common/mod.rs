//! Common test utilities for cityio-kpi.
//!
//! This module provides shared utilities for the integration tests.

#![allow(dead_code)]

pub mod assertions;
pub mod http_client;
pub mod mock_cityio;
pub mod test_data;
