//! Test utilities for vasari_models tests.
//!
//! This module provides a scripted chat transport and response builders.

pub mod mock_transport;

#[allow(unused_imports)]
pub use mock_transport::{MockBehavior, MockResponse, MockTransport, chat_body};
