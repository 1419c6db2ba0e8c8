//! Backend collaborators for the workflow core
//!
//! This module provides:
//! - Narrow async traits for each remote concern (directory, scanner, ...)
//! - Request payloads for the mutating ticket and configuration calls
//! - An HTTP implementation and an in-memory implementation for tests

pub mod backend;
pub mod error;
pub mod http;
pub mod memory;
pub mod payload;

pub use backend::{
    Collaborators, ConfigurationOperations, CustomerMatcher, Directory, NodeScanner,
    TicketOperations,
};
pub use error::RemoteError;
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
pub use payload::{
    BatchConfigurationRequest, BatchDevice, BridgeConfigurationRequest, CloseTicketPayload,
    ConfigurationPayload, ConfigurationRequest, CreateTicketPayload, CustomerInfo,
    ForwardTicketPayload, ProcessTicketPayload, TicketOperation, TicketPayload,
};
