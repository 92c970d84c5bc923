//! Correlation engine
//!
//! Request/response semantics on top of an unordered publish/subscribe
//! transport:
//! - [`CorrelationToken`] identifies one outstanding request
//! - [`ResponseEnvelope`] is the decoded form of an inbound response part
//! - `CorrelationRegistry` holds the state of every outstanding request
//! - `Dispatcher` is the single task routing inbound parts into the registry
//! - `RequestExecutor` registers, publishes and awaits completion

mod dispatcher;
mod envelope;
mod executor;
mod registry;
mod token;

pub(crate) use dispatcher::*;
pub use envelope::*;
pub use executor::Request;
pub use executor::Response;
pub use executor::ResponseMode;
pub(crate) use executor::RequestExecutor;
pub(crate) use registry::*;
pub use token::CorrelationToken;
pub(crate) use token::TokenGenerator;

#[cfg(test)]
mod executor_test;
