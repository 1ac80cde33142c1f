//! Local development HTTP stub server.
//!
//! Routes declared in a YAML/JSON table answer with local files, Rhai
//! handlers, or a proxied upstream, after a simulated delay. The table and
//! every stub file are read again on each request.

pub mod config;
pub mod error;
pub mod proxy;
pub mod response;
pub mod scripting;
pub mod server;
pub mod stub;

pub use error::StubError;
pub use server::{ServerOptions, StubServer};
