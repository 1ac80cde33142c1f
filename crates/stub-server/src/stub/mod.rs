//! Request resolution engine: route lookup, latency, and dispatch.
//!
//! Each request runs [`RouteResolver::resolve`], then
//! [`DelaySimulator::delay`], then [`Dispatcher::dispatch`].

mod delay;
mod dispatcher;
mod request;
mod resolver;
mod resource;
mod status;

pub use delay::DelaySimulator;
pub use dispatcher::{is_url, Dispatcher};
pub use request::{parse_form, ParsedBody, StubRequest};
pub use resolver::{Resolution, RouteResolver};
pub use resource::{content_type_for, load_resource, Payload, Resource};
pub use status::infer_status;
