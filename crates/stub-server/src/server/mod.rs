//! HTTP server: routing, the per-request pipeline and bootstrap.
//!
//! - `router` - `:param` pattern matching on top of `matchit`
//! - `handler` - resolve, delay, dispatch; errors become error pages
//! - `server` - startup registration and the accept loop

mod handler;
mod router;
#[allow(clippy::module_inception)]
mod server;

pub use handler::StubService;
pub use router::{RouteMatch, StubRouter};
pub use server::{register, ServerOptions, StubServer, DEFAULT_PORT};
