//! Control API and proxy front end.
//!
//! One listener serves both:
//! - `POST /{controlPrefix}/{op}`: namespace, rule and call-history operations
//! - `GET /health`: liveness
//! - `/{namespaceId}/{path...}`: calls answered from the namespace's rules
//!
//! The control prefix defaults to `__mockspace__`.

mod handlers;
mod router;
mod server;
pub(crate) mod types;

pub use server::AdminApiServer;
