//! Synchronous SOAP RPC client: typed service adapters over HTTP endpoints.
//!
//! An adapter type implements [`ServiceProxy`] for one service interface;
//! the [`ServiceRegistry`] binds it to a URL exactly once and hands back a
//! shared proxy. Each call blocks the calling thread for one POST/response
//! round trip; the wire mapping itself lives in `soapwire`.

pub mod endpoint;
pub mod errors;
pub mod registry;

mod trace;
mod transport;

pub use endpoint::{Endpoint, ServiceProxy};
pub use errors::ServiceError;
pub use registry::{ServiceRegistry, create_default};

// Re-exports so an adapter only has to depend on this crate.
pub use soapwire::{
    Arg, ContainerRegistry, FaultDetail, InterfaceSpec, MethodSpec, RequestShape, ResponseShape,
    arg, take,
};
