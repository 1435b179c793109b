//! Invocation dispatcher: one live (interface, URL) binding and its
//! synchronous wire path.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use soapwire::{Arg, Decoded, FaultOutcome, InterfaceSpec, ServiceDescriptor};
use tracing::debug;

use crate::errors::ServiceError;
use crate::trace::{Direction, XmlTracer};
use crate::transport::HttpTransport;

/// Capability contract of a service adapter: the typed face of one
/// (interface, endpoint) pair. One adapter type per service interface,
/// hand-written or generated, each method delegating to
/// [`Endpoint::invoke`].
pub trait ServiceProxy: Any + Send + Sync + Sized {
    /// Interface identity and wire registration table. Built once per
    /// process, on first use of the interface.
    fn interface() -> InterfaceSpec;

    /// Wraps a live endpoint into the typed adapter.
    fn bind(endpoint: Arc<Endpoint>) -> Self;
}

/// A service interface bound to a URL. Immutable once constructed; safe to
/// share across calling threads.
pub struct Endpoint {
    url: String,
    descriptor: Arc<ServiceDescriptor>,
    transport: Arc<HttpTransport>,
    tracer: Arc<XmlTracer>,
}

impl Endpoint {
    pub(crate) fn new(
        url: &str,
        descriptor: Arc<ServiceDescriptor>,
        transport: Arc<HttpTransport>,
        tracer: Arc<XmlTracer>,
    ) -> Self {
        let url = match url.strip_suffix("?wsdl") {
            Some(stripped) => {
                debug!("Excluding ?wsdl parameter from url: {} -> {}", url, stripped);
                stripped.to_string()
            }
            None => url.to_string(),
        };

        Self {
            url,
            descriptor,
            transport,
            tracer,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }

    /// Performs one synchronous SOAP call.
    ///
    /// Returns the method's logical return value (`None` for a method
    /// without one) or exactly one [`ServiceError`]. The HTTP connection
    /// is returned to the agent's pool on every exit path.
    pub fn invoke(&self, method: &str, args: Vec<Arg>) -> Result<Option<Arg>, ServiceError> {
        // Describe-self never reaches the network.
        if method == "to_string" && args.is_empty() {
            return Ok(Some(soapwire::arg(self.url.clone())));
        }

        let binding = self.descriptor.binding(method)?;
        let request = soapwire::encode_request(binding, self.descriptor.namespace(), args)?;
        self.tracer.enqueue(Direction::Outbound, &self.url, &request);

        let agent = self.transport.agent();
        let mut response = agent
            .post(&self.url)
            .header("Content-Type", "text/xml")
            .send(&request[..])
            .map_err(|source| ServiceError::Transport {
                url: self.url.clone(),
                source,
            })?;

        // Any status other than 200 selects the fault parse path,
        // independently of the payload shape.
        let fault = response.status().as_u16() != 200;

        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|source| ServiceError::Transport {
                url: self.url.clone(),
                source,
            })?;
        self.tracer.enqueue(Direction::Inbound, &self.url, body.as_bytes());

        match soapwire::decode_response(binding, body.as_bytes(), fault)? {
            Decoded::Value(value) => Ok(value),
            Decoded::Fault(FaultOutcome::Declared(error)) => Err(ServiceError::Declared(error)),
            Decoded::Fault(FaultOutcome::Generic(message)) => Err(ServiceError::Fault(message)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
