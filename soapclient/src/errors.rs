use soapwire::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("HTTP exchange with {url} failed: {source}")]
    Transport { url: String, source: ureq::Error },

    #[error("SOAP fault: {0}")]
    Fault(String),

    #[error(transparent)]
    Declared(Box<dyn std::error::Error + Send + Sync>),

    #[error("Endpoint {0} is already bound to a different interface")]
    InterfaceMismatch(String),
}

impl ServiceError {
    /// Typed view of a declared SOAP fault, if this error is one.
    pub fn declared<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            ServiceError::Declared(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }
}
