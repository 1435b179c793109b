//! Process-wide endpoint registry: one descriptor per interface, one
//! endpoint (and proxy) per exact URL, constructed exactly once.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use once_cell::sync::Lazy;
use soapwire::ServiceDescriptor;
use tracing::debug;

use crate::endpoint::{Endpoint, ServiceProxy};
use crate::errors::ServiceError;
use crate::trace::XmlTracer;
use crate::transport::{DEFAULT_CONNECT_TIMEOUT, HttpTransport};

struct CachedEndpoint {
    interface: TypeId,
    proxy: Arc<dyn Any + Send + Sync>,
}

#[derive(Default)]
struct RegistryInner {
    descriptors: HashMap<TypeId, Arc<ServiceDescriptor>>,
    endpoints: HashMap<String, CachedEndpoint>,
}

/// Registry of live service endpoints. All mutation runs under one lock;
/// cached descriptors and endpoints are immutable and shared.
pub struct ServiceRegistry {
    transport: Arc<HttpTransport>,
    tracer: Arc<XmlTracer>,
    inner: Mutex<RegistryInner>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(HttpTransport::new(DEFAULT_CONNECT_TIMEOUT)),
            tracer: Arc::new(XmlTracer::start()),
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Process-wide default registry.
    pub fn global() -> &'static ServiceRegistry {
        static GLOBAL: Lazy<ServiceRegistry> = Lazy::new(ServiceRegistry::new);
        &GLOBAL
    }

    /// Connect timeout for subsequent calls. In-flight calls keep the
    /// transport configuration they started with.
    pub fn set_connect_timeout(&self, timeout: Duration) {
        self.transport.set_connect_timeout(timeout);
    }

    /// Returns the proxy bound to `url`, constructing descriptor, endpoint
    /// and proxy on first use. The namespace only matters the first time an
    /// interface is seen; later calls silently reuse the first one.
    pub fn get_or_create<P: ServiceProxy>(
        &self,
        url: &str,
        namespace: &str,
    ) -> Result<Arc<P>, ServiceError> {
        let key = url.strip_suffix("?wsdl").unwrap_or(url).to_string();
        let mut inner = self.inner.lock().unwrap();

        if let Some(cached) = inner.endpoints.get(&key) {
            if cached.interface != TypeId::of::<P>() {
                return Err(ServiceError::InterfaceMismatch(key));
            }

            let proxy = Arc::clone(&cached.proxy)
                .downcast::<P>()
                .map_err(|_| ServiceError::InterfaceMismatch(key.clone()))?;

            debug!("Re-using service resources: {}", key);
            return Ok(proxy);
        }

        let descriptor = Self::descriptor_for::<P>(&mut inner, namespace)?;

        debug!("Initializing service resources: {}", key);
        let endpoint = Arc::new(Endpoint::new(
            &key,
            descriptor,
            Arc::clone(&self.transport),
            Arc::clone(&self.tracer),
        ));

        let proxy = Arc::new(P::bind(endpoint));
        let erased: Arc<dyn Any + Send + Sync> = proxy.clone();
        inner.endpoints.insert(
            key,
            CachedEndpoint {
                interface: TypeId::of::<P>(),
                proxy: erased,
            },
        );

        Ok(proxy)
    }

    /// Pre-resolves an interface descriptor without binding an endpoint.
    pub fn init_interface<P: ServiceProxy>(&self, namespace: &str) -> Result<(), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        Self::descriptor_for::<P>(&mut inner, namespace).map(|_| ())
    }

    fn descriptor_for<P: ServiceProxy>(
        inner: &mut RegistryInner,
        namespace: &str,
    ) -> Result<Arc<ServiceDescriptor>, ServiceError> {
        if let Some(descriptor) = inner.descriptors.get(&TypeId::of::<P>()) {
            return Ok(Arc::clone(descriptor));
        }

        let spec = P::interface();
        debug!("Initializing service type resources: {}", spec.name());

        let descriptor = Arc::new(ServiceDescriptor::resolve(spec, namespace)?);
        inner
            .descriptors
            .insert(TypeId::of::<P>(), Arc::clone(&descriptor));
        Ok(descriptor)
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience over the global registry.
pub fn create_default<P: ServiceProxy>(url: &str, namespace: &str) -> Result<Arc<P>, ServiceError> {
    ServiceRegistry::global().get_or_create::<P>(url, namespace)
}
