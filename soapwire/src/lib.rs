//! # soapwire - Moteur de correspondance wire SOAP
//!
//! Transformation pure entre (méthode, arguments) et octets SOAP, et entre
//! octets SOAP et (valeur | erreur). Aucune E/S ici : le transport HTTP et
//! les adaptateurs de service vivent dans `soapclient`.
//!
//! ## Fonctionnalités
//!
//! - ✅ Résolution des bindings par convention de nommage
//! - ✅ Construction d'enveloppes SOAP 1.1 en flux
//! - ✅ Analyse des réponses et des faults (machine à états)
//! - ✅ Reconstruction d'erreurs applicatives typées
//!
//! ## Architecture
//!
//! - [`ContainerRegistry`] : table des conteneurs wire d'une interface
//! - [`ServiceDescriptor`] : bindings résolus, une fois pour toutes
//! - [`encode_request`] / [`decode_response`] : les deux sens du fil
//!
//! ## Example
//!
//! ```ignore
//! use soapwire::{ContainerRegistry, InterfaceSpec, MethodSpec, RequestShape,
//!     ResponseShape, ServiceDescriptor, arg, take};
//!
//! let mut containers = ContainerRegistry::new();
//! containers.request("Reserve", RequestShape::<Reserve>::new()
//!     .setter(|c, v| { c.item = Some(take(v)?); Ok(()) }));
//! containers.response("ReserveResponse",
//!     ResponseShape::<ReserveResponse>::new().returns(|c| c.confirmation));
//!
//! let spec = InterfaceSpec::new("InventoryService", containers)
//!     .method(MethodSpec::new("reserve"));
//! let descriptor = ServiceDescriptor::resolve(spec, "urn:example:inventory")?;
//!
//! let binding = descriptor.binding("reserve")?;
//! let bytes = soapwire::encode_request(binding, descriptor.namespace(),
//!     vec![arg("widget".to_string())])?;
//! ```

pub mod binding;
pub mod builder;
pub mod errors;
pub mod fault;
pub mod parser;

pub use binding::{
    Arg, ContainerRegistry, FaultDetail, InterfaceSpec, MethodBinding, MethodSpec, RequestShape,
    ResponseShape, ServiceDescriptor, arg, take,
};
pub use builder::{SOAP_ENVELOPE_NS, encode_request, insert_type_prefix, strip_type_prefix};
pub use errors::WireError;
pub use fault::{Decoded, DeclaredFault, FaultOutcome, SOAP_FAULT_PLACEHOLDER};
pub use parser::decode_response;
