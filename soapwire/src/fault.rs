//! Issue d'un décodage : valeur normale ou fault SOAP résolu.

use std::error::Error;

use crate::binding::Arg;
use crate::errors::WireError;

/// Message par défaut quand un fault ne porte aucun `faultstring`.
pub const SOAP_FAULT_PLACEHOLDER: &str = "SOAP Fault received";

/// Erreur applicative typée reconstruite depuis le detail d'un fault.
pub type DeclaredFault = Box<dyn Error + Send + Sync>;

/// Constructeur d'une erreur déclarée à partir du message du fault.
pub(crate) type FaultCtor = Box<dyn Fn(String) -> Result<DeclaredFault, WireError> + Send + Sync>;

/// Résultat d'un décodage d'enveloppe.
pub enum Decoded {
    /// Réponse normale : valeur de retour, ou `None` pour une méthode sans retour.
    Value(Option<Arg>),

    /// Fault SOAP résolu, à convertir en erreur par l'appelant.
    Fault(FaultOutcome),
}

/// Fault résolu : type déclaré reconnu, sinon message générique.
pub enum FaultOutcome {
    Declared(DeclaredFault),
    Generic(String),
}
