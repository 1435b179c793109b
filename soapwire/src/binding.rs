//! Table d'enregistrement des conteneurs wire et résolution des bindings.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::WireError;
use crate::fault::{DeclaredFault, FaultCtor};

/// Valeur dynamique échangée entre un adaptateur de service et le moteur wire.
pub type Arg = Box<dyn Any + Send>;

/// Emballe une valeur native dans un [`Arg`].
pub fn arg<T: Any + Send>(value: T) -> Arg {
    Box::new(value)
}

/// Récupère la valeur native portée par un [`Arg`].
pub fn take<T: Any>(value: Arg) -> Result<T, WireError> {
    value
        .downcast::<T>()
        .map(|boxed| *boxed)
        .map_err(|_| WireError::ArgumentType(type_name::<T>()))
}

type NewFn = Box<dyn Fn() -> Box<dyn Any + Send> + Send + Sync>;
type SetterFn = Box<dyn Fn(&mut (dyn Any + Send), Arg) -> Result<(), WireError> + Send + Sync>;
type MarshalFn = Box<dyn Fn(&(dyn Any + Send), &str) -> Result<String, WireError> + Send + Sync>;
type UnmarshalFn = Box<dyn Fn(&str) -> Result<Box<dyn Any + Send>, WireError> + Send + Sync>;
type AccessorFn = Box<dyn Fn(Box<dyn Any + Send>) -> Result<Option<Arg>, WireError> + Send + Sync>;
type EmptyFn = Box<dyn Fn() -> Arg + Send + Sync>;

pub(crate) struct RequestEntry {
    pub(crate) type_name: &'static str,
    pub(crate) new: NewFn,
    pub(crate) setters: Vec<SetterFn>,
    pub(crate) marshal: MarshalFn,
}

pub(crate) struct ResponseEntry {
    pub(crate) type_name: &'static str,
    pub(crate) unmarshal: UnmarshalFn,
    pub(crate) accessor: Option<AccessorFn>,
    pub(crate) empty: Option<EmptyFn>,
}

enum ContainerEntry {
    Request(Arc<RequestEntry>),
    Response(Arc<ResponseEntry>),
}

/// Forme d'un conteneur de requête : constructeur par défaut plus setters
/// positionnels (le setter `i` reçoit l'argument `i` de la méthode).
pub struct RequestShape<T> {
    setters: Vec<Box<dyn Fn(&mut T, Arg) -> Result<(), WireError> + Send + Sync>>,
}

impl<T> RequestShape<T>
where
    T: Default + Serialize + Any + Send,
{
    pub fn new() -> Self {
        Self {
            setters: Vec::new(),
        }
    }

    /// Ajoute le setter du champ suivant, dans l'ordre des paramètres.
    pub fn setter(
        mut self,
        set: impl Fn(&mut T, Arg) -> Result<(), WireError> + Send + Sync + 'static,
    ) -> Self {
        self.setters.push(Box::new(set));
        self
    }
}

impl<T> Default for RequestShape<T>
where
    T: Default + Serialize + Any + Send,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Forme d'un conteneur de réponse : accesseur de la valeur de retour,
/// absent pour une méthode sans retour.
pub struct ResponseShape<T> {
    accessor: Option<Box<dyn Fn(T) -> Option<Arg> + Send + Sync>>,
    empty: Option<EmptyFn>,
}

impl<T> ResponseShape<T>
where
    T: DeserializeOwned + Any + Send,
{
    /// Conteneur sans valeur de retour.
    pub fn new() -> Self {
        Self {
            accessor: None,
            empty: None,
        }
    }

    /// Accesseur de la valeur de retour logique.
    pub fn returns<R: Any + Send>(
        mut self,
        get: impl Fn(T) -> Option<R> + Send + Sync + 'static,
    ) -> Self {
        self.accessor = Some(Box::new(move |container| {
            get(container).map(|value| Box::new(value) as Arg)
        }));
        self.empty = None;
        self
    }

    /// Accesseur d'une valeur de retour de forme collection : une valeur
    /// absente est remplacée par la collection vide canonique du type déclaré,
    /// jamais par une absence de valeur.
    pub fn returns_collection<R: Any + Send + Default>(
        mut self,
        get: impl Fn(T) -> Option<R> + Send + Sync + 'static,
    ) -> Self {
        self.accessor = Some(Box::new(move |container| {
            get(container).map(|value| Box::new(value) as Arg)
        }));
        self.empty = Some(Box::new(|| Box::new(R::default()) as Arg));
        self
    }
}

impl<T> Default for ResponseShape<T>
where
    T: DeserializeOwned + Any + Send,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Table des conteneurs wire d'une interface, indexée par nom de conteneur.
///
/// La résolution d'un binding y cherche `PremièreMajuscule(méthode)` et
/// `PremièreMajuscule(méthode)Response`.
pub struct ContainerRegistry {
    entries: HashMap<String, ContainerEntry>,
}

impl ContainerRegistry {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Enregistre un conteneur de requête sous son nom wire.
    pub fn request<T>(&mut self, name: impl Into<String>, shape: RequestShape<T>) -> &mut Self
    where
        T: Default + Serialize + Any + Send + 'static,
    {
        let setters = shape
            .setters
            .into_iter()
            .map(|set| {
                Box::new(move |container: &mut (dyn Any + Send), value: Arg| {
                    let typed = container
                        .downcast_mut::<T>()
                        .ok_or(WireError::ContainerType(type_name::<T>()))?;
                    set(typed, value)
                }) as SetterFn
            })
            .collect();

        let entry = RequestEntry {
            type_name: type_name::<T>(),
            new: Box::new(|| Box::new(T::default()) as Box<dyn Any + Send>),
            setters,
            marshal: Box::new(|container, root| {
                let typed = container
                    .downcast_ref::<T>()
                    .ok_or(WireError::ContainerType(type_name::<T>()))?;
                Ok(quick_xml::se::to_string_with_root(root, typed)?)
            }),
        };

        self.entries
            .insert(name.into(), ContainerEntry::Request(Arc::new(entry)));
        self
    }

    /// Enregistre un conteneur de réponse sous son nom wire.
    pub fn response<T>(&mut self, name: impl Into<String>, shape: ResponseShape<T>) -> &mut Self
    where
        T: DeserializeOwned + Any + Send + 'static,
    {
        let entry = ResponseEntry {
            type_name: type_name::<T>(),
            unmarshal: Box::new(|xml| {
                let typed: T = quick_xml::de::from_str(xml)?;
                Ok(Box::new(typed) as Box<dyn Any + Send>)
            }),
            accessor: shape.accessor.map(|get| {
                Box::new(move |container: Box<dyn Any + Send>| {
                    let typed = container
                        .downcast::<T>()
                        .map_err(|_| WireError::ContainerType(type_name::<T>()))?;
                    Ok(get(*typed))
                }) as AccessorFn
            }),
            empty: shape.empty,
        };

        self.entries
            .insert(name.into(), ContainerEntry::Response(Arc::new(entry)));
        self
    }
}

impl Default for ContainerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Erreur applicative déclarée sur une méthode, adressée par son nom simple
/// dans le `detail` d'un fault SOAP.
pub trait FaultDetail: std::error::Error + Send + Sync + Sized + 'static {
    /// Construit l'erreur à partir du message du fault (`faultstring`).
    fn from_message(message: String) -> Self;
}

/// Déclaration d'une méthode wire : nom et table des faults déclarés.
pub struct MethodSpec {
    name: String,
    faults: Vec<(String, FaultCtor)>,
}

impl MethodSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            faults: Vec::new(),
        }
    }

    /// Déclare un type d'erreur applicative pour cette méthode. Le
    /// discriminant est le nom simple du type.
    pub fn fault<E: FaultDetail>(self) -> Self {
        self.fault_with(simple_type_name::<E>(), |message| {
            Ok(Box::new(E::from_message(message)) as DeclaredFault)
        })
    }

    /// Variante bas niveau : discriminant et constructeur explicites. Le
    /// constructeur peut échouer ; cet échec est une erreur de construction
    /// distincte, jamais rétrogradée en fault générique.
    pub fn fault_with(
        mut self,
        name: impl Into<String>,
        ctor: impl Fn(String) -> Result<DeclaredFault, WireError> + Send + Sync + 'static,
    ) -> Self {
        self.faults.push((name.into(), Box::new(ctor)));
        self
    }
}

/// Spécification d'une interface de service : identité, conteneurs, méthodes.
pub struct InterfaceSpec {
    name: &'static str,
    containers: ContainerRegistry,
    methods: Vec<MethodSpec>,
}

impl InterfaceSpec {
    pub fn new(name: &'static str, containers: ContainerRegistry) -> Self {
        Self {
            name,
            containers,
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, spec: MethodSpec) -> Self {
        self.methods.push(spec);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Binding résolu d'une méthode : conteneurs wire et table des faults.
/// Résolu exactement une fois, immuable ensuite.
pub struct MethodBinding {
    pub(crate) method: String,
    pub(crate) request: Arc<RequestEntry>,
    pub(crate) response: Arc<ResponseEntry>,
    pub(crate) faults: HashMap<String, FaultCtor>,
}

impl MethodBinding {
    pub fn method(&self) -> &str {
        &self.method
    }
}

/// Ensemble des bindings d'une interface, figé à la construction.
pub struct ServiceDescriptor {
    interface: &'static str,
    namespace: String,
    bindings: HashMap<String, MethodBinding>,
}

impl ServiceDescriptor {
    /// Résout tous les bindings d'une interface. Un conteneur manquant ou de
    /// la mauvaise forme fait échouer la construction, jamais un appel.
    pub fn resolve(spec: InterfaceSpec, namespace: impl Into<String>) -> Result<Self, WireError> {
        let namespace = namespace.into();
        let mut bindings = HashMap::new();

        for method in spec.methods {
            let request_name = container_name(&method.name);
            let response_name = format!("{request_name}Response");

            let request = match spec.containers.entries.get(&request_name) {
                Some(ContainerEntry::Request(entry)) => Arc::clone(entry),
                Some(ContainerEntry::Response(_)) => {
                    return Err(WireError::NotARequestContainer(request_name));
                }
                None => return Err(WireError::UnresolvedContainer(request_name)),
            };

            let response = match spec.containers.entries.get(&response_name) {
                Some(ContainerEntry::Response(entry)) => Arc::clone(entry),
                Some(ContainerEntry::Request(_)) => {
                    return Err(WireError::NotAResponseContainer(response_name));
                }
                None => return Err(WireError::UnresolvedContainer(response_name)),
            };

            debug!(
                "Resolved binding {}::{} -> ({}, {})",
                spec.name, method.name, request.type_name, response.type_name
            );

            let name = method.name.clone();
            let binding = MethodBinding {
                method: method.name,
                request,
                response,
                faults: method.faults.into_iter().collect(),
            };

            if bindings.insert(name.clone(), binding).is_some() {
                return Err(WireError::DuplicateMethod(name));
            }
        }

        Ok(Self {
            interface: spec.name,
            namespace,
            bindings,
        })
    }

    pub fn binding(&self, method: &str) -> Result<&MethodBinding, WireError> {
        self.bindings
            .get(method)
            .ok_or_else(|| WireError::UnknownMethod(method.to_string()))
    }

    pub fn interface(&self) -> &'static str {
        self.interface
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Dérive le nom de conteneur d'un nom de méthode : première lettre en
/// majuscule, le reste inchangé.
pub(crate) fn container_name(method: &str) -> String {
    let mut chars = method.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn simple_type_name<T>() -> String {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full).to_string()
}
