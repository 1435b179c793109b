use thiserror::Error;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("No wire container registered under the name '{0}'")]
    UnresolvedContainer(String),

    #[error("Container '{0}' is not registered as a request container")]
    NotARequestContainer(String),

    #[error("Container '{0}' is not registered as a response container")]
    NotAResponseContainer(String),

    #[error("Method '{0}' is bound twice on the same interface")]
    DuplicateMethod(String),

    #[error("No binding resolved for method '{0}'")]
    UnknownMethod(String),

    #[error("Method '{method}' accepts at most {setters} argument(s), {supplied} supplied")]
    TooManyArguments {
        method: String,
        setters: usize,
        supplied: usize,
    },

    #[error("Argument value is not a {0}")]
    ArgumentType(&'static str),

    #[error("Wire container does not match its registered type {0}")]
    ContainerType(&'static str),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Failed to marshal request container: {0}")]
    Marshal(#[from] quick_xml::se::SeError),

    #[error("Failed to unmarshal response container: {0}")]
    Unmarshal(#[from] quick_xml::de::DeError),

    #[error("Unexpected end of document inside '{0}'")]
    Truncated(&'static str),

    #[error("SOAP fault detail contains no element")]
    EmptyFaultDetail,

    #[error("Declared fault '{name}' could not be constructed: {reason}")]
    FaultConstruction { name: String, reason: String },
}
