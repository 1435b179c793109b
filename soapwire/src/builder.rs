//! Construction des enveloppes SOAP sortantes.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::binding::{Arg, MethodBinding};
use crate::errors::WireError;

/// Namespace de l'enveloppe SOAP 1.1.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// Préfixe fixe porté par l'élément de requête et par les discriminants
/// `xsi:type` une fois patchés.
pub(crate) const TYPE_PREFIX: &str = "ns2";

/// Construit l'enveloppe SOAP complète d'un appel.
///
/// Les arguments sont affectés positionnellement aux setters du conteneur de
/// requête ; en fournir moins que de setters est toléré, en fournir plus est
/// une erreur.
pub fn encode_request(
    binding: &MethodBinding,
    namespace: &str,
    args: Vec<Arg>,
) -> Result<Vec<u8>, WireError> {
    let entry = &binding.request;

    if args.len() > entry.setters.len() {
        return Err(WireError::TooManyArguments {
            method: binding.method.clone(),
            setters: entry.setters.len(),
            supplied: args.len(),
        });
    }

    let mut container = (entry.new)();
    for (setter, value) in entry.setters.iter().zip(args) {
        setter(container.as_mut(), value)?;
    }

    let root = format!("{TYPE_PREFIX}:{}", binding.method);
    let fragment = (entry.marshal)(container.as_ref(), &root)?;

    // Qualifie l'élément racine par le namespace cible du service.
    let fragment = fragment.replacen(
        &format!("<{root}"),
        &format!("<{root} xmlns:{TYPE_PREFIX}=\"{namespace}\""),
        1,
    );

    let document = write_envelope(&fragment)?;
    Ok(insert_type_prefix(&document).into_bytes())
}

fn write_envelope(fragment: &str) -> Result<String, quick_xml::Error> {
    let mut writer = Writer::new(Vec::new());

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut envelope = BytesStart::new("soap:Envelope");
    envelope.push_attribute(("xmlns:soap", SOAP_ENVELOPE_NS));
    writer.write_event(Event::Start(envelope))?;
    writer.write_event(Event::Start(BytesStart::new("soap:Body")))?;

    // Le fragment marshallé est déjà du XML : injecté tel quel, sans
    // ré-échappement.
    writer.write_event(Event::Text(BytesText::from_escaped(fragment)))?;

    writer.write_event(Event::End(BytesEnd::new("soap:Body")))?;
    writer.write_event(Event::End(BytesEnd::new("soap:Envelope")))?;

    Ok(String::from_utf8_lossy(&writer.into_inner()).into_owned())
}

/// Insère l'alias de préfixe `ns2` dans chaque discriminant `xsi:type` du
/// document. Idempotent seulement dans le sens encodage.
pub fn insert_type_prefix(document: &str) -> String {
    document.replace("xsi:type=\"", "xsi:type=\"ns2:")
}

/// Inverse exact de [`insert_type_prefix`], appliqué avant tout décodage.
pub fn strip_type_prefix(document: &str) -> String {
    document.replace("xsi:type=\"ns2:", "xsi:type=\"")
}
