//! Analyse des enveloppes SOAP entrantes : réponses normales et faults.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::binding::MethodBinding;
use crate::builder::strip_type_prefix;
use crate::errors::WireError;
use crate::fault::{Decoded, FaultOutcome, SOAP_FAULT_PLACEHOLDER};

/// Décode une enveloppe de réponse.
///
/// Le chemin d'analyse est choisi par `fault`, jamais par le contenu : un
/// statut HTTP 200 est analysé comme réponse normale même si le corps a la
/// forme d'un fault.
pub fn decode_response(
    binding: &MethodBinding,
    content: &[u8],
    fault: bool,
) -> Result<Decoded, WireError> {
    let text = String::from_utf8_lossy(content);
    let document = strip_type_prefix(&text);

    if fault {
        parse_fault(binding, &document)
    } else {
        parse_body(binding, &document)
    }
}

fn reader_for(document: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(document);
    // Un élément auto-fermé produit la même paire Start/End qu'un élément
    // vide explicite.
    reader.config_mut().expand_empty_elements = true;
    reader
}

fn parse_body(binding: &MethodBinding, document: &str) -> Result<Decoded, WireError> {
    let mut reader = reader_for(document);

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).to_lowercase();
                if name != "body" {
                    continue;
                }

                // Seul le premier Body est consommé ; le reste du document
                // n'est pas lu.
                let inner = body_content(&mut reader, document)?;
                let container = (binding.response.unmarshal)(inner)?;

                let value = match &binding.response.accessor {
                    None => None,
                    Some(accessor) => match accessor(container)? {
                        Some(value) => Some(value),
                        None => binding.response.empty.as_ref().map(|empty| empty()),
                    },
                };

                return Ok(Decoded::Value(value));
            }
            Event::Eof => return Ok(Decoded::Value(None)),
            _ => {}
        }
    }
}

/// Délimite le contenu du Body courant et avance le lecteur jusqu'à sa
/// balise fermante.
fn body_content<'a>(
    reader: &mut Reader<&'a [u8]>,
    document: &'a str,
) -> Result<&'a str, WireError> {
    let start = reader.buffer_position() as usize;
    let mut depth = 1_usize;

    loop {
        let before = reader.buffer_position() as usize;
        match reader.read_event()? {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(&document[start..before]);
                }
            }
            Event::Eof => return Err(WireError::Truncated("Body")),
            _ => {}
        }
    }
}

fn parse_fault(binding: &MethodBinding, document: &str) -> Result<Decoded, WireError> {
    let mut reader = reader_for(document);
    let mut outcome: Option<FaultOutcome> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).to_lowercase();
                if name != "fault" {
                    continue;
                }

                let mut current_element: Option<String> = None;
                let mut fault_string: Option<String> = None;
                let mut ctor = None;

                loop {
                    match reader.read_event()? {
                        Event::Start(start) => {
                            let local =
                                String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                            let is_detail = local == "detail";
                            current_element = Some(local);

                            if is_detail {
                                // Seul le premier élément imbriqué dans
                                // detail sert de discriminant.
                                let discriminator = first_nested_element(&mut reader)?;
                                ctor = binding.faults.get(&discriminator);
                            }
                        }
                        Event::Text(text) => {
                            if current_element.as_deref() == Some("faultstring") {
                                // Dernière écriture gagnante si le texte
                                // arrive en plusieurs fragments.
                                fault_string = Some(
                                    text.decode()
                                        .map_err(quick_xml::Error::Encoding)?
                                        .into_owned(),
                                );
                            }
                        }
                        Event::End(end) => {
                            let name =
                                String::from_utf8_lossy(end.local_name().as_ref()).to_lowercase();
                            if name == "fault" {
                                // La fermeture du Fault met fin à l'analyse,
                                // même si des éléments restent ouverts.
                                break;
                            }
                            current_element = None;
                        }
                        Event::Eof => return Err(WireError::Truncated("Fault")),
                        _ => {}
                    }
                }

                match ctor {
                    Some(ctor) => {
                        let message = fault_string.unwrap_or_default();
                        return Ok(Decoded::Fault(FaultOutcome::Declared(ctor(message)?)));
                    }
                    None => {
                        outcome = Some(match fault_string {
                            Some(message) => FaultOutcome::Generic(message.trim().to_string()),
                            None => FaultOutcome::Generic(SOAP_FAULT_PLACEHOLDER.to_string()),
                        });
                    }
                }
            }
            Event::Eof => {
                return Ok(match outcome {
                    Some(fault) => Decoded::Fault(fault),
                    None => Decoded::Value(None),
                });
            }
            _ => {}
        }
    }
}

fn first_nested_element(reader: &mut Reader<&[u8]>) -> Result<String, WireError> {
    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                return Ok(String::from_utf8_lossy(start.local_name().as_ref()).into_owned());
            }
            Event::End(_) => return Err(WireError::EmptyFaultDetail),
            Event::Eof => return Err(WireError::Truncated("detail")),
            _ => {}
        }
    }
}
