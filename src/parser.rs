//! SOAP envelope decoding into typed operation requests.
//!
//! Uses quick-xml which is safe against XXE by default (doesn't expand entities).

use crate::config::SoapVersion;
use crate::error::ServiceError;
use crate::model::{NewPerson, Operation};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use std::collections::HashMap;

/// SOAP namespace URIs.
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Operation element names recognized inside the SOAP Body.
pub const OPERATIONS: [&str; 6] = [
    "AddPerson",
    "DeletePerson",
    "UpdatePerson",
    "GetPerson",
    "GetAllPersons",
    "SearchPerson",
];

// Element depths: Envelope = 1, Body = 2, operation = 3, operation field = 4.
const ENVELOPE_DEPTH: u32 = 1;
const BODY_DEPTH: u32 = 2;
const OPERATION_DEPTH: u32 = 3;
const FIELD_DEPTH: u32 = 4;

/// A decoded request: envelope version plus the single operation it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapRequest {
    /// Detected SOAP version
    pub version: SoapVersion,
    pub operation: Operation,
}

/// A direct child of the SOAP Body with its simple-content children.
#[derive(Debug, Default)]
struct BodyElement {
    name: String,
    fields: HashMap<String, String>,
}

impl BodyElement {
    fn text(&self, field: &str) -> String {
        self.fields.get(field).cloned().unwrap_or_default()
    }

    fn integer(&self, field: &str) -> Result<i32, ServiceError> {
        let raw = self.fields.get(field).map(|v| v.trim()).unwrap_or("");
        if raw.is_empty() {
            return Ok(0);
        }
        raw.parse().map_err(|_| {
            ServiceError::MalformedRequest(format!(
                "Field '{}' of {} is not an integer: '{}'",
                field, self.name, raw
            ))
        })
    }

    fn new_person(&self) -> Result<NewPerson, ServiceError> {
        Ok(NewPerson {
            name: self.text("Name"),
            surname: self.text("Surname"),
            age: self.integer("Age")?,
            email: self.text("Email"),
            telephone: self.text("Telephone"),
        })
    }
}

/// Parse raw bytes as a SOAP request carrying exactly one known operation.
pub fn parse_soap_request(data: &[u8]) -> Result<SoapRequest, ServiceError> {
    let xml_str = std::str::from_utf8(data)
        .map_err(|e| ServiceError::MalformedRequest(format!("Invalid UTF-8: {}", e)))?;

    check_xxe_patterns(xml_str)?;

    let (version, body) = read_envelope(xml_str)?;
    let operation = select_operation(body)?;

    Ok(SoapRequest { version, operation })
}

/// Walk the document, collecting the envelope version and Body children.
fn read_envelope(xml_str: &str) -> Result<(SoapVersion, Vec<BodyElement>), ServiceError> {
    let mut reader = NsReader::from_str(xml_str);
    reader.config_mut().trim_text(true);

    let mut version: Option<SoapVersion> = None;
    let mut body: Vec<BodyElement> = Vec::new();
    let mut depth = 0u32;
    let mut in_body = false;
    let mut current_field: Option<String> = None;

    let mut buf = Vec::new();

    loop {
        buf.clear();
        let (ns, event) = reader.read_resolved_event_into(&mut buf).map_err(|e| {
            ServiceError::MalformedRequest(format!("XML parse error: {}", e))
        })?;

        match event {
            Event::Start(ref e) => {
                depth += 1;
                open_element(
                    e,
                    &ns,
                    depth,
                    &mut version,
                    &mut in_body,
                    &mut body,
                    &mut current_field,
                )?;
            }

            Event::Empty(ref e) => {
                // Self-closing tags like <GetAllPersons/> open and close at once
                open_element(
                    e,
                    &ns,
                    depth + 1,
                    &mut version,
                    &mut in_body,
                    &mut body,
                    &mut current_field,
                )?;
                close_element(depth + 1, &mut in_body, &mut current_field);
            }

            Event::End(_) => {
                close_element(depth, &mut in_body, &mut current_field);
                depth = depth.saturating_sub(1);
            }

            Event::Text(ref e) => {
                if depth == FIELD_DEPTH {
                    let text = e.unescape().map_err(|e| {
                        ServiceError::MalformedRequest(format!("XML parse error: {}", e))
                    })?;
                    append_field_text(&mut body, current_field.as_deref(), &text);
                }
            }

            Event::CData(ref e) => {
                if depth == FIELD_DEPTH {
                    append_field_text(
                        &mut body,
                        current_field.as_deref(),
                        &String::from_utf8_lossy(e),
                    );
                }
            }

            Event::DocType(_) => {
                return Err(ServiceError::MalformedRequest(
                    "DOCTYPE declarations are not allowed".to_string(),
                ));
            }

            Event::Eof => break,

            _ => {}
        }
    }

    let version = version.ok_or_else(|| {
        ServiceError::MalformedRequest(
            "No valid SOAP Envelope found with recognized namespace".to_string(),
        )
    })?;

    Ok((version, body))
}

fn open_element(
    e: &BytesStart,
    ns: &ResolveResult,
    depth: u32,
    version: &mut Option<SoapVersion>,
    in_body: &mut bool,
    body: &mut Vec<BodyElement>,
    current_field: &mut Option<String>,
) -> Result<(), ServiceError> {
    let local_name = local_name_str(e);

    match depth {
        ENVELOPE_DEPTH => {
            if local_name != "Envelope" {
                return Err(ServiceError::MalformedRequest(format!(
                    "Root element '{}' is not a SOAP Envelope",
                    local_name
                )));
            }
            *version = Some(envelope_version(ns).ok_or_else(|| {
                ServiceError::MalformedRequest(
                    "SOAP Envelope has an unrecognized namespace".to_string(),
                )
            })?);
        }
        BODY_DEPTH => {
            if local_name == "Body" {
                *in_body = true;
            }
        }
        OPERATION_DEPTH if *in_body => {
            body.push(BodyElement {
                name: local_name,
                fields: HashMap::new(),
            });
        }
        FIELD_DEPTH if *in_body => {
            if let Some(element) = body.last_mut() {
                // Repeated fields: last one wins
                element.fields.insert(local_name.clone(), String::new());
            }
            *current_field = Some(local_name);
        }
        _ => {}
    }

    Ok(())
}

fn close_element(depth: u32, in_body: &mut bool, current_field: &mut Option<String>) {
    match depth {
        BODY_DEPTH => *in_body = false,
        FIELD_DEPTH => *current_field = None,
        _ => {}
    }
}

fn append_field_text(body: &mut [BodyElement], field: Option<&str>, text: &str) {
    if let (Some(element), Some(field)) = (body.last_mut(), field) {
        if let Some(value) = element.fields.get_mut(field) {
            value.push_str(text);
        }
    }
}

fn envelope_version(ns: &ResolveResult) -> Option<SoapVersion> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) if *uri == SOAP_12_NS.as_bytes() => {
            Some(SoapVersion::Soap12)
        }
        ResolveResult::Bound(Namespace(uri)) if *uri == SOAP_11_NS.as_bytes() => {
            Some(SoapVersion::Soap11)
        }
        _ => None,
    }
}

/// Pick the single known operation out of the Body children.
fn select_operation(body: Vec<BodyElement>) -> Result<Operation, ServiceError> {
    let first_name = body.first().map(|el| el.name.clone());

    let mut known: Vec<BodyElement> = body
        .into_iter()
        .filter(|el| OPERATIONS.contains(&el.name.as_str()))
        .collect();

    if known.len() > 1 {
        let names: Vec<&str> = known.iter().map(|el| el.name.as_str()).collect();
        return Err(ServiceError::MalformedRequest(format!(
            "Body carries more than one operation: {}",
            names.join(", ")
        )));
    }

    let element = known.pop().ok_or_else(|| {
        ServiceError::UnsupportedOperation(
            first_name.unwrap_or_else(|| "empty SOAP Body".to_string()),
        )
    })?;

    build_operation(&element)
}

fn build_operation(element: &BodyElement) -> Result<Operation, ServiceError> {
    let operation = match element.name.as_str() {
        "AddPerson" => Operation::AddPerson(element.new_person()?),
        "DeletePerson" => Operation::DeletePerson {
            id: element.integer("ID")?,
        },
        "UpdatePerson" => Operation::UpdatePerson {
            id: element.integer("ID")?,
            person: element.new_person()?,
        },
        "GetPerson" => Operation::GetPerson {
            id: element.integer("ID")?,
        },
        "GetAllPersons" => Operation::GetAllPersons,
        "SearchPerson" => Operation::SearchPerson {
            query: element.text("Query"),
        },
        other => return Err(ServiceError::UnsupportedOperation(other.to_string())),
    };
    Ok(operation)
}

/// Reject DTD and entity declarations before parsing.
fn check_xxe_patterns(xml: &str) -> Result<(), ServiceError> {
    let upper = xml.to_ascii_uppercase();

    if upper.contains("<!DOCTYPE") {
        return Err(ServiceError::MalformedRequest(
            "DOCTYPE declarations are not allowed".to_string(),
        ));
    }

    if upper.contains("<!ENTITY") {
        return Err(ServiceError::MalformedRequest(
            "Entity declarations are not allowed".to_string(),
        ));
    }

    Ok(())
}

/// Extract local name from element.
fn local_name_str(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}
