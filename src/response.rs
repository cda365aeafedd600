//! SOAP response envelopes for successful operations and faults.

use crate::config::SoapVersion;
use crate::error::{soap_fault_response, xml_escape, Fault, FaultCode};
use crate::model::Person;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use std::fmt::Write as _;

/// Result of a successfully executed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Added { id: i32 },
    Updated,
    Deleted,
    Found(Person),
    Listed(Vec<Person>),
    Searched(Vec<Person>),
}

impl OperationOutcome {
    /// Name of the response element wrapping the payload.
    pub fn element_name(&self) -> &'static str {
        match self {
            Self::Added { .. } => "AddPersonResponse",
            Self::Updated => "UpdatePersonResponse",
            Self::Deleted => "DeletePersonResponse",
            Self::Found(_) => "GetPersonResponse",
            Self::Listed(_) => "GetAllPersonsResponse",
            Self::Searched(_) => "SearchPersonResponse",
        }
    }

    fn write_payload(&self, out: &mut String) {
        match self {
            Self::Added { id } => {
                let _ = write!(out, "<ID>{}</ID>", id);
            }
            Self::Updated | Self::Deleted => out.push_str("<status>true</status>"),
            Self::Found(person) => write_person(out, person),
            Self::Listed(persons) | Self::Searched(persons) => {
                out.push_str("<Persons>");
                for person in persons {
                    write_person(out, person);
                }
                out.push_str("</Persons>");
            }
        }
    }
}

fn write_person(out: &mut String, person: &Person) {
    let _ = write!(
        out,
        "<Person><ID>{}</ID><Name>{}</Name><Surname>{}</Surname><Age>{}</Age>\
         <Email>{}</Email><Telephone>{}</Telephone></Person>",
        person.id,
        xml_escape(&person.name),
        xml_escape(&person.surname),
        person.age,
        xml_escape(&person.email),
        xml_escape(&person.telephone)
    );
}

/// Serialize a success envelope for the given version.
pub fn soap_success_response(outcome: &OperationOutcome, version: SoapVersion) -> String {
    let mut payload = String::new();
    outcome.write_payload(&mut payload);

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soap:Envelope xmlns:soap="{ns}">
  <soap:Body>
    <{name}>{payload}</{name}>
  </soap:Body>
</soap:Envelope>"#,
        ns = version.namespace(),
        name = outcome.element_name(),
        payload = payload
    )
}

/// A fully rendered HTTP response.
#[derive(Debug, Clone)]
pub struct SoapResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: String,
    /// Basic-auth challenge, set on 401 responses
    pub www_authenticate: Option<String>,
}

impl SoapResponse {
    pub fn success(outcome: &OperationOutcome, version: SoapVersion) -> Self {
        Self {
            status: StatusCode::OK,
            content_type: version.content_type(),
            body: soap_success_response(outcome, version),
            www_authenticate: None,
        }
    }

    /// Render a fault. Authentication faults carry a challenge for `realm`.
    pub fn fault(fault: &Fault, version: SoapVersion, realm: &str) -> Self {
        let www_authenticate = match fault.code {
            FaultCode::AuthHeaderMissing
            | FaultCode::AuthHeaderMalformed
            | FaultCode::InvalidCredentials => Some(format!("Basic realm=\"{}\"", realm)),
            _ => None,
        };

        Self {
            status: fault.code.status(),
            content_type: version.content_type(),
            body: soap_fault_response(fault, version),
            www_authenticate,
        }
    }
}

impl IntoResponse for SoapResponse {
    fn into_response(self) -> Response {
        let mut response = (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response();

        if let Some(challenge) = self.www_authenticate {
            if let Ok(value) = HeaderValue::from_str(&challenge) {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, value);
            }
        }

        response
    }
}
