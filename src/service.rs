//! Request dispatch for the Person service.
//!
//! Each request runs decode, authorization (mutating operations only),
//! field validation (Add/Update), an existence precheck (Update/Delete) and
//! finally the repository call. The first failing stage ends the request
//! with a SOAP fault.

use crate::auth::{authorize, CredentialVerifier, StaticCredentials};
use crate::config::{FaultLanguage, PersonServiceConfig, SoapVersion};
use crate::error::{Fault, FaultClass, ServiceError};
use crate::model::Operation;
use crate::parser::parse_soap_request;
use crate::response::{OperationOutcome, SoapResponse};
use crate::storage::PersonRepository;
use crate::validator::FieldValidator;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Person CRUD and search over SOAP envelopes.
pub struct PersonService {
    repository: Arc<dyn PersonRepository>,
    verifier: Arc<dyn CredentialVerifier>,
    validator: FieldValidator,
    realm: String,
    language: FaultLanguage,
}

impl PersonService {
    pub fn new(
        repository: Arc<dyn PersonRepository>,
        verifier: Arc<dyn CredentialVerifier>,
        validator: FieldValidator,
        realm: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            verifier,
            validator,
            realm: realm.into(),
            language: FaultLanguage::default(),
        }
    }

    /// Render fault texts in `language`.
    pub fn with_language(mut self, language: FaultLanguage) -> Self {
        self.language = language;
        self
    }

    /// Build a service using the configured static credentials and phone pattern.
    pub fn from_config(
        config: &PersonServiceConfig,
        repository: Arc<dyn PersonRepository>,
    ) -> Result<Self, regex::Error> {
        let validator = FieldValidator::new(&config.validation)?;
        Ok(Self::new(
            repository,
            Arc::new(StaticCredentials::from_config(&config.auth)),
            validator,
            config.auth.realm.clone(),
        )
        .with_language(config.server.fault_language))
    }

    /// Handle one raw request body and its `Authorization` header.
    pub async fn handle(&self, body: &[u8], authorization: Option<&[u8]>) -> SoapResponse {
        trace!(body = %String::from_utf8_lossy(body), "Request body");

        let request = match parse_soap_request(body) {
            Ok(request) => request,
            Err(err) => return self.fault(&err, SoapVersion::default(), None),
        };

        let operation = request.operation;
        let name = operation.name();

        match self.execute(operation, authorization).await {
            Ok(outcome) => {
                debug!(operation = name, "Operation succeeded");
                SoapResponse::success(&outcome, request.version)
            }
            Err(err) => self.fault(&err, request.version, Some(name)),
        }
    }

    /// Handle a request whose body could not be read.
    pub fn reject(&self, reason: &str) -> SoapResponse {
        let err = ServiceError::MalformedRequest(reason.to_string());
        self.fault(&err, SoapVersion::default(), None)
    }

    async fn execute(
        &self,
        operation: Operation,
        authorization: Option<&[u8]>,
    ) -> Result<OperationOutcome, ServiceError> {
        if operation.is_mutating() {
            authorize(authorization, self.verifier.as_ref())?;
        }

        match operation {
            Operation::AddPerson(person) => {
                self.validator.validate(&person)?;
                let id = self.repository.add_person(&person).await?;
                info!(id, "Person added");
                Ok(OperationOutcome::Added { id })
            }

            Operation::UpdatePerson { id, person } => {
                self.validator.validate(&person)?;
                self.ensure_exists(id).await?;
                self.repository.update_person(id, &person).await?;
                info!(id, "Person updated");
                Ok(OperationOutcome::Updated)
            }

            Operation::DeletePerson { id } => {
                self.ensure_exists(id).await?;
                // A concurrent delete may have won since the precheck
                if self.repository.delete_person(id).await? == 0 {
                    return Err(ServiceError::NotFound);
                }
                info!(id, "Person deleted");
                Ok(OperationOutcome::Deleted)
            }

            Operation::GetPerson { id } => {
                let person = self.repository.get_person(id).await?;
                Ok(OperationOutcome::Found(person))
            }

            Operation::GetAllPersons => {
                let persons = self.repository.get_all_persons().await?;
                if persons.is_empty() {
                    return Err(ServiceError::NotFound);
                }
                Ok(OperationOutcome::Listed(persons))
            }

            Operation::SearchPerson { query } => {
                let persons = self.repository.search_person(&query).await?;
                debug!(query = %query, matches = persons.len(), "Search completed");
                if persons.is_empty() {
                    return Err(ServiceError::NotFound);
                }
                Ok(OperationOutcome::Searched(persons))
            }
        }
    }

    async fn ensure_exists(&self, id: i32) -> Result<(), ServiceError> {
        if self.repository.check_person_by_id(id).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }

    fn fault(
        &self,
        err: &ServiceError,
        version: SoapVersion,
        operation: Option<&str>,
    ) -> SoapResponse {
        let fault = Fault::localized(err, self.language);
        let operation = operation.unwrap_or("-");

        match fault.class {
            FaultClass::Client => warn!(
                operation,
                code = fault.code.as_str(),
                error = %err,
                "Request rejected"
            ),
            FaultClass::Server => error!(
                operation,
                code = fault.code.as_str(),
                error = %err,
                "Request failed"
            ),
        }

        SoapResponse::fault(&fault, version, &self.realm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationConfig;
    use crate::model::{NewPerson, Person};
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory repository counting every call it receives.
    #[derive(Default)]
    struct MemoryRepository {
        rows: Mutex<Vec<Person>>,
        calls: AtomicUsize,
        fail: bool,
    }

    impl MemoryRepository {
        fn with_rows(rows: Vec<Person>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn touch(&self) -> Result<(), ServiceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ServiceError::Database(sea_orm::DbErr::Custom(
                    "connection refused to db.internal:5432".to_string(),
                )));
            }
            Ok(())
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PersonRepository for MemoryRepository {
        async fn add_person(&self, person: &NewPerson) -> Result<i32, ServiceError> {
            self.touch()?;
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|p| p.email == person.email) {
                return Err(ServiceError::EmailExists(person.email.clone()));
            }
            let id = rows.iter().map(|p| p.id).max().unwrap_or(0) + 1;
            rows.push(person.clone().with_id(id));
            Ok(id)
        }

        async fn get_person(&self, id: i32) -> Result<Person, ServiceError> {
            self.touch()?;
            let rows = self.rows.lock().unwrap();
            rows.iter()
                .find(|p| p.id == id)
                .cloned()
                .ok_or(ServiceError::NotFound)
        }

        async fn update_person(&self, id: i32, person: &NewPerson) -> Result<(), ServiceError> {
            self.touch()?;
            let mut rows = self.rows.lock().unwrap();
            if rows.iter().any(|p| p.email == person.email && p.id != id) {
                return Err(ServiceError::EmailExists(person.email.clone()));
            }
            let row = rows
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(ServiceError::NotFound)?;
            *row = person.clone().with_id(id);
            Ok(())
        }

        async fn delete_person(&self, id: i32) -> Result<u64, ServiceError> {
            self.touch()?;
            let mut rows = self.rows.lock().unwrap();
            let before = rows.len();
            rows.retain(|p| p.id != id);
            Ok((before - rows.len()) as u64)
        }

        async fn get_all_persons(&self) -> Result<Vec<Person>, ServiceError> {
            self.touch()?;
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn search_person(&self, query: &str) -> Result<Vec<Person>, ServiceError> {
            self.touch()?;
            let rows = self.rows.lock().unwrap();
            Ok(rows
                .iter()
                .filter(|p| p.name.contains(query) || p.email.contains(query))
                .cloned()
                .collect())
        }

        async fn check_person_by_email(
            &self,
            email: &str,
            exclude_id: i32,
        ) -> Result<bool, ServiceError> {
            self.touch()?;
            let rows = self.rows.lock().unwrap();
            Ok(rows.iter().any(|p| p.email == email && p.id != exclude_id))
        }

        async fn check_person_by_id(&self, id: i32) -> Result<bool, ServiceError> {
            self.touch()?;
            Ok(self.rows.lock().unwrap().iter().any(|p| p.id == id))
        }
    }

    fn service(repository: Arc<MemoryRepository>) -> PersonService {
        PersonService::new(
            repository,
            Arc::new(StaticCredentials::new("root", "password")),
            FieldValidator::new(&ValidationConfig::default()).unwrap(),
            "person-service",
        )
    }

    fn auth() -> String {
        format!("Basic {}", STANDARD.encode("root:password"))
    }

    fn anna() -> Person {
        Person {
            id: 1,
            name: "Anna".to_string(),
            surname: "Ivanova".to_string(),
            age: 42,
            email: "anna@example.com".to_string(),
            telephone: "+71234567890".to_string(),
        }
    }

    fn envelope(body: &str) -> Vec<u8> {
        format!(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/"><soap:Body>{}</soap:Body></soap:Envelope>"#,
            body
        )
        .into_bytes()
    }

    fn add_body(email: &str, telephone: &str) -> Vec<u8> {
        envelope(&format!(
            "<AddPerson><Name>Boris</Name><Surname>Petrov</Surname><Age>30</Age>\
             <Email>{}</Email><Telephone>{}</Telephone></AddPerson>",
            email, telephone
        ))
    }

    #[tokio::test]
    async fn test_add_person_success() {
        let repo = Arc::new(MemoryRepository::default());
        let svc = service(repo.clone());

        let response = svc
            .handle(&add_body("boris@example.com", "+79990001122"), Some(auth().as_bytes()))
            .await;

        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.contains("<AddPersonResponse><ID>1</ID></AddPersonResponse>"));
        assert_eq!(response.content_type, "text/xml; charset=utf-8");
        assert_eq!(repo.rows.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mutations_without_auth_never_reach_repository() {
        let repo = Arc::new(MemoryRepository::with_rows(vec![anna()]));
        let svc = service(repo.clone());

        let bodies = [
            add_body("boris@example.com", "+79990001122"),
            envelope("<DeletePerson><ID>1</ID></DeletePerson>"),
            envelope(
                "<UpdatePerson><ID>1</ID><Email>a@example.com</Email>\
                 <Telephone>+71234567890</Telephone></UpdatePerson>",
            ),
        ];

        for body in &bodies {
            let response = svc.handle(body, None).await;
            assert_eq!(response.status, StatusCode::UNAUTHORIZED);
            assert!(response.www_authenticate.is_some());
            assert!(response.body.contains("AUTH_HEADER_MISSING"));
        }

        let wrong = format!("Basic {}", STANDARD.encode("root:nope"));
        let response = svc.handle(&bodies[0], Some(wrong.as_bytes())).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert!(response.body.contains("INVALID_CREDENTIALS"));

        assert_eq!(repo.calls(), 0);
    }

    #[tokio::test]
    async fn test_reads_do_not_require_auth() {
        let repo = Arc::new(MemoryRepository::with_rows(vec![anna()]));
        let svc = service(repo);

        let response = svc
            .handle(&envelope("<GetPerson><ID>1</ID></GetPerson>"), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.contains("<Email>anna@example.com</Email>"));
    }

    #[tokio::test]
    async fn test_validation_precedes_repository() {
        let repo = Arc::new(MemoryRepository::default());
        let svc = service(repo.clone());

        let response = svc
            .handle(&add_body("not-an-email", "+79990001122"), Some(auth().as_bytes()))
            .await;
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert!(response.body.contains("INVALID_EMAIL"));

        let response = svc
            .handle(&add_body("boris@example.com", "81234567890"), Some(auth().as_bytes()))
            .await;
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert!(response.body.contains("INVALID_PHONE"));

        assert_eq!(repo.calls(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let repo = Arc::new(MemoryRepository::with_rows(vec![anna()]));
        let svc = service(repo);

        let response = svc
            .handle(&add_body("anna@example.com", "+79990001122"), Some(auth().as_bytes()))
            .await;
        assert_eq!(response.status, StatusCode::CONFLICT);
        assert!(response.body.contains("<errorCode>EMAIL_EXISTS</errorCode>"));
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let repo = Arc::new(MemoryRepository::with_rows(vec![anna()]));
        let svc = service(repo);

        // Unknown id wins over the duplicate email
        let body = envelope(
            "<UpdatePerson><ID>99</ID><Email>anna@example.com</Email>\
             <Telephone>+71234567890</Telephone></UpdatePerson>",
        );
        let response = svc.handle(&body, Some(auth().as_bytes())).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let repo = Arc::new(MemoryRepository::with_rows(vec![anna()]));
        let svc = service(repo);

        let response = svc
            .handle(&envelope("<DeletePerson><ID>1</ID></DeletePerson>"), Some(auth().as_bytes()))
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.body.contains("<status>true</status>"));

        let response = svc
            .handle(&envelope("<GetPerson><ID>1</ID></GetPerson>"), None)
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let response = svc
            .handle(&envelope("<DeletePerson><ID>1</ID></DeletePerson>"), Some(auth().as_bytes()))
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_empty_listing_is_not_found() {
        let svc = service(Arc::new(MemoryRepository::default()));

        let response = svc.handle(&envelope("<GetAllPersons/>"), None).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);

        let response = svc
            .handle(&envelope("<SearchPerson><Query>zzz</Query></SearchPerson>"), None)
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_and_unsupported() {
        let repo = Arc::new(MemoryRepository::default());
        let svc = service(repo.clone());

        let response = svc.handle(b"not xml at all <", None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.body.contains("MALFORMED_REQUEST"));

        let response = svc.handle(&envelope("<FlyToMoon/>"), None).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.body.contains("UNSUPPORTED_OPERATION"));

        assert_eq!(repo.calls(), 0);
    }

    #[tokio::test]
    async fn test_database_error_is_hidden() {
        let svc = service(Arc::new(MemoryRepository::failing()));

        let response = svc.handle(&envelope("<GetAllPersons/>"), None).await;
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.body.contains("<faultcode>soap:Server</faultcode>"));
        assert!(!response.body.contains("db.internal"));
    }

    #[tokio::test]
    async fn test_russian_faults() {
        let svc = service(Arc::new(MemoryRepository::default())).with_language(FaultLanguage::Ru);

        let response = svc
            .handle(&envelope("<GetPerson><ID>5</ID></GetPerson>"), None)
            .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert!(response.body.contains("<faultstring>Запись не найдена</faultstring>"));
        assert!(response.body.contains("<errorCode>NOT_FOUND</errorCode>"));
    }

    #[test]
    fn test_reject_is_malformed() {
        let svc = service(Arc::new(MemoryRepository::default()));
        let response = svc.reject("length limit exceeded");
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.body.contains("length limit exceeded"));
    }
}
