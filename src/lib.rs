//! Person directory service over SOAP
//!
//! Exposes create, read, update, delete and search operations on person
//! records through SOAP envelopes posted to a single HTTP endpoint.
//!
//! # Features
//!
//! - SOAP 1.1 and 1.2 envelope decoding with DTD/entity rejection
//! - HTTP Basic authentication for mutating operations
//! - Email and telephone validation
//! - SQLite or PostgreSQL storage with migrations and startup seeding
//! - SOAP Fault responses with stable error codes
//!
//! # Example
//!
//! ```ignore
//! use person_soap::{router, storage, PersonService, PersonServiceConfig};
//! use std::sync::Arc;
//!
//! let config = PersonServiceConfig::default();
//! let db = storage::connect(&config.database).await?;
//! storage::prepare(&db, &config.database, &config.seed).await?;
//!
//! let repository = Arc::new(storage::SeaOrmPersonRepository::new(db));
//! let service = Arc::new(PersonService::from_config(&config, repository)?);
//! let app = router(service, &config.server);
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod response;
pub mod server;
pub mod service;
pub mod storage;
pub mod validator;

pub use config::PersonServiceConfig;
pub use error::{FaultCode, ServiceError};
pub use model::{NewPerson, Operation, Person};
pub use server::router;
pub use service::PersonService;
