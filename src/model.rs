//! Person records and the typed operation requests decoded from envelopes.

use serde::{Deserialize, Serialize};

/// A stored person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Server-assigned identifier
    pub id: i32,
    pub name: String,
    pub surname: String,
    pub age: i32,
    /// Unique across all records
    pub email: String,
    pub telephone: String,
}

/// Person fields supplied by a client, without an identifier.
///
/// Used for creation, for full replacement on update, and for the startup
/// seed dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPerson {
    pub name: String,
    pub surname: String,
    pub age: i32,
    pub email: String,
    pub telephone: String,
}

impl NewPerson {
    /// Attach an identifier, producing a full record.
    pub fn with_id(self, id: i32) -> Person {
        Person {
            id,
            name: self.name,
            surname: self.surname,
            age: self.age,
            email: self.email,
            telephone: self.telephone,
        }
    }
}

/// One decoded service operation. Exactly one is carried per envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    AddPerson(NewPerson),
    DeletePerson { id: i32 },
    UpdatePerson { id: i32, person: NewPerson },
    GetPerson { id: i32 },
    GetAllPersons,
    SearchPerson { query: String },
}

impl Operation {
    /// Body element name of this operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddPerson(_) => "AddPerson",
            Self::DeletePerson { .. } => "DeletePerson",
            Self::UpdatePerson { .. } => "UpdatePerson",
            Self::GetPerson { .. } => "GetPerson",
            Self::GetAllPersons => "GetAllPersons",
            Self::SearchPerson { .. } => "SearchPerson",
        }
    }

    /// Whether the operation changes stored data and so requires credentials.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::AddPerson(_) | Self::DeletePerson { .. } | Self::UpdatePerson { .. }
        )
    }
}
