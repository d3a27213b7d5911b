use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::{CustomerId, OAuthCredential};

/// The persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    /// Tax identifier. Only ever set through the customer endpoints.
    pub cpf: Option<String>,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub o_auth: OAuthCredential,
}

/// What the customer endpoints return, the stored credential never leaves the
/// service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerResponse {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub cpf: Option<String>,
    pub image: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for `POST /customer`
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCustomer {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub cpf: Option<String>,
    #[serde(default)]
    pub image: String,
}

/// Request body for `PUT /customer/{email}`.
///
/// Only these fields can be changed after creation, anything else in the
/// body is rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerPatch {
    pub name: Option<String>,
    pub image: Option<String>,
    pub cpf: Option<String>,
}

/// Field level update handed to the store. `None` leaves the stored value
/// untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerUpdate {
    pub name: Option<String>,
    pub image: Option<String>,
    pub cpf: Option<String>,
    pub o_auth: Option<OAuthCredential>,
}

/// Emails are compared case-insensitively, this is the form they are stored
/// and looked up in
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl Customer {
    pub(crate) fn from_new(new: NewCustomer, o_auth: OAuthCredential) -> Self {
        Self {
            id: CustomerId::new(),
            name: new.name.trim().to_string(),
            email: normalize_email(&new.email),
            cpf: new.cpf,
            image: new.image,
            created_at: Utc::now(),
            o_auth,
        }
    }

    /// Merges the supplied fields of `update` into this record
    pub fn apply(&mut self, update: CustomerUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(image) = update.image {
            self.image = image;
        }
        if let Some(cpf) = update.cpf {
            self.cpf = Some(cpf);
        }
        if let Some(o_auth) = update.o_auth {
            self.o_auth = o_auth;
        }
    }
}

impl From<Customer> for CustomerResponse {
    fn from(c: Customer) -> Self {
        Self {
            id: c.id,
            name: c.name,
            email: c.email,
            cpf: c.cpf,
            image: c.image,
            created_at: c.created_at,
        }
    }
}

impl NewCustomer {
    /// Returns every offending field rather than stopping at the first
    pub fn invalid_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.name.trim().is_empty() {
            fields.push("name".to_string());
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            fields.push("email".to_string());
        }
        fields
    }
}

impl CustomerPatch {
    pub fn invalid_fields(&self) -> Vec<String> {
        match &self.name {
            Some(name) if name.trim().is_empty() => vec!["name".to_string()],
            _ => Vec::new(),
        }
    }
}

impl From<CustomerPatch> for CustomerUpdate {
    fn from(patch: CustomerPatch) -> Self {
        Self {
            name: patch.name.map(|n| n.trim().to_string()),
            image: patch.image,
            cpf: patch.cpf,
            o_auth: None,
        }
    }
}

impl fmt::Display for Customer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Customer {} <{}>", self.id, self.email)
    }
}
