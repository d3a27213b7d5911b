use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::error;

use crate::{
    database::{CustomerFilter, CustomerStore},
    models::{normalize_email, Customer, CustomerId, CustomerUpdate},
    DirectoryError, Result,
};

/// In process store with the same semantics as [`CustomerDatabase`], including
/// the unique email constraint. Used for local runs and tests.
///
/// [`CustomerDatabase`]: crate::database::CustomerDatabase
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    customers: RwLock<HashMap<CustomerId, Customer>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.customers.read().map(|c| c.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn matches(customer: &Customer, filter: &CustomerFilter) -> bool {
    match filter {
        CustomerFilter::ById(id) => customer.id == *id,
        CustomerFilter::ByEmail(email) => normalize_email(&customer.email) == normalize_email(email),
    }
}

fn poisoned<E: std::fmt::Debug>(e: E) -> DirectoryError {
    error!(err = ?e, "customer store lock was poisoned");
    DirectoryError::StoreUnavailable
}

#[async_trait]
impl CustomerStore for MemoryDatabase {
    #[tracing::instrument(skip(self, customer), fields(repository = "memory", id = %customer.id))]
    async fn insert_one(&self, customer: Customer) -> Result<Customer> {
        let mut customers = self.customers.write().map_err(poisoned)?;
        let email = normalize_email(&customer.email);
        if customers
            .values()
            .any(|c| c.id == customer.id || normalize_email(&c.email) == email)
        {
            return Err(DirectoryError::DuplicateEmail);
        }
        customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    #[tracing::instrument(skip(self), fields(repository = "memory"))]
    async fn find_one(&self, filter: CustomerFilter) -> Result<Option<Customer>> {
        let customers = self.customers.read().map_err(poisoned)?;
        Ok(customers.values().find(|c| matches(c, &filter)).cloned())
    }

    #[tracing::instrument(skip(self, update), fields(repository = "memory"))]
    async fn find_one_and_update(
        &self,
        filter: CustomerFilter,
        update: CustomerUpdate,
    ) -> Result<Option<Customer>> {
        let mut customers = self.customers.write().map_err(poisoned)?;
        Ok(customers
            .values_mut()
            .find(|c| matches(c, &filter))
            .map(|customer| {
                customer.apply(update);
                customer.clone()
            }))
    }

    #[tracing::instrument(skip(self), fields(repository = "memory"))]
    async fn delete_one(&self, filter: CustomerFilter) -> Result<bool> {
        let mut customers = self.customers.write().map_err(poisoned)?;
        let id = customers
            .values()
            .find(|c| matches(c, &filter))
            .map(|c| c.id);
        Ok(id.and_then(|id| customers.remove(&id)).is_some())
    }
}
