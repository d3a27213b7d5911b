use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    database::{CustomerFilter, CustomerStore},
    models::{
        normalize_email, Customer, CustomerId, CustomerPatch, CustomerUpdate, NewCustomer,
        OAuthCredential, UserProfile,
    },
    DirectoryError, Result,
};

/// The only way the rest of the service reads or writes customers
#[derive(Clone)]
pub struct CustomerDirectory {
    store: Arc<dyn CustomerStore>,
}

impl CustomerDirectory {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }

    /// Resolves the customer behind an authenticated identity, creating it on
    /// the first login.
    ///
    /// Repeat logins are matched on email. The existing record keeps its id
    /// and profile fields and only has its credential refreshed.
    #[tracing::instrument(skip(self, profile, credential), fields(email = %profile.email))]
    pub async fn provision(
        &self,
        profile: UserProfile,
        credential: OAuthCredential,
    ) -> Result<Customer> {
        let email = normalize_email(&profile.email);
        if let Some(existing) = self.refresh_credential(&email, &credential).await? {
            info!(id = %existing.id, "returning customer logged in again");
            return Ok(existing);
        }

        let new = NewCustomer {
            name: profile.name,
            email: profile.email,
            cpf: None,
            image: profile.image,
        };
        match self.insert(new, credential.clone()).await {
            Err(DirectoryError::DuplicateEmail) => {
                // Lost the race against a concurrent login for the same identity
                warn!("customer was provisioned concurrently, resolving existing record");
                self.refresh_credential(&email, &credential)
                    .await?
                    .ok_or(DirectoryError::StoreUnavailable)
            }
            other => {
                if let Ok(customer) = &other {
                    info!(id = %customer.id, "provisioned new customer");
                }
                other
            }
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_id(&self, id: &str) -> Result<Customer> {
        let id: CustomerId = id.parse()?;
        self.store
            .find_one(CustomerFilter::ById(id))
            .await?
            .ok_or(DirectoryError::NotFound)
    }

    #[tracing::instrument(skip(self, new), fields(email = %new.email))]
    pub async fn create(&self, new: NewCustomer) -> Result<Customer> {
        self.insert(new, OAuthCredential::default()).await
    }

    /// Applies `patch` to the customer registered under `email` and returns its id
    #[tracing::instrument(skip(self, patch))]
    pub async fn update_by_email(&self, email: &str, patch: CustomerPatch) -> Result<CustomerId> {
        let invalid = patch.invalid_fields();
        if !invalid.is_empty() {
            return Err(DirectoryError::ValidationFailed(invalid));
        }
        self.store
            .find_one_and_update(CustomerFilter::by_email(email), patch.into())
            .await?
            .map(|customer| customer.id)
            .ok_or(DirectoryError::NotFound)
    }

    /// Deleting an id that doesn't exist is not an error
    #[tracing::instrument(skip(self))]
    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        let id: CustomerId = id.parse()?;
        let deleted = self.store.delete_one(CustomerFilter::ById(id)).await?;
        if !deleted {
            info!(%id, "delete requested for a customer that does not exist");
        }
        Ok(())
    }

    async fn insert(&self, new: NewCustomer, credential: OAuthCredential) -> Result<Customer> {
        let invalid = new.invalid_fields();
        if !invalid.is_empty() {
            return Err(DirectoryError::ValidationFailed(invalid));
        }
        let customer = Customer::from_new(new, credential);
        self.store.insert_one(customer).await
    }

    async fn refresh_credential(
        &self,
        email: &str,
        credential: &OAuthCredential,
    ) -> Result<Option<Customer>> {
        let update = CustomerUpdate {
            o_auth: Some(credential.clone()),
            ..Default::default()
        };
        self.store
            .find_one_and_update(CustomerFilter::by_email(email), update)
            .await
    }
}
