mod credential;
mod customer;
mod customer_id;
mod profile;

pub use credential::{OAuthCredential, TokenSet};
pub use customer::{
    normalize_email, Customer, CustomerPatch, CustomerResponse, CustomerUpdate, NewCustomer,
};
pub use customer_id::CustomerId;
pub use profile::UserProfile;
