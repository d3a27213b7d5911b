use serde::Deserialize;

/// The subset of the provider's userinfo payload a customer is built from
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default, alias = "email_verified")]
    pub verified_email: bool,
    #[serde(default, rename = "picture")]
    pub image: String,
}

impl UserProfile {
    pub fn from_slice(body: &[u8]) -> crate::Result<Self> {
        Ok(serde_json::from_slice(body)?)
    }
}
