mod flow;
mod provider;
mod state;

pub use flow::{LoginRedirect, LoginStage, OAuthFlow};
pub use provider::{GoogleOAuthClient, IdentityProvider, ProviderError};
pub use state::{StateClaims, StateTokens, STATE_COOKIE};
