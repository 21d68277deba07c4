mod identity;
mod refresh;
mod silent;

pub use identity::SessionIdentity;
pub use refresh::{HttpTokenEndpoint, IssuedTokens, TokenEndpoint};
pub use silent::{AccessTokenSource, SilentTokenProvider};
