//! Bearer-token authorization for API requests.
//!
//! Each request is authorized independently: decode and verify the bearer
//! token, check the revocation ledger, load the subject row, and gate on
//! account status. The only shared state touched is the ledger, and the
//! whole path is read-only.

mod bearer;
mod errors;
mod extractors;
mod state;
mod types;

pub use bearer::extract_credential;
pub use errors::{ApiAuthError, AuthErrorKind};
pub use extractors::{AdminAuth, Auth, MaybeAuth};
pub use state::HasAuthState;
pub use types::AuthenticatedUser;
