//! Authorization state trait and macro.

use crate::db::Database;
use crate::token::TokenSigner;

/// Trait for router state types that provide database and signer access
/// for authorization.
pub trait HasAuthState {
    fn signer(&self) -> &TokenSigner;
    fn db(&self) -> &Database;
}

/// Implement `HasAuthState` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `signer: Arc<TokenSigner>`
/// - `db: Database`
///
/// # Example
/// ```ignore
/// #[derive(Clone)]
/// pub struct MyState {
///     pub db: Database,
///     pub signer: Arc<TokenSigner>,
/// }
///
/// impl_has_auth_state!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_state {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthState for $state_type {
            fn signer(&self) -> &$crate::token::TokenSigner {
                &self.signer
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
        }
    };
}
