//! Identity: session tokens, request authentication and the authorization
//! decision core. Keep the public surface thin and split implementation
//! across sub-modules.

mod authenticator;
mod authorizer;
mod token;

pub use authenticator::{authenticate, bearer_token, AuthError};
pub use authorizer::{
    can_assign_task, can_delete_task, can_read_task, can_update_task, can_view_profile,
    require_role, scope_for, TaskScope,
};
pub use token::{Claims, TokenError, TokenVault};
