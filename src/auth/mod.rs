//! Identity primitives: the resolved caller, access tokens, password hashes.

pub mod password;
pub mod token;

use uuid::Uuid;

use crate::db::{GlobalRole, User};

pub use token::{Claims, TokenError, TokenService};

/// The verified identity behind a request. Passed explicitly into every
/// engine call that needs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
    pub username: String,
    pub role: GlobalRole,
}

impl From<&User> for Caller {
    fn from(u: &User) -> Self {
        Caller {
            user_id: u.id,
            username: u.username.clone(),
            role: u.role,
        }
    }
}
