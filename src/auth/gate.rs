use super::token::SessionToken;
use super::AuthError;

/// Permission level an operation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Client,
    Admin,
}

/// The single decision point handlers consult before a privileged action.
///
/// Resource-ownership checks stay with the endpoint that knows the resource
/// and produce [`AuthError::Forbidden`] there; the gate only derives
/// permission levels from the token.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gate;

impl Gate {
    pub fn require(&self, token: &SessionToken, access: Access) -> Result<(), AuthError> {
        let allowed = match access {
            Access::Client => token.has_client_perms(),
            // Policy, not an oversight: every authenticated account is an
            // administrator until real roles are introduced. Change it here.
            Access::Admin => token.has_client_perms(),
        };
        if allowed {
            Ok(())
        } else {
            Err(AuthError::Unauthorized)
        }
    }

    pub fn require_client(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.require(token, Access::Client)
    }

    pub fn require_admin(&self, token: &SessionToken) -> Result<(), AuthError> {
        self.require(token, Access::Admin)
    }
}
