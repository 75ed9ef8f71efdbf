//! Authentication state consumed from the sign-in flow.

/// Read-only view of the sign-in state.
pub trait AuthState: Send + Sync {
    fn is_signed_in(&self) -> bool;

    /// Identifier of the signed-in user, if any.
    fn user_id(&self) -> Option<String>;
}

/// Fixed authentication state.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    user_id: Option<String>,
}

impl StaticAuth {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    pub fn signed_out() -> Self {
        Self { user_id: None }
    }
}

impl AuthState for StaticAuth {
    fn is_signed_in(&self) -> bool {
        self.user_id.is_some()
    }

    fn user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}
