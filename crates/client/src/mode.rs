//! Cart mode state.

use crate::session::Identity;

/// Which cart the manager is presenting.
///
/// There is no offline or reconnecting state: a failed remote call is
/// reported to the caller and the mode stays as it was.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CartMode {
    /// No user; the cart lives only in the local store.
    #[default]
    Guest,
    /// A user is logged in; the backend owns the cart.
    Authenticated(Identity),
}

impl CartMode {
    pub fn is_guest(&self) -> bool {
        matches!(self, Self::Guest)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// The logged-in identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Guest => None,
            Self::Authenticated(identity) => Some(identity),
        }
    }

    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::Authenticated(_) => "authenticated",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AuthToken;
    use bookstore_core::UserId;

    #[test]
    fn default_is_guest() {
        let mode = CartMode::default();
        assert!(mode.is_guest());
        assert!(!mode.is_authenticated());
        assert_eq!(mode.identity(), None);
        assert_eq!(mode.label(), "guest");
    }

    #[test]
    fn authenticated_exposes_identity() {
        let identity = Identity::new(UserId::new(4), AuthToken::new("t"));
        let mode = CartMode::Authenticated(identity.clone());
        assert!(mode.is_authenticated());
        assert_eq!(mode.identity(), Some(&identity));
        assert_eq!(mode.label(), "authenticated");
    }
}
