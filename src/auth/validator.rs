//! Authentication validator
//!
//! Verifies the single `username:password` line a client sends in response
//! to the authentication challenge. Exactly one attempt is permitted per
//! connection; the caller closes the connection on any error.

use crate::auth::credentials::CredentialStore;
use crate::error::AuthError;

/// Validates one credential line against the store.
///
/// Splits on the first colon, so passwords may contain colons. Returns the
/// authenticated username on success.
pub fn verify_credentials(store: &CredentialStore, line: &str) -> Result<String, AuthError> {
    let (username, password) = line
        .trim()
        .split_once(':')
        .ok_or(AuthError::MalformedCredentials)?;

    match store.lookup(username) {
        Some(secret) if secret == password => Ok(username.to_string()),
        Some(_) => Err(AuthError::InvalidPassword(username.to_string())),
        None => Err(AuthError::UserNotFound(username.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::from_pairs([("alice", "secret"), ("bob", "pa:ss")])
    }

    #[test]
    fn test_valid_credentials() {
        assert_eq!(verify_credentials(&store(), "alice:secret").unwrap(), "alice");
    }

    #[test]
    fn test_password_may_contain_colons() {
        assert_eq!(verify_credentials(&store(), "bob:pa:ss").unwrap(), "bob");
    }

    #[test]
    fn test_wrong_password() {
        assert!(matches!(
            verify_credentials(&store(), "alice:wrong"),
            Err(AuthError::InvalidPassword(_))
        ));
    }

    #[test]
    fn test_unknown_user() {
        assert!(matches!(
            verify_credentials(&store(), "mallory:secret"),
            Err(AuthError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_missing_colon() {
        assert!(matches!(
            verify_credentials(&store(), "alice"),
            Err(AuthError::MalformedCredentials)
        ));
    }
}
