//! Scope-based authorization
//!
//! A tool may declare a set of acceptable scopes; a session satisfies the
//! requirement when it carries at least one of them (any-of, not all-of).

use crate::error::{Error, Result};
use crate::session::Session;

/// Check a session against a tool's required-scope set
///
/// Allows when:
/// - no session is present (authentication was never configured or
///   performed for this transport),
/// - the session carries no scope restriction (`scopes` is `None`),
/// - the tool requires no scopes,
/// - or at least one required scope is present in the session.
pub fn check_scopes(session: Option<&Session>, required: &[String]) -> Result<()> {
    let Some(session) = session else {
        return Ok(());
    };
    let Some(scopes) = &session.scopes else {
        return Ok(());
    };
    if required.is_empty() {
        return Ok(());
    }

    if required.iter().any(|scope| scopes.contains(scope)) {
        Ok(())
    } else {
        Err(Error::MissingScopes(required.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_scopes(scopes: Option<Vec<&str>>) -> Session {
        Session {
            user_name: "jane".to_string(),
            groups: None,
            scopes: scopes.map(|s| s.into_iter().map(String::from).collect()),
        }
    }

    fn required(scopes: &[&str]) -> Vec<String> {
        scopes.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_session_allows() {
        assert!(check_scopes(None, &required(&["admin"])).is_ok());
    }

    #[test]
    fn test_nil_scopes_disable_checking() {
        let session = session_with_scopes(None);
        assert!(check_scopes(Some(&session), &required(&["admin"])).is_ok());
    }

    #[test]
    fn test_empty_required_allows() {
        let session = session_with_scopes(Some(vec![]));
        assert!(check_scopes(Some(&session), &[]).is_ok());
    }

    #[test]
    fn test_matching_scope_allows() {
        let session = session_with_scopes(Some(vec!["read", "write"]));
        assert!(check_scopes(Some(&session), &required(&["read"])).is_ok());
    }

    #[test]
    fn test_any_of_semantics() {
        let session = session_with_scopes(Some(vec!["write"]));
        assert!(check_scopes(Some(&session), &required(&["read", "write"])).is_ok());
    }

    #[test]
    fn test_missing_scope_denies() {
        let session = session_with_scopes(Some(vec!["read", "write"]));
        let err = check_scopes(Some(&session), &required(&["admin"])).unwrap_err();
        assert!(err
            .to_string()
            .contains("at least one of the following scopes is required:"));
        assert!(err.to_string().contains("admin"));
    }

    #[test]
    fn test_empty_session_scopes_deny_any_requirement() {
        let session = session_with_scopes(Some(vec![]));
        assert!(check_scopes(Some(&session), &required(&["read"])).is_err());
    }
}
