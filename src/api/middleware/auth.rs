use axum::{extract::Request, middleware::Next, response::Response};
use tower_sessions::Session;

use super::session::{AuthSession, SESSION_KEY_AUTH};
use crate::error::{AppError, Result};
use crate::models::Role;

/// Middleware that requires an administrator session
pub async fn require_admin(session: Session, request: Request, next: Next) -> Result<Response> {
    get_authenticated(&session, Role::Admin).await?;
    Ok(next.run(request).await)
}

/// Reads the logged-in identity and checks it carries `role`
pub async fn get_authenticated(session: &Session, role: Role) -> Result<AuthSession> {
    let auth: AuthSession = session
        .get(SESSION_KEY_AUTH)
        .await?
        .ok_or(AppError::Unauthorized)?;

    check_role(auth, role)
}

fn check_role(auth: AuthSession, role: Role) -> Result<AuthSession> {
    if auth.role != role {
        tracing::warn!(email = %auth.email, expected = %role, actual = %auth.role, "Role mismatch");
        return Err(AppError::Forbidden);
    }
    Ok(auth)
}

/// The profile row id for member and trainer sessions
pub fn profile_id(auth: &AuthSession) -> Result<i32> {
    auth.profile_id.ok_or(AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_for(role: Role) -> AuthSession {
        AuthSession {
            role,
            email: "someone@gym.test".to_string(),
            profile_id: Some(3),
        }
    }

    #[test]
    fn test_matching_role_passes() {
        let auth = check_role(session_for(Role::Trainer), Role::Trainer).unwrap();
        assert_eq!(profile_id(&auth).unwrap(), 3);
    }

    #[test]
    fn test_wrong_role_is_forbidden() {
        let result = check_role(session_for(Role::Member), Role::Admin);
        assert!(matches!(result, Err(AppError::Forbidden)));
    }

    #[test]
    fn test_missing_profile_is_unauthorized() {
        let auth = AuthSession {
            role: Role::Admin,
            email: "admin@gym.test".to_string(),
            profile_id: None,
        };
        assert!(matches!(profile_id(&auth), Err(AppError::Unauthorized)));
    }
}
