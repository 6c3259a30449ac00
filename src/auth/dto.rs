use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::repo::{Role, User};

/// Request body for user registration. Role is optional and defaults to
/// the plain user role.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub password: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for the admin profile update; any subset of fields.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Request body for the self-service password change.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Request body for forgot-password.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Request body for reset-password. Optional so that an absent field maps to
/// the contract's 400 instead of a framework rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: Option<String>,
}

/// Public part of the user returned to the client. Never carries the hash.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

/// Plain acknowledgment body.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Response returned after registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

/// Response returned after login: the session token plus the user id.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub id: Uuid,
}

/// Response returned after a profile update.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_role_defaults_to_user() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"alice","name":"Alice","password":"Secret1","email":"a@x.com"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::User);
    }

    #[test]
    fn register_accepts_an_explicit_role() {
        let req: RegisterRequest = serde_json::from_str(
            r#"{"username":"root","name":"Root","password":"Secret1","email":"r@x.com","role":"admin"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::Admin);
    }

    #[test]
    fn update_password_body_is_camel_case() {
        let req: UpdatePasswordRequest =
            serde_json::from_str(r#"{"currentPassword":"old","newPassword":"new"}"#).unwrap();
        assert_eq!(req.current_password, "old");
        assert_eq!(req.new_password, "new");
    }

    #[test]
    fn public_user_excludes_the_password_hash() {
        let public = PublicUser::from(User::fake(Role::User));
        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains("alice"));
        assert!(json.contains("\"role\":\"user\""));
        assert!(!json.contains("password"));
    }

    #[test]
    fn login_response_serialization() {
        let response = LoginResponse {
            message: "Login successful",
            token: "t.t.t".into(),
            id: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("Login successful"));
        assert!(json.contains("t.t.t"));
        assert!(json.contains("id"));
    }
}
