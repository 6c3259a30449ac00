use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Authorization label checked by the access gate. Stored as the Postgres
/// enum `user_role`; matched exhaustively so a typo can never grant access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 hash, never exposed in JSON
    pub role: Role,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Find a user by username.
pub async fn find_by_username(db: &PgPool, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, name, email, password_hash, role, created_at, updated_at
        FROM users
        WHERE username = $1
        "#,
    )
    .bind(username)
    .fetch_optional(db)
    .await
}

/// Find a user by email.
pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, name, email, password_hash, role, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(db)
    .await
}

/// Find a user by id.
pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, username, name, email, password_hash, role, created_at, updated_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
}

/// Create a new user with an already-hashed password. The unique indexes on
/// username and email reject concurrent duplicates; callers inspect the error
/// for a unique violation rather than trusting any pre-check.
pub async fn create(
    db: &PgPool,
    username: &str,
    name: &str,
    email: &str,
    password_hash: &str,
    role: Role,
) -> sqlx::Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (username, name, email, password_hash, role)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, name, email, password_hash, role, created_at, updated_at
        "#,
    )
    .bind(username)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(db)
    .await
}

/// Apply a partial profile update; absent fields keep their current value.
/// Returns `None` when the row no longer exists.
pub async fn update_profile(
    db: &PgPool,
    id: Uuid,
    name: Option<&str>,
    email: Option<&str>,
    password_hash: Option<&str>,
) -> sqlx::Result<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET name = COALESCE($2, name),
            email = COALESCE($3, email),
            password_hash = COALESCE($4, password_hash),
            updated_at = NOW()
        WHERE id = $1
        RETURNING id, username, name, email, password_hash, role, created_at, updated_at
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_optional(db)
    .await
}

/// Overwrite the stored password hash. Returns false when the row is gone.
pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> sqlx::Result<bool> {
    let result =
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await?;
    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
impl User {
    pub(crate) fn fake(role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: "alice".into(),
            name: "Alice".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$unused".into(),
            role,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for (input, expected) in [("user", Role::User), ("admin", Role::Admin)] {
            let parsed: Role = serde_json::from_str(&format!("\"{input}\"")).unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.to_string(), input);
        }
    }

    #[test]
    fn role_defaults_to_user() {
        assert_eq!(Role::default(), Role::User);
    }

    #[test]
    fn user_serialization_never_includes_the_password_hash() {
        let user = User::fake(Role::User);
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
        assert!(json.contains("alice"));
    }
}
