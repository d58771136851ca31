use async_trait::async_trait;

use crate::postgres::PostgresPool;

use super::{DirectoryError, User, UserDirectory};

const FIND_BY_EMAIL: &str = r#"
    SELECT u.id::text AS id, u.email, COALESCE(p.first_name, '') AS first_name
    FROM users u
    LEFT JOIN profiles p ON p.userid = u.id AND p.deleted_at IS NULL
    WHERE LOWER(u.email) = LOWER($1) AND u.deleted_at IS NULL
    LIMIT 1
"#;

#[derive(sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    first_name: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            email: row.email,
            first_name: row.first_name,
        }
    }
}

/// Users from the `users` table joined with their `profiles` row.
pub struct PostgresUserDirectory {
    pool: PostgresPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError> {
        let email = email.to_string();
        let row = self
            .pool
            .execute(|pool| async move {
                sqlx::query_as::<_, UserRow>(FIND_BY_EMAIL)
                    .bind(email)
                    .fetch_optional(&pool)
                    .await
            })
            .await?;

        Ok(row.map(User::from))
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
