//! User lookups used to enrich notifications.

mod factory;
mod memory;
mod postgres;

pub use factory::create_user_directory;
pub use memory::InMemoryUserDirectory;
pub use postgres::PostgresUserDirectory;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::postgres::PostgresPoolError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    /// Profile first name, empty when the user never set one
    #[serde(default)]
    pub first_name: String,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, first_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            first_name: first_name.into(),
        }
    }

    /// Name shown in mails: the first name, or the e-mail when it is blank.
    pub fn display_name(&self) -> &str {
        this_or_that(&self.first_name, &self.email)
    }
}

/// `this` unless it is empty, otherwise `that`.
pub fn this_or_that<'a>(this: &'a str, that: &'a str) -> &'a str {
    if this.is_empty() {
        that
    } else {
        this
    }
}

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("User directory backend error: {0}")]
    Backend(#[from] PostgresPoolError),
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by e-mail. `Ok(None)` when no such user exists.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DirectoryError>;

    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_prefers_first_name() {
        let user = User::new("1", "ada@example.com", "Ada");
        assert_eq!(user.display_name(), "Ada");
    }

    #[test]
    fn test_display_name_falls_back_to_email() {
        let user = User::new("1", "ada@example.com", "");
        assert_eq!(user.display_name(), "ada@example.com");
    }
}
