//! User directory operations.

use crate::error::{DbError, Result};
use crate::UserDb;

impl UserDb {
    /// Look up a user's registered email address.
    ///
    /// Absence is an error: dispatch never invents a fallback address.
    pub async fn email_for_user(&self, userid: &str) -> Result<String> {
        let email: Option<String> = sqlx::query_scalar("SELECT email FROM users WHERE user = ?")
            .bind(userid)
            .fetch_optional(self.pool())
            .await?;
        email.ok_or_else(|| DbError::not_found(format!("No email for userid '{userid}'")))
    }

    /// Register or replace a user's email address.
    pub async fn set_user_email(&self, userid: &str, email: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (user, email) VALUES (?, ?)
            ON CONFLICT(user) DO UPDATE SET email = excluded.email
            "#,
        )
        .bind(userid)
        .bind(email)
        .execute(self.pool())
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{DbError, UserDb};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_email_lookup() {
        let tmp = TempDir::new().unwrap();
        let db = UserDb::open(tmp.path().join("user.db")).await.unwrap();

        db.set_user_email("alice", "alice@example.nl").await.unwrap();
        assert_eq!(
            db.email_for_user("alice").await.unwrap(),
            "alice@example.nl"
        );

        let err = db.email_for_user("bob").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound(_)));
    }
}
