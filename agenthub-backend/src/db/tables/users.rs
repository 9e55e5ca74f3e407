//! User account and auth session database operations

use chrono::{DateTime, Duration, Utc};
use rusqlite::Result as SqliteResult;

use super::super::Database;
use crate::models::{AuthSession, User};

impl Database {
    // ============================================
    // User methods
    // ============================================

    pub fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        full_name: &str,
    ) -> SqliteResult<User> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        conn.execute(
            "INSERT INTO users (email, password_hash, full_name, profile_updated_at, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?4, ?4)",
            rusqlite::params![email, password_hash, full_name, &now_str],
        )?;

        let id = conn.last_insert_rowid();

        Ok(User {
            id,
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            full_name: full_name.to_string(),
            profile_image_path: None,
            profile_updated_at: now,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn get_user(&self, id: i64) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, full_name, profile_image_path, profile_updated_at,
             is_active, created_at, updated_at
             FROM users WHERE id = ?1",
        )?;
        let user = stmt.query_row([id], |row| Self::row_to_user(row)).ok();
        Ok(user)
    }

    pub fn get_user_by_email(&self, email: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, email, password_hash, full_name, profile_image_path, profile_updated_at,
             is_active, created_at, updated_at
             FROM users WHERE email = ?1",
        )?;
        let user = stmt.query_row([email], |row| Self::row_to_user(row)).ok();
        Ok(user)
    }

    pub fn email_exists(&self, email: &str) -> SqliteResult<bool> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE email = ?1",
            [email],
            |row| row.get::<_, i64>(0),
        )
        .map(|c| c > 0)
    }

    /// Update email and full name. Returns the fresh row.
    pub fn update_user_profile(
        &self,
        id: i64,
        email: &str,
        full_name: &str,
    ) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE users SET email = ?1, full_name = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![email, full_name, &now, id],
        )?;
        drop(conn);
        self.get_user(id)
    }

    /// Set a new profile image path and bump profile_updated_at.
    pub fn update_user_profile_image(&self, id: i64, path: &str) -> SqliteResult<Option<User>> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE users SET profile_image_path = ?1, profile_updated_at = ?2, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![path, &now, id],
        )?;
        drop(conn);
        self.get_user(id)
    }

    /// Hard delete; cascades through agents, conversations and subscriptions.
    pub fn delete_user(&self, id: i64) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        let profile_updated_str: String = row.get(5)?;
        let created_at_str: String = row.get(7)?;
        let updated_at_str: String = row.get(8)?;

        Ok(User {
            id: row.get(0)?,
            email: row.get(1)?,
            password_hash: row.get(2)?,
            full_name: row.get(3)?,
            profile_image_path: row.get(4)?,
            profile_updated_at: DateTime::parse_from_rfc3339(&profile_updated_str)
                .unwrap()
                .with_timezone(&Utc),
            is_active: row.get::<_, i32>(6)? != 0,
            created_at: DateTime::parse_from_rfc3339(&created_at_str)
                .unwrap()
                .with_timezone(&Utc),
            updated_at: DateTime::parse_from_rfc3339(&updated_at_str)
                .unwrap()
                .with_timezone(&Utc),
        })
    }

    // ============================================
    // Auth session methods
    // ============================================

    /// Create a session for a user with the given lifetime.
    pub fn create_session(
        &self,
        user_id: i64,
        token: &str,
        ttl_hours: i64,
    ) -> SqliteResult<AuthSession> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let expires_at = now + Duration::hours(ttl_hours);

        conn.execute(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![token, user_id, now.to_rfc3339(), expires_at.to_rfc3339()],
        )?;

        Ok(AuthSession {
            id: conn.last_insert_rowid(),
            token: token.to_string(),
            user_id,
            created_at: now,
            expires_at,
        })
    }

    /// Look up a session by token; expired sessions are removed and None is returned.
    pub fn validate_session(&self, token: &str) -> SqliteResult<Option<AuthSession>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, token, user_id, created_at, expires_at FROM auth_sessions WHERE token = ?1",
        )?;
        let session = stmt
            .query_row([token], |row| {
                let created_at_str: String = row.get(3)?;
                let expires_at_str: String = row.get(4)?;
                Ok(AuthSession {
                    id: row.get(0)?,
                    token: row.get(1)?,
                    user_id: row.get(2)?,
                    created_at: DateTime::parse_from_rfc3339(&created_at_str)
                        .unwrap()
                        .with_timezone(&Utc),
                    expires_at: DateTime::parse_from_rfc3339(&expires_at_str)
                        .unwrap()
                        .with_timezone(&Utc),
                })
            })
            .ok();

        let Some(session) = session else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            conn.execute("DELETE FROM auth_sessions WHERE id = ?1", [session.id])?;
            return Ok(None);
        }

        Ok(Some(session))
    }

    pub fn delete_session(&self, token: &str) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM auth_sessions WHERE token = ?1", [token])?;
        Ok(())
    }

    /// Drop every session belonging to a user (logout-everywhere, account deletion).
    pub fn delete_user_sessions(&self, user_id: i64) -> SqliteResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM auth_sessions WHERE user_id = ?1", [user_id])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db");
        let db = Database::new(path.to_str().unwrap()).unwrap();
        (db, dir)
    }

    #[test]
    fn test_user_round_trip() {
        let (db, _dir) = test_db();
        let user = db.create_user("a@b.com", "hash", "Ada B").unwrap();
        assert_eq!(user.email, "a@b.com");

        let fetched = db.get_user_by_email("a@b.com").unwrap().unwrap();
        assert_eq!(fetched.id, user.id);
        assert_eq!(fetched.full_name, "Ada B");
        assert!(db.email_exists("a@b.com").unwrap());
        assert!(!db.email_exists("other@b.com").unwrap());

        let updated = db
            .update_user_profile(user.id, "ada@b.com", "Ada Byron")
            .unwrap()
            .unwrap();
        assert_eq!(updated.email, "ada@b.com");
        assert_eq!(updated.full_name, "Ada Byron");

        db.delete_user(user.id).unwrap();
        assert!(db.get_user(user.id).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (db, _dir) = test_db();
        db.create_user("a@b.com", "hash", "First").unwrap();
        assert!(db.create_user("a@b.com", "hash", "Second").is_err());
    }

    #[test]
    fn test_session_validate_and_logout() {
        let (db, _dir) = test_db();
        let user = db.create_user("a@b.com", "hash", "Ada").unwrap();
        let session = db.create_session(user.id, "tok-1", 24).unwrap();
        assert_eq!(session.user_id, user.id);

        let found = db.validate_session("tok-1").unwrap().unwrap();
        assert_eq!(found.user_id, user.id);

        db.delete_session("tok-1").unwrap();
        assert!(db.validate_session("tok-1").unwrap().is_none());
    }

    #[test]
    fn test_expired_session_is_purged() {
        let (db, _dir) = test_db();
        let user = db.create_user("a@b.com", "hash", "Ada").unwrap();
        db.create_session(user.id, "tok-old", -1).unwrap();
        assert!(db.validate_session("tok-old").unwrap().is_none());
        // A second lookup should also miss: the row is gone.
        assert!(db.validate_session("tok-old").unwrap().is_none());
    }
}
