//! Credential store (`spec.md` §6, `/api/auth/*`).
//!
//! Out of scope per `spec.md` §1 ("authentication credential hashing" is an
//! external collaborator), but the wire contract the HTTP handlers need is
//! in scope, so this is the minimal `rusqlite`-backed table the spec names
//! directly: `users(id, username unique, password_hash, created_at,
//! last_login)`. `rusqlite` runs synchronously; callers run it via
//! `tokio::task::spawn_blocking` rather than awaiting it inline.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::rngs::OsRng;
use rusqlite::{params, Connection};

use crate::{Result, StoreError};

pub struct CredentialStore {
    conn: Connection,
}

impl CredentialStore {
    pub fn open(db_path: &std::path::Path) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_login TEXT
            )",
            [],
        )?;
        Ok(Self { conn })
    }

    pub fn exists(&self, username: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<()> {
        if self.exists(username)? {
            return Err(StoreError::UsernameTaken(username.to_string()));
        }
        let hash = hash_password(password)?;
        self.conn.execute(
            "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, datetime('now'))",
            params![username, hash],
        )?;
        Ok(())
    }

    pub fn login(&self, username: &str, password: &str) -> Result<()> {
        let hash: String = self
            .conn
            .query_row(
                "SELECT password_hash FROM users WHERE username = ?1",
                params![username],
                |row| row.get(0),
            )
            .map_err(|_| StoreError::InvalidCredentials)?;

        if !verify_password(password, &hash) {
            return Err(StoreError::InvalidCredentials);
        }

        self.conn.execute(
            "UPDATE users SET last_login = datetime('now') WHERE username = ?1",
            params![username],
        )?;
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| StoreError::Hash(e.to_string()))
}

fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_login_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(&dir.path().join("creds.sqlite3")).unwrap();

        store.register("alice", "hunter2").unwrap();
        assert!(store.exists("alice").unwrap());
        store.login("alice", "hunter2").unwrap();
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(&dir.path().join("creds.sqlite3")).unwrap();
        store.register("alice", "hunter2").unwrap();
        assert!(matches!(
            store.register("alice", "other"),
            Err(StoreError::UsernameTaken(_))
        ));
    }

    #[test]
    fn wrong_password_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open(&dir.path().join("creds.sqlite3")).unwrap();
        store.register("alice", "hunter2").unwrap();
        assert!(matches!(
            store.login("alice", "wrong"),
            Err(StoreError::InvalidCredentials)
        ));
    }
}
