//! SQLite-backed account existence lookup.

use crate::local::AccountLookup;
use hypergate_db::DbPool;
use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

/// Answers "does this user have a local account" from the `user_accounts`
/// table. A row in the nil scope matches any scope.
#[derive(Clone)]
pub struct SqlAccountLookup {
    pool: DbPool,
}

impl SqlAccountLookup {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl AccountLookup for SqlAccountLookup {
    fn account_exists(&self, scope_id: Uuid, user_id: Uuid) -> bool {
        let Ok(conn) = self.pool.get() else {
            tracing::warn!("account lookup could not get a database connection");
            return false;
        };
        let found = conn
            .query_row(
                "SELECT 1 FROM user_accounts
                 WHERE user_id = ?1 AND scope_id IN (?2, ?3)",
                params![
                    user_id.to_string(),
                    scope_id.to_string(),
                    Uuid::nil().to_string()
                ],
                |_| Ok(()),
            )
            .optional();
        match found {
            Ok(row) => row.is_some(),
            Err(e) => {
                tracing::warn!(user = %user_id, error = %e, "account lookup failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hypergate_db::{create_pool, run_migrations, DbRuntimeSettings};

    fn test_lookup() -> (SqlAccountLookup, DbPool, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let db_path = dir.path().join("accounts.db");
        let pool = create_pool(db_path.to_str().unwrap(), DbRuntimeSettings::default())
            .expect("pool creation should succeed");
        run_migrations(&pool.get().unwrap()).expect("migrations should succeed");
        (SqlAccountLookup::new(pool.clone()), pool, dir)
    }

    fn insert_account(pool: &DbPool, scope_id: Uuid, user_id: Uuid) {
        pool.get()
            .unwrap()
            .execute(
                "INSERT INTO user_accounts (user_id, scope_id, first_name, last_name)
                 VALUES (?1, ?2, 'Test', 'User')",
                params![user_id.to_string(), scope_id.to_string()],
            )
            .unwrap();
    }

    #[test]
    fn known_account_is_found() {
        let (lookup, pool, _guard) = test_lookup();
        let user = Uuid::new_v4();
        insert_account(&pool, Uuid::nil(), user);

        assert!(lookup.account_exists(Uuid::nil(), user));
        assert!(!lookup.account_exists(Uuid::nil(), Uuid::new_v4()));
    }

    #[test]
    fn nil_scope_account_matches_any_scope() {
        let (lookup, pool, _guard) = test_lookup();
        let user = Uuid::new_v4();
        insert_account(&pool, Uuid::nil(), user);

        assert!(lookup.account_exists(Uuid::new_v4(), user));
    }

    #[test]
    fn scoped_account_does_not_leak_across_scopes() {
        let (lookup, pool, _guard) = test_lookup();
        let user = Uuid::new_v4();
        let scope = Uuid::new_v4();
        insert_account(&pool, scope, user);

        assert!(lookup.account_exists(scope, user));
        assert!(!lookup.account_exists(Uuid::new_v4(), user));
    }
}
