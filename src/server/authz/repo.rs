use anyhow::Result;

use crate::server::db::Database;
use crate::types::user::Identity;

/// Lookups the authorization gate needs from storage.
pub trait Repository: Send + Sync {
    /// Loads the identity of a user, `None` if there is no such user.
    fn get_user_by_id(&self, id: i64) -> Result<Option<Identity>>;

    /// Resolves the user owning an account, `None` if there is no such account.
    fn get_account_owner(&self, number: i64) -> Result<Option<i64>>;
}

impl Repository for Database {
    fn get_user_by_id(&self, id: i64) -> Result<Option<Identity>> {
        self.with_transaction(|tx| {
            let record = tx.get_user(id)?;
            Ok(record.map(|record| Identity {
                id: record.id,
                role: record.role,
            }))
        })
    }

    fn get_account_owner(&self, number: i64) -> Result<Option<i64>> {
        self.with_transaction(|tx| {
            let account = tx.get_account(number)?;
            Ok(account.map(|account| account.owner_id))
        })
    }
}
