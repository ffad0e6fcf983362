mod account;
mod user;

pub mod config;
pub mod factory;

use std::path::Path;

use anyhow::Result;
use rusqlite::Connection as RawConnection;
use rusqlite::Transaction as RawTransaction;

use crate::types::account::Account;

use super::{Connection, Transaction, UserRecord};

/// SQLite-based database implementation, suited for single-node deployments.
/// Supports both file-based and in-memory databases.
pub struct Sqlite {
    conn: RawConnection,
}

pub struct SqliteTransaction<'a> {
    tx: RawTransaction<'a>,
}

impl Sqlite {
    /// Opens a SQLite database file, creating it if missing, and initializes
    /// all required tables.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = RawConnection::open(path)?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    /// Creates a new in-memory database. Content is lost when the process exits.
    pub fn memory() -> Result<Self> {
        let conn = RawConnection::open_in_memory()?;
        Self::init_tables(&conn)?;
        Ok(Self { conn })
    }

    fn init_tables(db: &RawConnection) -> Result<()> {
        user::create_user_tables(db)?;
        account::create_account_tables(db)?;
        Ok(())
    }
}

impl<'a> Connection<'a, SqliteTransaction<'a>> for Sqlite {
    fn transaction(&'a mut self) -> Result<SqliteTransaction<'a>> {
        let tx = self.conn.transaction()?;
        Ok(SqliteTransaction { tx })
    }
}

impl Transaction for SqliteTransaction<'_> {
    fn create_user(&self, user: &UserRecord) -> Result<i64> {
        user::create_user(&self.tx, user)
    }

    fn get_user(&self, id: i64) -> Result<Option<UserRecord>> {
        user::get_user(&self.tx, id)
    }

    fn is_user_exists(&self, id: i64) -> Result<bool> {
        user::is_user_exists(&self.tx, id)
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        user::delete_user(&self.tx, id)
    }

    fn create_account(&self, owner_id: i64, created: u64) -> Result<Account> {
        account::create_account(&self.tx, owner_id, created)
    }

    fn get_account(&self, number: i64) -> Result<Option<Account>> {
        account::get_account(&self.tx, number)
    }

    fn list_accounts(&self, owner_id: Option<i64>) -> Result<Vec<Account>> {
        account::list_accounts(&self.tx, owner_id)
    }

    fn update_account_balance(&self, number: i64, balance: f64) -> Result<()> {
        account::update_account_balance(&self.tx, number, balance)
    }

    fn delete_account(&self, number: i64) -> Result<()> {
        account::delete_account(&self.tx, number)
    }

    fn delete_user_accounts(&self, owner_id: i64) -> Result<usize> {
        account::delete_user_accounts(&self.tx, owner_id)
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }
}
