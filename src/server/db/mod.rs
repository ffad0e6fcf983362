mod sqlite;

#[cfg(test)]
pub mod tests;

pub mod config;
pub mod factory;

use std::sync::Mutex;

use anyhow::{bail, Result};
use sqlite::{Sqlite, SqliteTransaction};

use crate::types::account::Account;
use crate::types::user::{Role, User};

/// Database connection trait that can create transactions
pub trait Connection<'a, T>
where
    T: Transaction + 'a,
{
    /// Creates a new transaction from the connection
    fn transaction(&'a mut self) -> Result<T>;
}

/// Database transaction trait that defines all database operations
pub trait Transaction {
    // User operations
    /// Creates a new user record, returns the assigned id
    fn create_user(&self, user: &UserRecord) -> Result<i64>;
    /// Retrieves a user by id, `None` if it does not exist
    fn get_user(&self, id: i64) -> Result<Option<UserRecord>>;
    /// Checks if a user exists
    fn is_user_exists(&self, id: i64) -> Result<bool>;
    /// Deletes a user by id
    fn delete_user(&self, id: i64) -> Result<()>;

    // Account operations
    /// Opens a new account with zero balance
    fn create_account(&self, owner_id: i64, created: u64) -> Result<Account>;
    /// Retrieves an account by number, `None` if it does not exist
    fn get_account(&self, number: i64) -> Result<Option<Account>>;
    /// Lists accounts, optionally only those of one owner
    fn list_accounts(&self, owner_id: Option<i64>) -> Result<Vec<Account>>;
    /// Overwrites the balance of an account
    fn update_account_balance(&self, number: i64, balance: f64) -> Result<()>;
    /// Deletes an account by number
    fn delete_account(&self, number: i64) -> Result<()>;
    /// Deletes every account of an owner, returns the count removed
    fn delete_user_accounts(&self, owner_id: i64) -> Result<usize>;

    /// Commits the transaction
    fn commit(self) -> Result<()>;
    /// Rolls back the transaction
    fn rollback(self) -> Result<()>;
}

/// Stored user, including password material
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub member_since: u64,
    /// Password hash
    pub hash: String,
    /// Salt used for password hashing
    pub salt: String,
    pub role: Role,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            first_name: record.first_name,
            last_name: record.last_name,
            member_since: record.member_since,
            role: record.role,
        }
    }
}

pub struct Database {
    conn: Mutex<UnionConnection>,
}

/// Enum representing different supported database connections
pub enum UnionConnection {
    Sqlite(Sqlite),
}

enum UnionTransaction<'a> {
    Sqlite(SqliteTransaction<'a>),
}

impl Database {
    pub fn new(conn: UnionConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    #[cfg(test)]
    pub fn new_test() -> Self {
        let conn = Sqlite::memory().unwrap();
        Self::new(UnionConnection::Sqlite(conn))
    }

    /// Executes `f` within a transaction.
    ///
    /// The transaction is committed if `f` succeeds and rolled back if it returns
    /// an error. Errors from commit or rollback themselves are returned as well.
    pub fn with_transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn Transaction) -> Result<T>,
    {
        let mut conn = match self.conn.lock() {
            Ok(conn) => conn,
            Err(e) => bail!("failed to lock database: {e:#}"),
        };
        let tx = conn.transaction()?;

        let result = f(&tx);

        if result.is_ok() {
            tx.commit()
        } else {
            tx.rollback()
        }?;

        result
    }
}

impl<'a> Connection<'a, UnionTransaction<'a>> for UnionConnection {
    fn transaction(&'a mut self) -> Result<UnionTransaction<'a>> {
        match self {
            UnionConnection::Sqlite(sqlite) => sqlite.transaction().map(UnionTransaction::Sqlite),
        }
    }
}

impl Transaction for UnionTransaction<'_> {
    fn create_user(&self, user: &UserRecord) -> Result<i64> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_user(user),
        }
    }

    fn get_user(&self, id: i64) -> Result<Option<UserRecord>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_user(id),
        }
    }

    fn is_user_exists(&self, id: i64) -> Result<bool> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.is_user_exists(id),
        }
    }

    fn delete_user(&self, id: i64) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_user(id),
        }
    }

    fn create_account(&self, owner_id: i64, created: u64) -> Result<Account> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.create_account(owner_id, created),
        }
    }

    fn get_account(&self, number: i64) -> Result<Option<Account>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.get_account(number),
        }
    }

    fn list_accounts(&self, owner_id: Option<i64>) -> Result<Vec<Account>> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.list_accounts(owner_id),
        }
    }

    fn update_account_balance(&self, number: i64, balance: f64) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.update_account_balance(number, balance),
        }
    }

    fn delete_account(&self, number: i64) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_account(number),
        }
    }

    fn delete_user_accounts(&self, owner_id: i64) -> Result<usize> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.delete_user_accounts(owner_id),
        }
    }

    fn commit(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.commit(),
        }
    }

    fn rollback(self) -> Result<()> {
        match self {
            UnionTransaction::Sqlite(tx) => tx.rollback(),
        }
    }
}
