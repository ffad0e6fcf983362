use anyhow::Result;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};

use crate::types::account::Account;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS account (
    number INTEGER PRIMARY KEY AUTOINCREMENT,
    balance REAL NOT NULL,
    owner_id INTEGER NOT NULL,
    created INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_account_owner ON account(owner_id);
"#;

pub fn create_account_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

pub fn create_account(tx: &Transaction, owner_id: i64, created: u64) -> Result<Account> {
    tx.execute(
        "INSERT INTO account (balance, owner_id, created) VALUES (0, ?, ?)",
        params![owner_id, created],
    )?;
    Ok(Account {
        number: tx.last_insert_rowid(),
        balance: 0.0,
        owner_id,
        created,
    })
}

pub fn get_account(tx: &Transaction, number: i64) -> Result<Option<Account>> {
    let mut stmt =
        tx.prepare("SELECT number, balance, owner_id, created FROM account WHERE number = ?")?;
    let account = stmt.query_row(params![number], read_account).optional()?;
    Ok(account)
}

pub fn list_accounts(tx: &Transaction, owner_id: Option<i64>) -> Result<Vec<Account>> {
    let mut sql = String::from("SELECT number, balance, owner_id, created FROM account");
    let params = if let Some(owner_id) = owner_id {
        sql.push_str(" WHERE owner_id = ?");
        vec![Value::Integer(owner_id)]
    } else {
        vec![]
    };
    sql.push_str(" ORDER BY number");

    let mut stmt = tx.prepare(&sql)?;
    let accounts = stmt
        .query_map(params_from_iter(params), read_account)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(accounts)
}

pub fn update_account_balance(tx: &Transaction, number: i64, balance: f64) -> Result<()> {
    tx.execute(
        "UPDATE account SET balance = ? WHERE number = ?",
        params![balance, number],
    )?;
    Ok(())
}

pub fn delete_account(tx: &Transaction, number: i64) -> Result<()> {
    tx.execute("DELETE FROM account WHERE number = ?", params![number])?;
    Ok(())
}

pub fn delete_user_accounts(tx: &Transaction, owner_id: i64) -> Result<usize> {
    let count = tx.execute("DELETE FROM account WHERE owner_id = ?", params![owner_id])?;
    Ok(count)
}

fn read_account(row: &Row) -> rusqlite::Result<Account> {
    Ok(Account {
        number: row.get(0)?,
        balance: row.get(1)?,
        owner_id: row.get(2)?,
        created: row.get(3)?,
    })
}
