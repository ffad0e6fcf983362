use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::server::db::UserRecord;
use crate::types::user::Role;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS user (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    member_since INTEGER NOT NULL,
    hash TEXT NOT NULL,
    salt TEXT NOT NULL,
    role TEXT NOT NULL
);
"#;

pub fn create_user_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(CREATE_TABLES)?;
    Ok(())
}

pub fn create_user(tx: &Transaction, user: &UserRecord) -> Result<i64> {
    tx.execute(
        "INSERT INTO user (first_name, last_name, member_since, hash, salt, role) VALUES (?, ?, ?, ?, ?, ?)",
        params![
            user.first_name,
            user.last_name,
            user.member_since,
            user.hash,
            user.salt,
            user.role.as_str(),
        ],
    )?;
    Ok(tx.last_insert_rowid())
}

pub fn get_user(tx: &Transaction, id: i64) -> Result<Option<UserRecord>> {
    let mut stmt = tx.prepare(
        "SELECT id, first_name, last_name, member_since, hash, salt, role FROM user WHERE id = ?",
    )?;
    let row = stmt
        .query_row(params![id], |row| {
            Ok((
                UserRecord {
                    id: row.get(0)?,
                    first_name: row.get(1)?,
                    last_name: row.get(2)?,
                    member_since: row.get(3)?,
                    hash: row.get(4)?,
                    salt: row.get(5)?,
                    role: Role::Standard,
                },
                row.get::<_, String>(6)?,
            ))
        })
        .optional()?;

    match row {
        Some((mut record, role)) => {
            record.role = role
                .parse()
                .with_context(|| format!("decode role of user {id}"))?;
            Ok(Some(record))
        }
        None => Ok(None),
    }
}

pub fn is_user_exists(tx: &Transaction, id: i64) -> Result<bool> {
    let mut stmt = tx.prepare("SELECT COUNT(*) FROM user WHERE id = ?")?;
    let count: i64 = stmt.query_row(params![id], |row| row.get(0))?;
    Ok(count > 0)
}

pub fn delete_user(tx: &Transaction, id: i64) -> Result<()> {
    tx.execute("DELETE FROM user WHERE id = ?", params![id])?;
    Ok(())
}
