
use anyhow::{bail, Result};

use crate::types::user::Role;

use super::{Database, UserRecord};

pub fn run_all_tests(db: &Database) {
    user::run_user_tests(db);
    account::run_account_tests(db);

    test_rollback(db);
}

pub fn mock_user(first_name: &str, role: Role) -> UserRecord {
    UserRecord {
        id: 0,
        first_name: String::from(first_name),
        last_name: String::from("Tester"),
        member_since: 1000,
        hash: format!("hash_{first_name}"),
        salt: format!("salt_{first_name}"),
        role,
    }
}

fn test_rollback(db: &Database) {
    let mut created = 0;
    let result: Result<()> = db.with_transaction(|tx| {
        created = tx.create_user(&mock_user("ghost", Role::Standard))?;
        bail!("rollback");
    });
    assert!(result.is_err());
    assert!(created > 0);

    db.with_transaction(|tx| {
        assert!(!tx.is_user_exists(created)?);
        assert!(tx.get_user(created)?.is_none());
        Ok(())
    })
    .unwrap();
}
