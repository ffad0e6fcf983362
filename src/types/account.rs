use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "accountNumber")]
    pub number: i64,

    pub balance: f64,

    #[serde(rename = "ownerID")]
    pub owner_id: i64,

    pub created: u64,
}
