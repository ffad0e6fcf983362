pub mod account;
pub mod response;
pub mod token;
pub mod user;
