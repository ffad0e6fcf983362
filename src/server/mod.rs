mod handlers;
mod response;

pub mod authn;
pub mod authz;
pub mod config;
pub mod db;
pub mod factory;
pub mod restful;
