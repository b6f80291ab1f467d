pub mod errors;
pub mod identity;
pub mod ledger;
pub mod lockout;
pub mod models;
pub mod ports;
pub mod service;
