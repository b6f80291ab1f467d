pub mod oauth;
pub mod repositories;
pub mod state;
