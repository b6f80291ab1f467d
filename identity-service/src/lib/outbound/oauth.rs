pub mod google;

pub use google::GoogleOAuthClient;
pub use google::GoogleOAuthConfig;
