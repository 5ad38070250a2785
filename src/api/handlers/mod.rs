pub mod health;
pub mod login;
pub mod session;
pub mod status;
pub mod types;
