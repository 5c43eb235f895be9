pub mod password;
pub mod setup;
