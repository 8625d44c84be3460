pub mod guard;
pub mod jwt;
pub mod password;
pub mod session;
