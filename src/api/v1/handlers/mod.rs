pub mod health;
pub mod principal;
