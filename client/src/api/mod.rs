pub mod backend;
pub mod types;

pub use backend::{HttpTokenExchange, TokenExchange};
