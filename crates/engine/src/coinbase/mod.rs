pub mod auth;
pub mod rest;

pub use auth::RequestSigner;
pub use rest::CoinbaseClient;
