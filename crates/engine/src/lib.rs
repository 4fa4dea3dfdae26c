pub mod coinbase;
pub mod executor;
pub mod feed;
pub mod lifecycle;

pub use coinbase::{CoinbaseClient, RequestSigner};
pub use executor::{OrderExecutor, OrderOutcome};
pub use feed::CandleFeed;
pub use lifecycle::{Engine, Sleeper, TickReport, TokioSleeper};
