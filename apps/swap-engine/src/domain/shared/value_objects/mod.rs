//! Shared value objects.

mod identifiers;
mod timestamp;
mod token;

pub use identifiers::{JobId, OrderId, PoolId, TransactionHash};
pub use timestamp::Timestamp;
pub use token::{TokenAmount, TokenMint};
