//! Order aggregate.

mod order;

pub use order::{
    CreateOrderCommand, MAX_TOKEN_DECIMALS, Order, ReconstitutedOrderParams, SwapCompletion,
};
