//! Data Transfer Objects (DTOs)
//!
//! DTOs are used for API boundaries and use case inputs/outputs.

mod swap_dto;

pub use swap_dto::{OrderDto, SubmitSwapRequestDto, SubmitSwapResponseDto};
