//! Infrastructure Layer
//!
//! This module contains all adapters (implementations) for the ports defined
//! in the application and domain layers. Following hexagonal architecture:
//!
//! - **Driven Adapters (Outbound)**: Implement ports for external systems
//!   - `persistence/`: Order storage (in-memory)
//!   - `queue/`: Job queue engine and worker pool (in-process)
//!   - `venues/`: DEX venue adapters (simulated constant-product pools)
//!
//! - **Driver Adapters (Inbound)**: Expose application to external world
//!   - `http/`: REST intake and progress WebSocket
//!
//! - **Wiring**
//!   - `config/`: Dependency injection container

pub mod config;
pub mod http;
pub mod persistence;
pub mod queue;
pub mod venues;
