//! # roomcast-db
//!
//! Storage layer implementing the `roomcast-core` repository traits.
//!
//! ## Overview
//!
//! - Connection pool management and migrations (PostgreSQL via SQLx)
//! - Database models with SQLx `FromRow` derives
//! - Model → entity mappers
//! - `Pg*Repository` implementations
//! - [`MemoryStore`], a process-local implementation of every repository
//!
//! ## Usage
//!
//! ```rust,ignore
//! use roomcast_db::{create_pool, run_migrations, PoolConfig, PgRoomRepository};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = create_pool(&PoolConfig::from_env()).await?;
//!     run_migrations(&pool).await?;
//!     let rooms = PgRoomRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod mappers;
pub mod memory;
pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use memory::MemoryStore;
pub use pool::{create_pool, create_pool_from_env, run_migrations, PgPool, PoolConfig};
pub use repositories::{
    PgMessageRepository, PgPresenceRepository, PgRoomRepository, PgUserRepository,
};
