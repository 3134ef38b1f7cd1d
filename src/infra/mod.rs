//! Infrastructure layer - External systems integration
//!
//! Database connection, migrations, repositories, the unit of work and
//! the cache backends.

pub mod cache;
pub mod db;
pub mod repositories;
pub mod unit_of_work;

pub use cache::{build_cache, CacheBackend, FileCache, MemoryCache, RedisCache};
pub use db::{Database, Migrator};
pub use repositories::{
    FileRepository, FileStore, ItemRepository, ItemStore, TokenRepository, TokenStore,
    UserRepository, UserStore,
};
pub use unit_of_work::{
    Persistence, TransactionContext, TxFuture, TxTokenRepository, TxUserRepository, UnitOfWork,
};
