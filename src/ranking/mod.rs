pub mod engine;
pub mod journal;
#[cfg(test)]
pub mod memory;
pub mod scorer;
pub mod store;

pub use engine::{DEFAULT_PUBLICATION_LIMIT, MAX_PUBLICATION_LIMIT, RankingEngine, RankingError};
pub use store::{MySqlRankingStore, RankingStore, StoreError};
