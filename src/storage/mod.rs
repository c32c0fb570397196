// Staging and core stores: the trait seam plus its two implementations

pub mod in_memory;
pub mod postgres;
pub mod traits;

pub use in_memory::InMemoryStorage;
pub use postgres::PostgresStorage;
pub use traits::{CoreStore, StagingStore, Storage};
