pub mod orders;

pub use orders::{InMemoryOrderStore, JsonlOrderStore, OrderStore, StoreError};
