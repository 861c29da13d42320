//! The entity store contract.
//!
//! The service treats persistence as an external collaborator behind
//! [`CryptoStore`]. Durability and consistency guarantees belong to the
//! implementation; the only requirement the vote path places on it is that
//! [`CryptoStore::update_counter`] is atomic and returns the post-update
//! record.
//!
//! [`memory::MemoryStore`] is the implementation the server ships with.

pub mod memory;

use cryptovote_core::{
    Result,
    types::{Crypto, CryptoDraft, CryptoId, VoteCounter},
};

pub use memory::MemoryStore;

#[tonic::async_trait]
pub trait CryptoStore: Send + Sync + 'static {
    /// Stores a new record with zeroed counters.
    ///
    /// Fails with `AlreadyExists` if another record has the same name.
    async fn insert(&self, draft: CryptoDraft) -> Result<Crypto>;

    /// Fails with `NotFound` if no record has this id.
    async fn find_by_id(&self, id: &CryptoId) -> Result<Crypto>;

    /// Every record, in creation order.
    async fn find_all(&self) -> Result<Vec<Crypto>>;

    /// Replaces name and description and returns the updated record.
    async fn update_details(&self, id: &CryptoId, draft: CryptoDraft) -> Result<Crypto>;

    /// Fails with `NotFound` if no record has this id.
    async fn delete(&self, id: &CryptoId) -> Result<()>;

    /// Atomically adds `delta` to one counter and returns the updated record.
    async fn update_counter(
        &self,
        id: &CryptoId,
        counter: VoteCounter,
        delta: i32,
    ) -> Result<Crypto>;
}
