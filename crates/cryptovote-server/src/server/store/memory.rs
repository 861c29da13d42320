use super::CryptoStore;
use cryptovote_core::{
    Error, Result,
    types::{Crypto, CryptoDraft, CryptoId, VoteCounter},
};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// In-process [`CryptoStore`] backed by an ordered map.
///
/// Records are keyed by [`CryptoId`], whose ordering follows creation time, so
/// iteration yields creation order. Every method completes under a single
/// lock acquisition, which makes counter updates atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<CryptoId, Crypto>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn not_found(id: &CryptoId) -> Error {
    Error::NotFound { id: id.to_string() }
}

#[tonic::async_trait]
impl CryptoStore for MemoryStore {
    async fn insert(&self, draft: CryptoDraft) -> Result<Crypto> {
        let mut records = self.records.write();
        if records.values().any(|c| c.name == draft.name) {
            return Err(Error::AlreadyExists { name: draft.name });
        }

        let crypto = Crypto::new(CryptoId::generate(), draft);
        records.insert(crypto.id, crypto.clone());
        Ok(crypto)
    }

    async fn find_by_id(&self, id: &CryptoId) -> Result<Crypto> {
        self.records
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }

    async fn find_all(&self) -> Result<Vec<Crypto>> {
        Ok(self.records.read().values().cloned().collect())
    }

    async fn update_details(&self, id: &CryptoId, draft: CryptoDraft) -> Result<Crypto> {
        let mut records = self.records.write();
        if records
            .values()
            .any(|c| c.id != *id && c.name == draft.name)
        {
            return Err(Error::AlreadyExists { name: draft.name });
        }

        let crypto = records.get_mut(id).ok_or_else(|| not_found(id))?;
        crypto.name = draft.name;
        crypto.description = draft.description;
        Ok(crypto.clone())
    }

    async fn delete(&self, id: &CryptoId) -> Result<()> {
        self.records
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    async fn update_counter(
        &self,
        id: &CryptoId,
        counter: VoteCounter,
        delta: i32,
    ) -> Result<Crypto> {
        let mut records = self.records.write();
        let crypto = records.get_mut(id).ok_or_else(|| not_found(id))?;
        crypto.apply_vote(counter, delta);
        Ok(crypto.clone())
    }
}
