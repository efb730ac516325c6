use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::doi::normalize_doi;
use crate::models::{Publication, PublicationType, RankingHistoryEntry, ScoredPublication, UserRating};
use crate::ranking::store::{RankingStore, RankingTransaction, StoreError};

#[derive(Default)]
struct MemoryState {
    users: BTreeSet<i64>,
    publications: Vec<Publication>,
    scores: BTreeMap<i64, Vec<ScoredPublication>>,
    ratings: BTreeMap<i64, UserRating>,
    history: Vec<RankingHistoryEntry>,
    next_publication_id: i64,
    fail_reads: bool,
    fail_history_for: Option<i64>,
    commits: usize,
    load_attempts: usize,
}

/// Test gateway with failure injection. Transactions stage their writes and
/// apply them under one lock on commit.
#[derive(Default)]
pub struct InMemoryRankingStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRankingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_user(&self, user_id: i64) {
        self.lock().users.insert(user_id);
    }

    pub fn add_publication(
        &self,
        user_id: i64,
        doi: &str,
        journal: Option<&str>,
        year: Option<i32>,
    ) -> Result<i64, StoreError> {
        let doi = normalize_doi(doi);
        let mut state = self.lock();
        if state
            .publications
            .iter()
            .any(|p| p.user_id == user_id && p.doi == doi)
        {
            return Err(StoreError::DuplicatePublication { user_id, doi });
        }

        state.next_publication_id += 1;
        let id = state.next_publication_id;
        state.publications.push(Publication {
            id,
            user_id,
            title: format!("Publication {doi}"),
            doi,
            authors: Vec::new(),
            journal: journal.map(str::to_string),
            year,
            publication_type: PublicationType::JournalArticle,
            abstract_text: None,
            created_at: Utc::now(),
        });
        Ok(id)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn fail_history_for(&self, user_id: Option<i64>) {
        self.lock().fail_history_for = user_id;
    }

    pub fn rating(&self, user_id: i64) -> Option<UserRating> {
        self.lock().ratings.get(&user_id).cloned()
    }

    pub fn ratings(&self) -> Vec<UserRating> {
        self.lock().ratings.values().cloned().collect()
    }

    pub fn scores_for(&self, user_id: i64) -> Vec<ScoredPublication> {
        self.lock().scores.get(&user_id).cloned().unwrap_or_default()
    }

    pub fn history(&self) -> Vec<RankingHistoryEntry> {
        self.lock().history.clone()
    }

    pub fn commit_count(&self) -> usize {
        self.lock().commits
    }

    pub fn load_attempts(&self) -> usize {
        self.lock().load_attempts
    }
}

#[async_trait]
impl RankingStore for InMemoryRankingStore {
    async fn list_all_user_ids(&self) -> Result<Vec<i64>, StoreError> {
        let mut state = self.lock();
        state.load_attempts += 1;
        if state.fail_reads {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }
        Ok(state.users.iter().copied().collect())
    }

    async fn list_user_publications(
        &self,
        user_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Publication>, StoreError> {
        let state = self.lock();
        if state.fail_reads {
            return Err(StoreError::Unavailable("reads disabled".to_string()));
        }

        let mut publications: Vec<Publication> = state
            .publications
            .iter()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        publications.sort_by(|a, b| b.year.cmp(&a.year).then(b.id.cmp(&a.id)));

        Ok(publications
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(0))
            .take(usize::try_from(limit).unwrap_or(0))
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn RankingTransaction>, StoreError> {
        Ok(Box::new(MemoryTransaction {
            state: Arc::clone(&self.state),
            staged: Vec::new(),
        }))
    }
}

enum StagedWrite {
    Scores(i64, Vec<ScoredPublication>),
    Rating(UserRating),
    History(RankingHistoryEntry),
}

struct MemoryTransaction {
    state: Arc<Mutex<MemoryState>>,
    staged: Vec<StagedWrite>,
}

#[async_trait]
impl RankingTransaction for MemoryTransaction {
    async fn replace_publication_scores(
        &mut self,
        user_id: i64,
        scores: &[ScoredPublication],
        _computed_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.staged.push(StagedWrite::Scores(user_id, scores.to_vec()));
        Ok(())
    }

    async fn upsert_user_rating(&mut self, rating: &UserRating) -> Result<(), StoreError> {
        self.staged.push(StagedWrite::Rating(rating.clone()));
        Ok(())
    }

    async fn append_ranking_history(
        &mut self,
        entry: &RankingHistoryEntry,
    ) -> Result<(), StoreError> {
        let fail_for = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_history_for;
        if fail_for == Some(entry.user_id) {
            return Err(StoreError::Unavailable(format!(
                "history write rejected for user {}",
                entry.user_id
            )));
        }
        self.staged.push(StagedWrite::History(entry.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemoryTransaction { state, staged } = *self;
        let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
        for write in staged {
            match write {
                StagedWrite::Scores(user_id, scores) => {
                    state.scores.insert(user_id, scores);
                }
                StagedWrite::Rating(rating) => {
                    state.ratings.insert(rating.user_id, rating);
                }
                StagedWrite::History(entry) => state.history.push(entry),
            }
        }
        state.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_doi_rejected_per_user_but_shared_across_users() {
        let store = InMemoryRankingStore::new();
        store.add_publication(1, "https://doi.org/10.1/ABC", None, None).unwrap();

        let err = store.add_publication(1, "10.1/abc", None, None).unwrap_err();
        assert!(matches!(err, StoreError::DuplicatePublication { user_id: 1, .. }));
        assert!(store.add_publication(2, "10.1/abc", None, None).is_ok());
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = InMemoryRankingStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.upsert_user_rating(&UserRating {
            user_id: 1,
            score: 10,
            rank: Some(1),
            publication_count: 1,
            computed_at: Utc::now(),
        })
        .await
        .unwrap();
        drop(tx);

        assert!(store.rating(1).is_none());
        assert_eq!(store.commit_count(), 0);
    }
}
