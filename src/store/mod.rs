//! Storage backends for questions and the vote ledger.
//!
//! Services only ever see the [`QuestionStore`] and [`VoteLedger`] traits,
//! bundled together as [`Stores`]. The MongoDB backend is used in production;
//! the in-memory backend backs the tests.

use std::collections::HashSet;
use std::sync::Arc;

use mongodb::Database;

use crate::error::Result;
use crate::model::{
    api::{identity::Identity, question::QuestionSpec},
    common::{QuestionId, VoteOption},
    db::{question::Question, vote::VoteRecord},
};

pub mod memory;
pub mod mongo;

pub use memory::{MemoryQuestionStore, MemoryVoteLedger};
pub use mongo::{MongoQuestionStore, MongoVoteLedger};

/// Holds question records and serves random batches of them.
#[rocket::async_trait]
pub trait QuestionStore: Send + Sync {
    /// Persist a new question with a fresh ID and both tallies at zero.
    async fn insert(&self, spec: QuestionSpec) -> Result<Question>;

    /// A random sample of up to `limit` questions whose IDs are not in `exclude`.
    async fn sample_unanswered(
        &self,
        exclude: &HashSet<QuestionId>,
        limit: usize,
    ) -> Result<Vec<Question>>;

    /// Atomically add one to the tally for `option`.
    /// Returns the number of questions matched: 0 or 1.
    async fn increment_vote(&self, id: &QuestionId, option: VoteOption) -> Result<u64>;

    async fn get_by_id(&self, id: &QuestionId) -> Result<Option<Question>>;
}

/// The append-only record of individual votes.
#[rocket::async_trait]
pub trait VoteLedger: Send + Sync {
    /// Has this identity (by origin or by session) already voted on the question?
    async fn has_voted(&self, question_id: &QuestionId, identity: &Identity) -> Result<bool>;

    async fn record_vote(&self, vote: VoteRecord) -> Result<()>;

    /// Every question this identity (by origin or by session) has voted on.
    async fn voted_question_ids(&self, identity: &Identity) -> Result<HashSet<QuestionId>>;

    /// Number of votes recorded against a question, regardless of voter.
    async fn count_votes(&self, question_id: &QuestionId) -> Result<u64>;
}

/// The storage handles shared by every request handler.
#[derive(Clone)]
pub struct Stores {
    pub questions: Arc<dyn QuestionStore>,
    pub ledger: Arc<dyn VoteLedger>,
}

impl Stores {
    pub fn new(questions: Arc<dyn QuestionStore>, ledger: Arc<dyn VoteLedger>) -> Self {
        Self { questions, ledger }
    }

    /// Stores backed by the `questions` and `votes` collections of `db`.
    pub fn mongo(db: &Database) -> Self {
        Self::new(
            Arc::new(MongoQuestionStore::new(db)),
            Arc::new(MongoVoteLedger::new(db)),
        )
    }

    /// Fresh, empty in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryQuestionStore::new()),
            Arc::new(MemoryVoteLedger::new()),
        )
    }
}
