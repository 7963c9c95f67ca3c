use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use rand::seq::SliceRandom;

use crate::error::{Error, Result};
use crate::model::{
    api::{identity::Identity, question::QuestionSpec},
    common::{QuestionId, VoteOption},
    db::{question::Question, vote::VoteRecord},
};

use super::{QuestionStore, VoteLedger};

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| Error::Storage(format!("{what} lock poisoned")))
}

/// In-memory question store.
#[derive(Debug, Default)]
pub struct MemoryQuestionStore {
    questions: Mutex<BTreeMap<QuestionId, Question>>,
}

impl MemoryQuestionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl QuestionStore for MemoryQuestionStore {
    async fn insert(&self, spec: QuestionSpec) -> Result<Question> {
        let question = Question::from_spec(spec);
        lock(&self.questions, "question store")?.insert(question.id.clone(), question.clone());
        Ok(question)
    }

    async fn sample_unanswered(
        &self,
        exclude: &HashSet<QuestionId>,
        limit: usize,
    ) -> Result<Vec<Question>> {
        let questions = lock(&self.questions, "question store")?;
        let candidates = questions
            .values()
            .filter(|question| !exclude.contains(&question.id))
            .collect::<Vec<_>>();
        let sample = candidates
            .choose_multiple(&mut rand::thread_rng(), limit)
            .map(|question| (*question).clone())
            .collect();
        Ok(sample)
    }

    async fn increment_vote(&self, id: &QuestionId, option: VoteOption) -> Result<u64> {
        // The whole read-modify-write happens under the lock.
        let mut questions = lock(&self.questions, "question store")?;
        match questions.get_mut(id) {
            Some(question) => {
                match option {
                    VoteOption::A => question.votes_a += 1,
                    VoteOption::B => question.votes_b += 1,
                }
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn get_by_id(&self, id: &QuestionId) -> Result<Option<Question>> {
        Ok(lock(&self.questions, "question store")?.get(id).cloned())
    }
}

/// In-memory vote ledger.
#[derive(Debug, Default)]
pub struct MemoryVoteLedger {
    votes: Mutex<Vec<VoteRecord>>,
}

impl MemoryVoteLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl VoteLedger for MemoryVoteLedger {
    async fn has_voted(&self, question_id: &QuestionId, identity: &Identity) -> Result<bool> {
        let votes = lock(&self.votes, "vote ledger")?;
        Ok(votes
            .iter()
            .any(|vote| vote.question_id == *question_id && vote.cast_by(identity)))
    }

    async fn record_vote(&self, vote: VoteRecord) -> Result<()> {
        lock(&self.votes, "vote ledger")?.push(vote);
        Ok(())
    }

    async fn voted_question_ids(&self, identity: &Identity) -> Result<HashSet<QuestionId>> {
        let votes = lock(&self.votes, "vote ledger")?;
        Ok(votes
            .iter()
            .filter(|vote| vote.cast_by(identity))
            .map(|vote| vote.question_id.clone())
            .collect())
    }

    async fn count_votes(&self, question_id: &QuestionId) -> Result<u64> {
        let votes = lock(&self.votes, "vote ledger")?;
        Ok(votes
            .iter()
            .filter(|vote| vote.question_id == *question_id)
            .count() as u64)
    }
}
