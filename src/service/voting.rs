use std::fmt::{Display, Formatter};

use chrono::Utc;
use log::{debug, error};

use crate::error::{Error, Result};
use crate::model::{
    api::identity::Identity,
    common::{QuestionId, VoteOption},
    db::{question::Question, vote::VoteRecord},
};
use crate::store::Stores;

/// Progress of a single vote attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteStage {
    Start,
    DuplicateChecked,
    TallyUpdated,
    VoteRecorded,
    Done,
}

impl Display for VoteStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Start => "start",
            Self::DuplicateChecked => "duplicate-checked",
            Self::TallyUpdated => "tally-updated",
            Self::VoteRecorded => "vote-recorded",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Accepts votes, enforcing at most one vote per identity per question.
///
/// The steps of a vote are independent storage operations with no
/// cross-collection transaction:
///
/// 1. validate the option;
/// 2. check the ledger for an earlier vote by this identity;
/// 3. atomically increment the tally;
/// 4. record the vote in the ledger;
/// 5. re-read the question.
///
/// Two consequences are known and accepted. Two near-simultaneous requests
/// from the same identity can both pass step 2 and both be counted. If step 4
/// fails after step 3, the tally is left one higher than the ledger; this is
/// logged and reported as a storage failure, not rolled back.
pub struct VotingService {
    stores: Stores,
}

impl VotingService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Cast a vote for `option` on the given question, returning the
    /// question with its updated tallies.
    pub async fn cast_vote(
        &self,
        question_id: &QuestionId,
        option: &str,
        identity: &Identity,
    ) -> Result<Question> {
        let mut stage = VoteStage::Start;
        let option: VoteOption = option.parse()?;

        if self.stores.ledger.has_voted(question_id, identity).await? {
            debug!("Rejecting repeat vote on {question_id} from {identity:?}");
            return Err(Error::AlreadyVoted(question_id.clone()));
        }
        stage = self.advance(question_id, stage, VoteStage::DuplicateChecked);

        if self.stores.questions.increment_vote(question_id, option).await? == 0 {
            return Err(Error::question_not_found(question_id));
        }
        stage = self.advance(question_id, stage, VoteStage::TallyUpdated);

        let vote = VoteRecord::new(question_id.clone(), identity, option, Utc::now());
        if let Err(e) = self.stores.ledger.record_vote(vote).await {
            error!(
                "Tally for question {question_id} (option {option}) was incremented \
                 but the vote by {identity:?} could not be recorded: {e}"
            );
            return Err(e);
        }
        stage = self.advance(question_id, stage, VoteStage::VoteRecorded);

        let question = self
            .stores
            .questions
            .get_by_id(question_id)
            .await?
            .ok_or_else(|| Error::question_not_found(question_id))?;
        self.advance(question_id, stage, VoteStage::Done);

        Ok(question)
    }

    fn advance(&self, question_id: &QuestionId, from: VoteStage, to: VoteStage) -> VoteStage {
        debug!("Vote on {question_id}: {from} -> {to}");
        to
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use rocket::tokio::sync::Barrier;

    use super::*;
    use crate::model::api::question::QuestionSpec;
    use crate::store::{MemoryQuestionStore, MemoryVoteLedger, QuestionStore, VoteLedger};

    fn identity(origin: &str, session: &str) -> Identity {
        Identity::new(origin.to_string(), session)
    }

    async fn stores_with_question() -> (Stores, Question) {
        let stores = Stores::in_memory();
        let question = stores.questions.insert(QuestionSpec::example()).await.unwrap();
        (stores, question)
    }

    async fn tallies(stores: &Stores, id: &QuestionId) -> (u64, u64) {
        let question = stores.questions.get_by_id(id).await.unwrap().unwrap();
        (question.votes(VoteOption::A), question.votes(VoteOption::B))
    }

    #[rocket::async_test]
    async fn valid_vote_increments_exactly_one_tally() {
        let (stores, question) = stores_with_question().await;
        let voting = VotingService::new(stores.clone());

        let updated = voting
            .cast_vote(&question.id, "B", &identity("10.0.0.1", "x"))
            .await
            .unwrap();

        assert_eq!((updated.votes_a, updated.votes_b), (0, 1));
        assert_eq!(stores.ledger.count_votes(&question.id).await.unwrap(), 1);
    }

    #[rocket::async_test]
    async fn repeat_vote_is_rejected_without_side_effects() {
        let (stores, question) = stores_with_question().await;
        let voting = VotingService::new(stores.clone());
        let voter = identity("10.0.0.1", "x");

        voting.cast_vote(&question.id, "A", &voter).await.unwrap();
        let err = voting.cast_vote(&question.id, "B", &voter).await.unwrap_err();

        assert!(matches!(err, Error::AlreadyVoted(ref id) if *id == question.id));
        assert_eq!(tallies(&stores, &question.id).await, (1, 0));
        assert_eq!(stores.ledger.count_votes(&question.id).await.unwrap(), 1);
    }

    #[rocket::async_test]
    async fn either_origin_or_session_blocks_a_repeat() {
        let (stores, question) = stores_with_question().await;
        let voting = VotingService::new(stores.clone());
        voting
            .cast_vote(&question.id, "A", &identity("10.0.0.1", "x"))
            .await
            .unwrap();

        // Shared IP, fresh session.
        let err = voting
            .cast_vote(&question.id, "A", &identity("10.0.0.1", "y"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted(_)));

        // Same session, new IP.
        let err = voting
            .cast_vote(&question.id, "A", &identity("10.0.0.2", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted(_)));

        // Different on both counts.
        voting
            .cast_vote(&question.id, "A", &identity("10.0.0.2", "y"))
            .await
            .unwrap();
        assert_eq!(tallies(&stores, &question.id).await, (2, 0));
    }

    #[rocket::async_test]
    async fn invalid_option_never_mutates() {
        let (stores, question) = stores_with_question().await;
        let voting = VotingService::new(stores.clone());

        for bad in ["C", "a", "", "AB"] {
            let err = voting
                .cast_vote(&question.id, bad, &identity("10.0.0.1", "x"))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidOption(_)));
        }

        assert_eq!(tallies(&stores, &question.id).await, (0, 0));
        assert_eq!(stores.ledger.count_votes(&question.id).await.unwrap(), 0);
    }

    #[rocket::async_test]
    async fn invalid_option_is_reported_before_duplicates() {
        let (stores, question) = stores_with_question().await;
        let voting = VotingService::new(stores);
        let voter = identity("10.0.0.1", "x");
        voting.cast_vote(&question.id, "A", &voter).await.unwrap();

        let err = voting.cast_vote(&question.id, "C", &voter).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOption(_)));
    }

    #[rocket::async_test]
    async fn unknown_question_writes_no_ledger_entry() {
        let stores = Stores::in_memory();
        let voting = VotingService::new(stores.clone());
        let missing = QuestionId::new();
        let voter = identity("10.0.0.1", "x");

        let err = voting.cast_vote(&missing, "A", &voter).await.unwrap_err();

        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(stores.ledger.count_votes(&missing).await.unwrap(), 0);
        assert!(stores.ledger.voted_question_ids(&voter).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn concurrent_votes_are_all_counted() {
        let (stores, question) = stores_with_question().await;
        let voting = VotingService::new(stores.clone());
        let voters = (0..50)
            .map(|n| identity(&format!("10.0.1.{n}"), &format!("session-{n}")))
            .collect::<Vec<_>>();

        let votes = voters.iter().enumerate().map(|(n, voter)| {
            let option = if n % 2 == 0 { "A" } else { "B" };
            voting.cast_vote(&question.id, option, voter)
        });
        let results = rocket::futures::future::join_all(votes).await;

        assert!(results.iter().all(|result| result.is_ok()));
        assert_eq!(tallies(&stores, &question.id).await, (25, 25));
        assert_eq!(stores.ledger.count_votes(&question.id).await.unwrap(), 50);
    }

    /// A ledger whose writes always fail.
    struct FailingLedger(MemoryVoteLedger);

    #[rocket::async_trait]
    impl VoteLedger for FailingLedger {
        async fn has_voted(&self, question_id: &QuestionId, identity: &Identity) -> Result<bool> {
            self.0.has_voted(question_id, identity).await
        }

        async fn record_vote(&self, _vote: VoteRecord) -> Result<()> {
            Err(Error::Storage("ledger unavailable".to_string()))
        }

        async fn voted_question_ids(&self, identity: &Identity) -> Result<HashSet<QuestionId>> {
            self.0.voted_question_ids(identity).await
        }

        async fn count_votes(&self, question_id: &QuestionId) -> Result<u64> {
            self.0.count_votes(question_id).await
        }
    }

    #[rocket::async_test]
    async fn failed_ledger_write_leaves_tally_ahead_of_ledger() {
        let questions = Arc::new(MemoryQuestionStore::new());
        let question = questions.insert(QuestionSpec::example()).await.unwrap();
        let stores = Stores::new(questions, Arc::new(FailingLedger(MemoryVoteLedger::new())));
        let voting = VotingService::new(stores.clone());

        let err = voting
            .cast_vote(&question.id, "A", &identity("10.0.0.1", "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        // Not rolled back: the tally counts a vote the ledger never saw.
        assert_eq!(tallies(&stores, &question.id).await, (1, 0));
        assert_eq!(stores.ledger.count_votes(&question.id).await.unwrap(), 0);
    }

    /// A ledger that holds every duplicate check until `n` callers have made
    /// one, so that they all observe the ledger before any vote is recorded.
    struct GatedLedger {
        inner: MemoryVoteLedger,
        gate: Barrier,
    }

    #[rocket::async_trait]
    impl VoteLedger for GatedLedger {
        async fn has_voted(&self, question_id: &QuestionId, identity: &Identity) -> Result<bool> {
            let voted = self.inner.has_voted(question_id, identity).await?;
            self.gate.wait().await;
            Ok(voted)
        }

        async fn record_vote(&self, vote: VoteRecord) -> Result<()> {
            self.inner.record_vote(vote).await
        }

        async fn voted_question_ids(&self, identity: &Identity) -> Result<HashSet<QuestionId>> {
            self.inner.voted_question_ids(identity).await
        }

        async fn count_votes(&self, question_id: &QuestionId) -> Result<u64> {
            self.inner.count_votes(question_id).await
        }
    }

    #[rocket::async_test]
    async fn parallel_duplicates_from_one_identity_can_both_count() {
        let questions = Arc::new(MemoryQuestionStore::new());
        let question = questions.insert(QuestionSpec::example()).await.unwrap();
        let ledger = GatedLedger {
            inner: MemoryVoteLedger::new(),
            gate: Barrier::new(2),
        };
        let stores = Stores::new(questions, Arc::new(ledger));
        let voting = VotingService::new(stores.clone());
        let voter = identity("10.0.0.1", "x");

        let (first, second) = rocket::tokio::join!(
            voting.cast_vote(&question.id, "A", &voter),
            voting.cast_vote(&question.id, "A", &voter),
        );

        // The duplicate check and the ledger write are not isolated, so both
        // requests pass the check and the same identity is counted twice.
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(tallies(&stores, &question.id).await, (2, 0));
        assert_eq!(stores.ledger.count_votes(&question.id).await.unwrap(), 2);
    }
}
