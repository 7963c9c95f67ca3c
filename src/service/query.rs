use log::debug;

use crate::error::Result;
use crate::model::{
    api::{identity::Identity, question::QuestionSpec},
    db::question::Question,
};
use crate::store::Stores;

/// Number of questions served per batch.
pub const QUESTION_BATCH_SIZE: usize = 15;

/// Serves batches of unanswered questions and accepts new ones.
pub struct QueryService {
    stores: Stores,
}

impl QueryService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// A random batch of questions the identity has not yet voted on.
    ///
    /// Nothing stops a later batch from repeating questions that were
    /// shown but not voted on.
    pub async fn unanswered_questions(&self, identity: &Identity) -> Result<Vec<Question>> {
        let voted = self.stores.ledger.voted_question_ids(identity).await?;
        debug!("Excluding {} answered question(s)", voted.len());
        self.stores
            .questions
            .sample_unanswered(&voted, QUESTION_BATCH_SIZE)
            .await
    }

    /// Validate and store a new question.
    pub async fn submit_question(&self, spec: QuestionSpec) -> Result<Question> {
        spec.validate()?;
        self.stores.questions.insert(spec).await
    }
}
