use std::collections::HashSet;

use mongodb::{
    bson::{doc, from_document, Bson, Document},
    Database,
};
use rocket::futures::TryStreamExt;

use crate::error::Result;
use crate::model::{
    api::{identity::Identity, question::QuestionSpec},
    common::{QuestionId, VoteOption},
    db::{question::Question, vote::VoteRecord},
    mongodb::Coll,
};

use super::{QuestionStore, VoteLedger};

/// Questions stored in the `questions` collection.
#[derive(Clone)]
pub struct MongoQuestionStore {
    questions: Coll<Question>,
}

impl MongoQuestionStore {
    pub fn new(db: &Database) -> Self {
        Self {
            questions: Coll::from_db(db),
        }
    }
}

#[rocket::async_trait]
impl QuestionStore for MongoQuestionStore {
    async fn insert(&self, spec: QuestionSpec) -> Result<Question> {
        let question = Question::from_spec(spec);
        self.questions.insert_one(&question, None).await?;
        Ok(question)
    }

    async fn sample_unanswered(
        &self,
        exclude: &HashSet<QuestionId>,
        limit: usize,
    ) -> Result<Vec<Question>> {
        let mut pipeline = Vec::with_capacity(2);
        if !exclude.is_empty() {
            let excluded = exclude
                .iter()
                .map(|id| id.as_str().to_string())
                .collect::<Vec<_>>();
            pipeline.push(doc! { "$match": { "_id": { "$nin": excluded } } });
        }
        let size = i64::try_from(limit).unwrap_or(i64::MAX);
        pipeline.push(doc! { "$sample": { "size": size } });

        let documents = self
            .questions
            .aggregate(pipeline, None)
            .await?
            .try_collect::<Vec<Document>>()
            .await?;

        let questions = documents
            .into_iter()
            .map(from_document::<Question>)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(questions)
    }

    async fn increment_vote(&self, id: &QuestionId, option: VoteOption) -> Result<u64> {
        // A single `$inc` is atomic on the server, so concurrent votes are never lost.
        let mut increment = Document::new();
        increment.insert(option.tally_field(), 1_i64);
        let result = self
            .questions
            .update_one(id.as_doc(), doc! { "$inc": increment }, None)
            .await?;
        Ok(result.matched_count)
    }

    async fn get_by_id(&self, id: &QuestionId) -> Result<Option<Question>> {
        Ok(self.questions.find_one(id.as_doc(), None).await?)
    }
}

/// Votes stored in the `votes` collection.
#[derive(Clone)]
pub struct MongoVoteLedger {
    votes: Coll<VoteRecord>,
}

impl MongoVoteLedger {
    pub fn new(db: &Database) -> Self {
        Self {
            votes: Coll::from_db(db),
        }
    }
}

/// Filter matching votes cast by the given identity: same origin OR same session.
/// An unknown origin contributes no clause.
fn cast_by(identity: &Identity) -> Document {
    let mut clauses = Vec::with_capacity(2);
    if let Some(origin) = &identity.origin {
        clauses.push(doc! { "ip": origin.as_str() });
    }
    clauses.push(doc! { "sessionId": identity.session_token.as_str() });
    doc! { "$or": clauses }
}

#[rocket::async_trait]
impl VoteLedger for MongoVoteLedger {
    async fn has_voted(&self, question_id: &QuestionId, identity: &Identity) -> Result<bool> {
        let mut filter = cast_by(identity);
        filter.insert("questionId", question_id.as_str());
        Ok(self.votes.find_one(filter, None).await?.is_some())
    }

    async fn record_vote(&self, vote: VoteRecord) -> Result<()> {
        self.votes.insert_one(&vote, None).await?;
        Ok(())
    }

    async fn voted_question_ids(&self, identity: &Identity) -> Result<HashSet<QuestionId>> {
        let ids = self
            .votes
            .distinct("questionId", cast_by(identity), None)
            .await?
            .into_iter()
            .filter_map(|id| match id {
                Bson::String(id) => Some(QuestionId::from(id)),
                _ => None,
            })
            .collect();
        Ok(ids)
    }

    async fn count_votes(&self, question_id: &QuestionId) -> Result<u64> {
        let count = self
            .votes
            .count_documents(doc! { "questionId": question_id.as_str() }, None)
            .await?;
        Ok(count)
    }
}
