use std::ops::Deref;

use log::debug;
use mongodb::{bson::doc, error::Error as DbError, Collection, Database, IndexModel};

use crate::model::db::{question::Question, vote::VoteRecord};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

const QUESTIONS: &str = "questions";
impl MongoCollection for Question {
    const NAME: &'static str = QUESTIONS;
}

const VOTES: &str = "votes";
impl MongoCollection for VoteRecord {
    const NAME: &'static str = VOTES;
}

/// Ensure that all the required indexes exist on the given database.
///
/// These only speed up the duplicate-vote lookups; they are not unique, so
/// they do not change which votes are accepted.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let votes = Coll::<VoteRecord>::from_db(db);

    let by_origin = IndexModel::builder()
        .keys(doc! {"questionId": 1, "ip": 1})
        .build();
    votes.create_index(by_origin, None).await?;

    let by_session = IndexModel::builder()
        .keys(doc! {"questionId": 1, "sessionId": 1})
        .build();
    votes.create_index(by_session, None).await?;

    Ok(())
}
