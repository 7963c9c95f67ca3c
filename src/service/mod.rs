//! The voting and question-retrieval flows, built on top of [`crate::store`].

mod query;
mod seed;
mod voting;

pub use query::{QueryService, QUESTION_BATCH_SIZE};
pub use seed::{seed_questions, SeedReport};
pub use voting::{VoteStage, VotingService};
