//! Types shared between the API and the database layers.

mod option;
mod question_id;

pub use option::VoteOption;
pub use question_id::QuestionId;
