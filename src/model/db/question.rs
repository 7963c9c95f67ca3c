use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{
    api::question::QuestionSpec,
    common::{QuestionId, VoteOption},
};

/// Core question data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCore {
    /// Question text, e.g. "Would you rather...".
    #[serde(rename = "question")]
    pub text: String,
    pub option_a: String,
    pub option_b: String,
    pub votes_a: u64,
    pub votes_b: u64,
}

impl QuestionCore {
    /// Create a question with both tallies at zero.
    pub fn new(spec: QuestionSpec) -> Self {
        Self {
            text: spec.question,
            option_a: spec.option_a,
            option_b: spec.option_b,
            votes_a: 0,
            votes_b: 0,
        }
    }

    /// The tally for the given option.
    pub fn votes(&self, option: VoteOption) -> u64 {
        match option {
            VoteOption::A => self.votes_a,
            VoteOption::B => self.votes_b,
        }
    }

    pub fn total_votes(&self) -> u64 {
        self.votes_a + self.votes_b
    }
}

/// A question from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    #[serde(rename = "_id")]
    pub id: QuestionId,
    #[serde(flatten)]
    pub question: QuestionCore,
}

impl Question {
    /// Create a brand new question from a client submission, with a freshly
    /// minted ID and zeroed tallies.
    pub fn from_spec(spec: QuestionSpec) -> Self {
        Self {
            id: QuestionId::new(),
            question: QuestionCore::new(spec),
        }
    }
}

impl Deref for Question {
    type Target = QuestionCore;

    fn deref(&self) -> &Self::Target {
        &self.question
    }
}

impl DerefMut for Question {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.question
    }
}
