use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{common::QuestionId, db::question::Question};

/// A question as submitted by a client. Any `id` or tallies in the
/// submitted body are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSpec {
    pub question: String,
    pub option_a: String,
    pub option_b: String,
}

impl QuestionSpec {
    /// Reject specs with blank fields.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("question", &self.question),
            ("optionA", &self.option_a),
            ("optionB", &self.option_b),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(Error::BadRequest(format!("`{name}` is required")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
impl QuestionSpec {
    pub fn example() -> Self {
        Self {
            question: "Would you rather...".to_string(),
            option_a: "Be able to fly".to_string(),
            option_b: "Be invisible".to_string(),
        }
    }

    pub fn numbered(n: usize) -> Self {
        Self {
            question: format!("Would you rather #{n}"),
            option_a: format!("Option A #{n}"),
            option_b: format!("Option B #{n}"),
        }
    }
}

/// API-friendly representation of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDesc {
    pub id: QuestionId,
    pub question: String,
    pub option_a: String,
    pub option_b: String,
    pub votes_a: u64,
    pub votes_b: u64,
}

impl From<Question> for QuestionDesc {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            question: question.question.text,
            option_a: question.question.option_a,
            option_b: question.question.option_b,
            votes_a: question.question.votes_a,
            votes_b: question.question.votes_b,
        }
    }
}
