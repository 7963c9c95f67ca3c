use serde::{Deserialize, Serialize};

use crate::model::common::QuestionId;

/// A vote that the user wishes to cast. The option is kept as a raw string
/// so that an invalid choice is reported as such rather than as a malformed body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    pub question_id: QuestionId,
    pub option: String,
}
