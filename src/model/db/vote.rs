use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::identity::Identity,
    common::{QuestionId, VoteOption},
};

/// A single accepted vote, as stored in the ledger. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    /// The question voted on. This is a reference, not ownership.
    pub question_id: QuestionId,
    /// Network origin of the voter.
    #[serde(rename = "ip")]
    pub origin: Option<String>,
    pub session_id: String,
    pub option: VoteOption,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub voted_at: DateTime<Utc>,
}

impl VoteRecord {
    pub fn new(
        question_id: QuestionId,
        identity: &Identity,
        option: VoteOption,
        voted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question_id,
            origin: identity.origin.clone(),
            session_id: identity.session_token.clone(),
            option,
            voted_at,
        }
    }

    /// Was this vote cast by the given identity?
    pub fn cast_by(&self, identity: &Identity) -> bool {
        identity.matches(self.origin.as_deref(), &self.session_id)
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::to_document;

    use super::*;

    #[test]
    fn stored_field_names() {
        let identity = Identity::new("10.1.2.3".to_string(), "session");
        let vote = VoteRecord::new("q1".into(), &identity, VoteOption::B, Utc::now());
        let document = to_document(&vote).unwrap();

        assert_eq!(document.get_str("questionId").unwrap(), "q1");
        assert_eq!(document.get_str("ip").unwrap(), "10.1.2.3");
        assert_eq!(document.get_str("sessionId").unwrap(), "session");
        assert_eq!(document.get_str("option").unwrap(), "B");
        assert!(document.get_datetime("votedAt").is_ok());
    }

    #[test]
    fn cast_by_uses_either_field() {
        let voter = Identity::new("10.1.2.3".to_string(), "session");
        let vote = VoteRecord::new("q1".into(), &voter, VoteOption::A, Utc::now());

        assert!(vote.cast_by(&voter));
        assert!(vote.cast_by(&Identity::new("10.9.9.9".to_string(), "session")));
        assert!(vote.cast_by(&Identity::new("10.1.2.3".to_string(), "other")));
        assert!(!vote.cast_by(&Identity::new("10.9.9.9".to_string(), "other")));
    }
}
