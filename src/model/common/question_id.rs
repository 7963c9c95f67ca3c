use std::fmt::{Display, Formatter};
use std::ops::Deref;

use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique question ID. Minted server-side as a UUIDv4 string, but any string
/// sent by a client is accepted and simply fails to match.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(String);

impl QuestionId {
    /// Mint a fresh, random ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A filter document selecting the question with this ID.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": self.as_str() }
    }
}

impl Default for QuestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for QuestionId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for QuestionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for QuestionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for QuestionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
