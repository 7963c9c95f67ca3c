use log::{info, warn};

use crate::model::api::question::QuestionSpec;
use crate::store::QuestionStore;

/// Outcome of a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Insert each question with a fresh ID and zeroed tallies. Invalid entries
/// and individual insert failures are logged and skipped.
pub async fn seed_questions(store: &dyn QuestionStore, specs: Vec<QuestionSpec>) -> SeedReport {
    let mut report = SeedReport::default();
    for (index, spec) in specs.into_iter().enumerate() {
        if let Err(e) = spec.validate() {
            warn!("Skipping question #{index}: {e}");
            report.skipped += 1;
            continue;
        }
        match store.insert(spec).await {
            Ok(question) => {
                info!("Inserted question {}", question.id);
                report.inserted += 1;
            }
            Err(e) => {
                warn!("Failed to insert question #{index}: {e}");
                report.skipped += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::store::MemoryQuestionStore;

    #[rocket::async_test]
    async fn seeds_valid_questions_and_skips_blank_ones() {
        let store = MemoryQuestionStore::new();
        let mut blank = QuestionSpec::numbered(2);
        blank.question = " ".to_string();
        let specs = vec![QuestionSpec::numbered(0), QuestionSpec::numbered(1), blank];

        let report = seed_questions(&store, specs).await;
        assert_eq!(report, SeedReport { inserted: 2, skipped: 1 });

        let stored = store.sample_unanswered(&HashSet::new(), 10).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|q| q.total_votes() == 0));
    }
}
