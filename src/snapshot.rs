// src/snapshot.rs
use serde::Serialize;

use crate::aggregate::Aggregation;
use crate::rank::{select, Direction, RankResult};

/// Final, immutable result of one evaluation. Sentinels serialize as `null`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub most_speeches: RankResult,
    pub most_on_topic: RankResult,
    pub least_wordy: RankResult,
    pub errors: Vec<String>,
}

impl Snapshot {
    /// Rank the finished counters and attach the error log as-is.
    pub fn assemble(agg: Aggregation) -> Self {
        let c = &agg.counters;
        Self {
            most_speeches: select(&c.speeches_in_target_year, Direction::Max),
            most_on_topic: select(&c.speeches_on_target_topic, Direction::Max),
            least_wordy: select(&c.total_word_count, Direction::Min),
            errors: agg.errors.into_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_aggregation_serializes_nulls_and_empty_errors() {
        let snap = Snapshot::assemble(Aggregation::default());
        let v = serde_json::to_value(&snap).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "mostSpeeches": null,
                "mostOnTopic": null,
                "leastWordy": null,
                "errors": []
            })
        );
    }
}
