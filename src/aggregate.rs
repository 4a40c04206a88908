//! # Aggregator
//! Sole consumer of the merge channel. Parses each line into a [`Record`] or
//! a classified error and folds valid records into per-speaker counters.
//!
//! Failures are per line (or per source) and only ever append to the
//! [`ErrorLog`]; they never touch the counters.

use metrics::counter;
use std::collections::HashMap;
use tokio::sync::mpsc;

use crate::config::EvaluationConfig;
use crate::error::IngestError;
use crate::ingest::types::{IngestEvent, RawLine};

/// What makes a record count towards the year/topic tallies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRules {
    /// Matched by substring containment against the date field.
    pub target_year: String,
    /// Matched exactly against the whitespace-trimmed topic field.
    pub target_topic: String,
    pub delimiter: String,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self::from(&EvaluationConfig::default())
    }
}

impl From<&EvaluationConfig> for MatchRules {
    fn from(cfg: &EvaluationConfig) -> Self {
        Self {
            target_year: cfg.target_year.clone(),
            target_topic: cfg.target_topic.clone(),
            delimiter: cfg.delimiter.clone(),
        }
    }
}

/// One parsed `speaker,topic,date,wordCount` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub speaker: String,
    pub topic: String,
    pub date: String,
    pub word_count: i64,
}

/// Split a raw line into a [`Record`].
pub fn parse_line(line: &RawLine, delimiter: &str) -> Result<Record, IngestError> {
    let fields: Vec<&str> = line.text.split(delimiter).collect();
    let [speaker, topic, date, count] = fields.as_slice() else {
        return Err(IngestError::RecordShape {
            origin: line.source.clone(),
            line: line.text.clone(),
            found: fields.len(),
        });
    };

    let word_count = count
        .trim()
        .parse::<i64>()
        .map_err(|_| IngestError::RecordFormat {
            origin: line.source.clone(),
            line: line.text.clone(),
            value: (*count).to_string(),
        })?;

    Ok(Record {
        speaker: (*speaker).to_string(),
        topic: (*topic).to_string(),
        date: (*date).to_string(),
        word_count,
    })
}

/// Three speaker → count mappings. A missing key means zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityCounters {
    pub speeches_in_target_year: HashMap<String, i64>,
    pub speeches_on_target_topic: HashMap<String, i64>,
    pub total_word_count: HashMap<String, i64>,
}

impl EntityCounters {
    pub fn fold(&mut self, rec: &Record, rules: &MatchRules) {
        let words = self
            .total_word_count
            .entry(rec.speaker.clone())
            .or_insert(0);
        *words = words.saturating_add(rec.word_count);

        if rec.date.contains(rules.target_year.as_str()) {
            *self
                .speeches_in_target_year
                .entry(rec.speaker.clone())
                .or_insert(0) += 1;
        }
        if rec.topic.trim() == rules.target_topic {
            *self
                .speeches_on_target_topic
                .entry(rec.speaker.clone())
                .or_insert(0) += 1;
        }
    }
}

/// Append-only, human-readable error list in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog(Vec<String>);

impl ErrorLog {
    pub fn push(&mut self, err: &IngestError) {
        self.0.push(err.to_string());
    }

    pub fn push_message(&mut self, msg: impl Into<String>) {
        self.0.push(msg.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub lines: usize,
    pub records: usize,
    pub record_errors: usize,
    pub source_failures: usize,
}

/// Finished state handed from the aggregator task to the assembler.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub counters: EntityCounters,
    pub errors: ErrorLog,
    pub stats: AggregationStats,
}

#[derive(Debug)]
pub struct Aggregator {
    rules: MatchRules,
    out: Aggregation,
}

impl Aggregator {
    pub fn new(rules: MatchRules) -> Self {
        Self {
            rules,
            out: Aggregation::default(),
        }
    }

    /// Drain `rx` until every sender is gone, then hand back the result.
    pub async fn run(mut self, mut rx: mpsc::Receiver<IngestEvent>) -> Aggregation {
        while let Some(ev) = rx.recv().await {
            self.ingest(ev);
        }
        self.finish()
    }

    pub fn ingest(&mut self, ev: IngestEvent) {
        match ev {
            IngestEvent::Failure(f) => {
                self.out.stats.source_failures += 1;
                self.out.errors.push(&IngestError::from(f));
            }
            IngestEvent::Line(line) => {
                self.out.stats.lines += 1;
                match parse_line(&line, &self.rules.delimiter) {
                    Ok(rec) => {
                        self.out.stats.records += 1;
                        self.out.counters.fold(&rec, &self.rules);
                    }
                    Err(e) => {
                        tracing::debug!(source = %line.source, error = %e, "record rejected");
                        self.out.stats.record_errors += 1;
                        self.out.errors.push(&e);
                    }
                }
            }
        }
    }

    pub fn finish(self) -> Aggregation {
        let s = self.out.stats;
        counter!("evaluation_lines_total").increment(s.lines as u64);
        counter!("evaluation_record_errors_total").increment(s.record_errors as u64);
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::{FailureKind, Source, SourceFailure};

    fn line(text: &str) -> IngestEvent {
        IngestEvent::Line(RawLine {
            text: text.to_string(),
            source: Source::new("http://example.test/a.csv"),
        })
    }

    fn rules() -> MatchRules {
        MatchRules {
            target_year: "2013".into(),
            target_topic: "Innere Sicherheit".into(),
            delimiter: ",".into(),
        }
    }

    #[test]
    fn parse_accepts_padded_and_signed_counts() {
        let raw = RawLine {
            text: "Alexander Abel, Bildungspolitik, 2012-10-30, 5310 ".into(),
            source: Source::new("s"),
        };
        let rec = parse_line(&raw, ",").unwrap();
        assert_eq!(rec.speaker, "Alexander Abel");
        assert_eq!(rec.topic, " Bildungspolitik");
        assert_eq!(rec.word_count, 5310);

        let neg = RawLine {
            text: "A,t,d,-3".into(),
            source: Source::new("s"),
        };
        assert_eq!(parse_line(&neg, ",").unwrap().word_count, -3);
    }

    #[test]
    fn parse_classifies_shape_and_format_errors() {
        let short = RawLine {
            text: "A,t,d".into(),
            source: Source::new("s"),
        };
        assert!(matches!(
            parse_line(&short, ","),
            Err(IngestError::RecordShape { found: 3, .. })
        ));

        let long = RawLine {
            text: "A,t,d,1,extra".into(),
            source: Source::new("s"),
        };
        assert!(matches!(
            parse_line(&long, ","),
            Err(IngestError::RecordShape { found: 5, .. })
        ));

        let bad = RawLine {
            text: "A,Economy,2013,notanumber".into(),
            source: Source::new("s"),
        };
        match parse_line(&bad, ",") {
            Err(IngestError::RecordFormat { value, .. }) => assert_eq!(value, "notanumber"),
            other => panic!("expected format error, got {other:?}"),
        }
    }

    #[test]
    fn custom_delimiter_is_honoured() {
        let raw = RawLine {
            text: "A;x;2013;7".into(),
            source: Source::new("s"),
        };
        assert_eq!(parse_line(&raw, ";").unwrap().word_count, 7);
        assert!(parse_line(&raw, ",").is_err());
    }

    #[test]
    fn fold_applies_year_and_topic_rules() {
        let mut agg = Aggregator::new(rules());
        agg.ingest(line("A,Innere Sicherheit ,2013-01-01,100"));
        agg.ingest(line("A,Economy,12.03.2013,10"));
        agg.ingest(line("B,innere sicherheit,2012-01-01,50"));
        let out = agg.finish();

        let c = &out.counters;
        assert_eq!(c.total_word_count["A"], 110);
        assert_eq!(c.total_word_count["B"], 50);
        assert_eq!(c.speeches_in_target_year["A"], 2);
        assert!(!c.speeches_in_target_year.contains_key("B"));
        assert_eq!(c.speeches_on_target_topic["A"], 1);
        // Topic match is case-sensitive.
        assert!(!c.speeches_on_target_topic.contains_key("B"));
        assert!(out.errors.is_empty());
        assert_eq!(out.stats.records, 3);
    }

    #[test]
    fn bad_lines_only_reach_the_error_log() {
        let mut agg = Aggregator::new(rules());
        agg.ingest(line("A,Economy,2013-01-01,100"));
        agg.ingest(line("A,Economy,2013,notanumber"));
        agg.ingest(line(""));
        agg.ingest(IngestEvent::Failure(SourceFailure {
            source: Source::new("http://down.test"),
            kind: FailureKind::Open("connection refused".into()),
        }));
        let out = agg.finish();

        assert_eq!(out.counters.total_word_count["A"], 100);
        assert_eq!(out.counters.speeches_in_target_year["A"], 1);
        assert_eq!(out.errors.len(), 3);
        assert!(out.errors.as_slice()[0].contains("notanumber"));
        assert!(out.errors.as_slice()[2].contains("http://down.test"));
        assert_eq!(out.stats.record_errors, 2);
        assert_eq!(out.stats.source_failures, 1);
    }

    #[tokio::test]
    async fn run_drains_until_all_senders_drop() {
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(Aggregator::new(rules()).run(rx));
        let tx2 = tx.clone();
        tx.send(line("A,x,2013,1")).await.unwrap();
        drop(tx);
        tx2.send(line("B,x,2013,2")).await.unwrap();
        drop(tx2);
        let out = task.await.unwrap();
        assert_eq!(out.stats.records, 2);
        assert_eq!(out.counters.total_word_count.values().sum::<i64>(), 3);
    }
}
