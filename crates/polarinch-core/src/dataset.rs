//! The dataset builder: walks the topic × sentiment matrix, generates a text
//! for every cell and scores it.

use tracing::{debug, warn};

use crate::{
  generate::Generator,
  record::{NewRecord, RequestedSentiment},
  sentiment::analyze,
};

/// A matrix cell whose generation failed and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFailure {
  pub topic:     String,
  pub sentiment: RequestedSentiment,
  pub cause:     String,
}

/// The output of one pass over the matrix.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
  /// Successfully built records, in traversal order.
  pub records:  Vec<NewRecord>,
  pub failures: Vec<CellFailure>,
}

impl Dataset {
  pub fn cells(&self) -> usize { self.records.len() + self.failures.len() }
}

/// Generate and score one record per (topic, sentiment) cell.
///
/// Topics are visited in the given order, and within each topic the labels
/// in [`RequestedSentiment::ALL`] order. A failed generation is logged and
/// its cell skipped; no placeholder record is emitted and the pass carries
/// on.
pub async fn build_dataset<G>(generator: &G, topics: &[String]) -> Dataset
where
  G: Generator,
{
  let mut dataset = Dataset::default();

  for topic in topics {
    for sentiment in RequestedSentiment::ALL {
      match generator.generate(topic, sentiment).await {
        Ok(text) => {
          let analysis = analyze(&text);
          debug!(
            topic = %topic,
            requested = %sentiment,
            calculated = %analysis.sentiment(),
            score = analysis.score,
            comparative = analysis.comparative,
            positive = ?analysis.positive,
            negative = ?analysis.negative,
            "generated record"
          );
          dataset.records.push(NewRecord {
            topic: topic.clone(),
            text,
            requested_sentiment: sentiment,
            score: analysis.score,
          });
        }
        Err(e) => {
          warn!(
            topic = %topic,
            requested = %sentiment,
            error = %e,
            "generation failed; skipping cell"
          );
          dataset.failures.push(CellFailure {
            topic: topic.clone(),
            sentiment,
            cause: e.to_string(),
          });
        }
      }
    }
  }

  dataset
}

#[cfg(test)]
mod tests {
  use std::{
    io,
    sync::{Arc, Mutex},
  };

  use super::*;
  use crate::record::CalculatedSentiment;

  /// Echoes the cell back as text, failing for the listed cells.
  #[derive(Default)]
  struct ScriptedGenerator {
    failing: Vec<(&'static str, RequestedSentiment)>,
    calls:   Arc<Mutex<Vec<(String, RequestedSentiment)>>>,
  }

  impl Generator for ScriptedGenerator {
    type Error = io::Error;

    async fn generate(
      &self,
      topic: &str,
      sentiment: RequestedSentiment,
    ) -> Result<String, io::Error> {
      self.calls.lock().unwrap().push((topic.to_owned(), sentiment));
      if self.failing.iter().any(|(t, s)| *t == topic && *s == sentiment) {
        return Err(io::Error::new(io::ErrorKind::TimedOut, "upstream timed out"));
      }
      Ok(match sentiment {
        RequestedSentiment::Positive => format!("{topic} is awesome"),
        RequestedSentiment::Negative => format!("{topic} is terrible"),
        RequestedSentiment::Neutral => format!("{topic} happened today"),
        RequestedSentiment::Aggressive => format!("{topic} fans are great"),
      })
    }
  }

  fn topics() -> Vec<String> {
    vec!["nba".into(), "motogp".into(), "formula 1".into(), "bitcoin".into()]
  }

  #[tokio::test]
  async fn full_matrix_when_nothing_fails() {
    let generator = ScriptedGenerator::default();
    let dataset = build_dataset(&generator, &topics()).await;
    assert_eq!(dataset.records.len(), 16);
    assert!(dataset.failures.is_empty());
    assert_eq!(dataset.cells(), 16);
  }

  #[tokio::test]
  async fn traversal_is_topic_major_then_label_order() {
    let generator = ScriptedGenerator::default();
    let calls = generator.calls.clone();
    build_dataset(&generator, &topics()).await;

    let calls = calls.lock().unwrap();
    let expected: Vec<_> = topics()
      .into_iter()
      .flat_map(|t| RequestedSentiment::ALL.map(|s| (t.clone(), s)))
      .collect();
    assert_eq!(*calls, expected);
  }

  #[tokio::test]
  async fn failed_cells_are_skipped_without_placeholders() {
    let generator = ScriptedGenerator {
      failing: vec![
        ("nba", RequestedSentiment::Negative),
        ("bitcoin", RequestedSentiment::Positive),
        ("bitcoin", RequestedSentiment::Aggressive),
      ],
      ..Default::default()
    };
    let dataset = build_dataset(&generator, &topics()).await;

    assert_eq!(dataset.records.len(), 16 - 3);
    assert_eq!(dataset.failures.len(), 3);
    assert!(
      !dataset
        .records
        .iter()
        .any(|r| r.topic == "nba" && r.requested_sentiment == RequestedSentiment::Negative)
    );
    assert_eq!(dataset.failures[0].topic, "nba");
    assert!(dataset.failures[0].cause.contains("timed out"));
  }

  #[tokio::test]
  async fn every_cell_failing_yields_empty_dataset() {
    let failing = ["a", "b"]
      .into_iter()
      .flat_map(|t| RequestedSentiment::ALL.map(|s| (t, s)))
      .collect();
    let generator = ScriptedGenerator { failing, ..Default::default() };
    let dataset = build_dataset(&generator, &["a".to_owned(), "b".to_owned()]).await;
    assert!(dataset.records.is_empty());
    assert_eq!(dataset.failures.len(), 8);
  }

  #[tokio::test]
  async fn records_are_scored_and_keep_requested_label() {
    let generator = ScriptedGenerator::default();
    let dataset = build_dataset(&generator, &["nba".to_owned()]).await;

    let labels: Vec<_> = dataset
      .records
      .iter()
      .map(|r| (r.requested_sentiment, r.calculated_sentiment()))
      .collect();
    assert_eq!(
      labels,
      [
        (RequestedSentiment::Positive, CalculatedSentiment::Positive),
        (RequestedSentiment::Negative, CalculatedSentiment::Negative),
        (RequestedSentiment::Neutral, CalculatedSentiment::Neutral),
        // Asked for aggressive, scored positive: kept as-is.
        (RequestedSentiment::Aggressive, CalculatedSentiment::Positive),
      ]
    );
  }

  #[tokio::test]
  async fn record_score_matches_full_analysis() {
    let generator = ScriptedGenerator::default();
    let dataset = build_dataset(&generator, &["motogp".to_owned()]).await;

    for record in &dataset.records {
      let analysis = analyze(&record.text);
      assert_eq!(record.score, analysis.score, "{}", record.text);
      assert_eq!(record.calculated_sentiment(), analysis.sentiment());
      assert_eq!(record, &NewRecord::scored("motogp", record.requested_sentiment, &*record.text));
    }
    let awesome = analyze(&dataset.records[0].text);
    assert_eq!(awesome.positive, vec!["awesome"]);
    assert_eq!(awesome.comparative, 4.0 / 3.0);
  }

  #[tokio::test]
  async fn no_topics_means_no_calls() {
    let generator = ScriptedGenerator::default();
    let dataset = build_dataset(&generator, &[]).await;
    assert_eq!(dataset.cells(), 0);
    assert!(generator.calls.lock().unwrap().is_empty());
  }
}
