//! Lexicon-based sentiment scoring.
//!
//! Text is tokenised, each token is looked up in a word valence table, and
//! the valences are summed. A token directly following a negator has its
//! valence inverted. Scoring is pure and deterministic.

use crate::{lexicon, record::CalculatedSentiment};

/// Words that invert the valence of the token right after them. Sorted.
const NEGATORS: &[&str] = &[
  "aren't", "arent", "can't", "cannot", "cant", "couldn't", "couldnt", "didn't",
  "didnt", "doesn't", "doesnt", "don't", "dont", "hadn't", "hadnt", "hasn't",
  "hasnt", "haven't", "havent", "isn't", "isnt", "mightn't", "mustn't",
  "neither", "never", "no", "non", "nor", "not", "shan't", "shouldn't",
  "shouldnt", "wasn't", "wasnt", "weren't", "werent", "won't", "wont",
  "wouldn't", "wouldnt",
];

/// Detailed result of scoring a text.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
  pub score:       i32,
  /// `score` divided by the number of tokens; `0.0` when there are none.
  pub comparative: f64,
  pub tokens:      Vec<String>,
  /// Tokens that contributed a positive valence (after negation).
  pub positive:    Vec<String>,
  /// Tokens that contributed a negative valence (after negation).
  pub negative:    Vec<String>,
}

impl Analysis {
  pub fn sentiment(&self) -> CalculatedSentiment {
    CalculatedSentiment::from_score(self.score)
  }
}

/// Score `text`, returning the polarity score and the label derived from it.
///
/// Empty or whitespace-only input scores `0` (neutral).
pub fn score(text: &str) -> (i32, CalculatedSentiment) {
  let analysis = analyze(text);
  (analysis.score, analysis.sentiment())
}

pub fn analyze(text: &str) -> Analysis {
  let tokens = tokenize(text);
  let mut score = 0;
  let mut positive = Vec::new();
  let mut negative = Vec::new();

  for (idx, token) in tokens.iter().enumerate() {
    let Some(mut valence) = lexicon::valence(token) else { continue };
    if idx > 0 && NEGATORS.binary_search(&tokens[idx - 1].as_str()).is_ok() {
      valence = -valence;
    }
    match valence.signum() {
      1 => positive.push(token.clone()),
      -1 => negative.push(token.clone()),
      _ => {}
    }
    score += valence;
  }

  let comparative = if tokens.is_empty() {
    0.0
  } else {
    f64::from(score) / tokens.len() as f64
  };

  Analysis { score, comparative, tokens, positive, negative }
}

/// Lowercase, blank out everything but letters, digits, apostrophes and
/// hyphens, and split on whitespace.
fn tokenize(text: &str) -> Vec<String> {
  let cleaned: String = text
    .to_lowercase()
    .chars()
    .map(|c| {
      if c.is_alphanumeric() || c == '\'' || c == '-' { c } else { ' ' }
    })
    .collect();
  cleaned.split_whitespace().map(str::to_owned).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_and_whitespace_are_neutral() {
    assert_eq!(score(""), (0, CalculatedSentiment::Neutral));
    assert_eq!(score("   \n\t "), (0, CalculatedSentiment::Neutral));
    assert_eq!(analyze("").comparative, 0.0);
  }

  #[test]
  fn sums_token_valences() {
    let (s, label) = score("What an AWESOME win for the Lakers!");
    assert_eq!(s, 8);
    assert_eq!(label, CalculatedSentiment::Positive);
  }

  #[test]
  fn negative_text_scores_negative() {
    let (s, label) = score("Worst race ever. Terrible strategy, total disaster.");
    assert_eq!(s, -8);
    assert_eq!(label, CalculatedSentiment::Negative);
  }

  #[test]
  fn text_without_known_words_is_neutral() {
    assert_eq!(
      score("Bitcoin trades at 64000 on Tuesday."),
      (0, CalculatedSentiment::Neutral)
    );
  }

  #[test]
  fn mixed_text_can_cancel_to_zero() {
    // good (+3) and bad (-3)
    assert_eq!(score("good start, bad finish"), (0, CalculatedSentiment::Neutral));
  }

  #[test]
  fn negator_inverts_following_token() {
    assert_eq!(score("not good").0, -3);
    assert_eq!(score("don't worry").0, 3);
    // Only the immediately following token is affected.
    assert_eq!(score("not a good day").0, 3);
  }

  #[test]
  fn negators_cover_contractions_and_never() {
    assert_eq!(score("never good").0, -3);
    assert_eq!(score("didn't like it").0, -2);
    assert_eq!(score("cannot complain").0, 2);
    assert_eq!(score("wasn't bad").0, 3);
    assert!(NEGATORS.windows(2).all(|pair| pair[0] < pair[1]));
  }

  #[test]
  fn inflected_words_are_scored() {
    assert_eq!(
      score("Bitcoin crashed again, investors panicked"),
      (-5, CalculatedSentiment::Negative)
    );

    let analysis = analyze("Congrats to the champions, absolutely loved it");
    assert_eq!(analysis.score, 7);
    assert_eq!(analysis.positive, vec!["congrats", "champions", "loved"]);
    assert!(analysis.negative.is_empty());

    assert_eq!(
      score("Unacceptable. The team loses again"),
      (-5, CalculatedSentiment::Negative)
    );
  }

  #[test]
  fn analysis_reports_matched_words() {
    let analysis = analyze("Happy fan, sad rivals");
    assert_eq!(analysis.positive, vec!["happy", "fan"]);
    assert_eq!(analysis.negative, vec!["sad"]);
    assert_eq!(analysis.tokens.len(), 4);
  }

  #[test]
  fn scoring_is_deterministic() {
    let text = "Formula 1 is thrilling but the rules are ridiculous";
    let first = score(text);
    for _ in 0..10 {
      assert_eq!(score(text), first);
    }
  }
}
