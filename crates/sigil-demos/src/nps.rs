// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! NPS comment topic classification

use serde::{Deserialize, Serialize};
use sigil::{Example, FieldKind, InputField, OutputField, Result, Signature, SignatureBuilder};
use sigil_optimize::Rng;
use std::collections::BTreeSet;
use std::path::Path;

/// The closed set of topics a comment can be tagged with
pub const TOPICS: [&str; 10] = [
    "Slow or Unreliable Shipping",
    "Inaccurate Product Descriptions or Photos",
    "Limited Size or Shade Availability",
    "Unresponsive or Generic Customer Support",
    "Website or App Bugs",
    "Confusing Loyalty or Discount Systems",
    "Complicated Returns or Exchanges",
    "Customs and Import Charges",
    "Difficult Product Discovery",
    "Damaged or Incorrect Items",
];

/// Comment classified before and after optimization
pub const SAMPLE_COMMENT: &str = "Absolutely frustrated! Every time I find something I love, it's sold out in my size. What's the point of having a wishlist if nothing is ever available?";

/// One labelled comment from `nps_comments.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpsRecord {
    /// Free-text comment
    pub comment: String,
    /// Topics the comment mentions
    pub topics: Vec<String>,
}

impl NpsRecord {
    /// Example with `comment` as input and the topics under `answer`
    pub fn to_example(&self) -> Example {
        Example::new()
            .with("comment", self.comment.as_str())
            .with("answer", self.topics.clone())
            .with_inputs(["comment"])
    }
}

/// Read a JSON array of records.
pub fn load_records(path: impl AsRef<Path>) -> anyhow::Result<Vec<NpsRecord>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("cannot read {}: {e}", path.display()))?;
    let records: Vec<NpsRecord> = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("{} is not a list of NPS records: {e}", path.display()))?;
    tracing::debug!(path = %path.display(), count = records.len(), "loaded NPS comments");
    Ok(records)
}

/// Every distinct topic in `records`, sorted
pub fn collect_topics(records: &[NpsRecord]) -> BTreeSet<String> {
    records
        .iter()
        .flat_map(|r| r.topics.iter().cloned())
        .collect()
}

/// `NPSTopic`: comment in, list of known topics out.
pub fn topic_signature() -> Result<Signature> {
    SignatureBuilder::new("NPSTopic")
        .instructions("Classify NPS topics")
        .input(InputField::create("comment", ""))?
        .output(
            OutputField::create("answer", "")
                .with_kind(FieldKind::list(FieldKind::literal(TOPICS))),
        )?
        .build()
}

/// Send each record to the training side with probability `train_ratio`.
///
/// The split is reproducible for a given `seed`.
pub fn random_split(
    records: &[NpsRecord],
    train_ratio: f64,
    seed: u64,
) -> (Vec<Example>, Vec<Example>) {
    let mut rng = Rng::new(seed);
    let mut trainset = Vec::new();
    let mut valset = Vec::new();
    for record in records {
        if rng.next_f64() <= train_ratio {
            trainset.push(record.to_example());
        } else {
            valset.push(record.to_example());
        }
    }
    (trainset, valset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<NpsRecord> {
        (0..40)
            .map(|i| NpsRecord {
                comment: format!("comment {i}"),
                topics: vec![TOPICS[i % TOPICS.len()].to_string()],
            })
            .collect()
    }

    #[test]
    fn test_split_is_partition_and_reproducible() {
        let records = records();
        let (train, val) = random_split(&records, 0.5, 7);
        assert_eq!(train.len() + val.len(), records.len());
        assert!(!train.is_empty() && !val.is_empty());

        let (again, _) = random_split(&records, 0.5, 7);
        assert_eq!(train, again);
    }

    #[test]
    fn test_leading_records_land_on_both_sides() {
        let records = records();
        let in_train = (0..200u64)
            .filter(|&seed| {
                let (train, _) = random_split(&records, 0.5, seed);
                train.first().and_then(|e| e.get_str("comment")) == Some("comment 0")
            })
            .count();
        assert!((60..=140).contains(&in_train), "first record in train for {in_train} of 200 seeds");
    }

    #[test]
    fn test_split_extremes() {
        let records = records();
        assert_eq!(random_split(&records, 1.0, 1).0.len(), records.len());
        assert_eq!(random_split(&records, -1.0, 1).1.len(), records.len());
    }

    #[test]
    fn test_collect_topics_dedups() {
        let topics = collect_topics(&records());
        assert_eq!(topics.len(), TOPICS.len());
    }

    #[test]
    fn test_signature_output_kind() {
        let signature = topic_signature().unwrap();
        let kind = &signature.field("answer").unwrap().kind;
        let value = kind
            .coerce(r#"["website or app bugs", "Customs and Import Charges"]"#)
            .unwrap();
        assert_eq!(
            value,
            serde_json::json!(["Website or App Bugs", "Customs and Import Charges"])
        );
        assert!(kind.coerce(r#"["Free shipping"]"#).is_err());
    }

    #[test]
    fn test_example_shape() {
        let example = NpsRecord {
            comment: "Box arrived crushed".into(),
            topics: vec!["Damaged or Incorrect Items".into()],
        }
        .to_example();
        assert_eq!(example.input_keys(), ["comment"]);
        assert_eq!(
            example.get("answer"),
            Some(&serde_json::json!(["Damaged or Incorrect Items"]))
        );
    }
}
