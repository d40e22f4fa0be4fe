//! Reward contributions and their display breakdown.
//!
//! A [`RewardContribution`] is what one reward source yields for one cycle:
//! an ordered set of labeled annualized percentages plus, for compoundable
//! sources, the pre-compounding `apr` used by the calculator. Its
//! [`Breakdown`] is the same set of labels with `apr` left out.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Label of additive, non-compounded trading-fee contributions.
pub const LP_LABEL: &str = "lp";

/// Key under which `apr` is serialized alongside the display labels.
const APR_KEY: &str = "apr";

/// One labeled yield component attributable to a single reward source.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RewardContribution {
    entries: Vec<(String, f64)>,
    apr: Option<f64>,
}

impl RewardContribution {
    /// Create a contribution with a single display entry.
    pub fn new(label: impl Into<String>, value: f64) -> Self {
        Self {
            entries: vec![(label.into(), value)],
            apr: None,
        }
    }

    /// Create an additive trading-fee contribution (`{lp: value}`).
    pub fn lp(value: f64) -> Self {
        Self::new(LP_LABEL, value)
    }

    /// Add another display entry.
    pub fn with_entry(mut self, label: impl Into<String>, value: f64) -> Self {
        self.entries.push((label.into(), value));
        self
    }

    /// Set the pre-compounding APR (percent).
    pub fn with_apr(mut self, apr: f64) -> Self {
        self.apr = Some(apr);
        self
    }

    /// The pre-compounding APR (percent), if this contribution compounds.
    pub fn apr(&self) -> Option<f64> {
        self.apr
    }

    /// Display entries in insertion order.
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    /// Display labels in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(label, _)| label.as_str())
    }

    /// Value of the first entry with `label`.
    pub fn value(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| *v)
    }

    /// Sum of the `lp`-labeled entries.
    pub fn lp_value(&self) -> f64 {
        self.entries
            .iter()
            .filter(|(l, v)| l == LP_LABEL && v.is_finite())
            .fold(0.0, |acc, (_, v)| acc + v)
    }

    /// Returns true if every entry and the apr are finite.
    pub fn is_finite(&self) -> bool {
        self.entries.iter().all(|(_, v)| v.is_finite())
            && self.apr.map_or(true, f64::is_finite)
    }

    /// The display view of this contribution (no `apr` key).
    pub fn breakdown(&self) -> Breakdown {
        Breakdown(
            self.entries
                .iter()
                .filter(|(_, v)| v.is_finite())
                .cloned()
                .collect(),
        )
    }
}

/// Display-only view of one contribution: label to annualized percent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Breakdown(Vec<(String, f64)>);

impl Breakdown {
    /// Entries in display order.
    pub fn entries(&self) -> &[(String, f64)] {
        &self.0
    }

    /// Labels in display order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(label, _)| label.as_str())
    }

    /// Value of the first entry with `label`.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, v)| *v)
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// =============================================================================
// SERDE
// =============================================================================

fn serialize_entries<S: Serializer>(
    serializer: S,
    entries: &[(String, f64)],
    apr: Option<f64>,
) -> Result<S::Ok, S::Error> {
    let len = entries.len() + usize::from(apr.is_some());
    let mut map = serializer.serialize_map(Some(len))?;
    for (label, value) in entries {
        map.serialize_entry(label, value)?;
    }
    if let Some(apr) = apr {
        map.serialize_entry(APR_KEY, &apr)?;
    }
    map.end()
}

/// Visits a JSON-style object keeping key order.
struct EntriesVisitor;

impl<'de> Visitor<'de> for EntriesVisitor {
    type Value = Vec<(String, f64)>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of labels to numbers")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
        while let Some((label, value)) = access.next_entry::<String, f64>()? {
            entries.push((label, value));
        }
        Ok(entries)
    }
}

impl Serialize for RewardContribution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entries(serializer, &self.entries, self.apr)
    }
}

impl<'de> Deserialize<'de> for RewardContribution {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = deserializer.deserialize_map(EntriesVisitor)?;
        let mut contribution = RewardContribution::default();
        for (label, value) in raw {
            if label == APR_KEY {
                contribution.apr = Some(value);
            } else {
                contribution.entries.push((label, value));
            }
        }
        Ok(contribution)
    }
}

impl Serialize for Breakdown {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_entries(serializer, &self.0, None)
    }
}

impl<'de> Deserialize<'de> for Breakdown {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(EntriesVisitor).map(Breakdown)
    }
}
