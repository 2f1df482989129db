use std::{fmt, marker::PhantomData};

use ahash::AHashMap;
use serde::{de, Deserialize, Deserializer};

use crate::error::{Error, Result};

/// Allocation rule attached to one area class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClassRule {
    /// Maximum density (value per unit area) a region of this class may receive.
    Threshold(f64),
    /// No cap; absorbs whatever remains after every capped class has been processed.
    Unconstrained,
}

impl ClassRule {
    /// Interpret an optional threshold, where `None` and `0` both mean "no limit".
    pub fn from_option(threshold: Option<f64>) -> Result<Self> {
        match threshold {
            None => Ok(Self::Unconstrained),
            Some(t) if t == 0.0 => Ok(Self::Unconstrained),
            Some(t) if t.is_finite() && t > 0.0 => Ok(Self::Threshold(t)),
            Some(t) => Err(Error::InvalidConfig(format!("threshold {t} must be positive and finite"))),
        }
    }

    /// The density cap, if this class has one.
    #[inline]
    pub fn threshold(&self) -> Option<f64> {
        match self {
            Self::Threshold(t) => Some(*t),
            Self::Unconstrained => None,
        }
    }
}

impl<'de> Deserialize<'de> for ClassRule {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<f64>::deserialize(deserializer)?;
        Self::from_option(raw).map_err(de::Error::custom)
    }
}

/// Mapping from class label to a per-class setting that remembers insertion order.
///
/// Insertion order is the tie-break whenever two classes compare equal, so it must
/// survive construction from JSON: keys are kept in document order.
#[derive(Debug, Clone)]
pub struct ClassMap<V> {
    entries: Vec<(String, V)>,
    index: AHashMap<String, usize>,
}

/// Class label to density cap, used by the constrained allocator.
pub type ThresholdMap = ClassMap<ClassRule>;

/// Class label to relative weight, used by the n-class method.
pub type PercentMap = ClassMap<f64>;

impl<V> Default for ClassMap<V> {
    fn default() -> Self {
        Self { entries: Vec::new(), index: AHashMap::new() }
    }
}

impl<V> ClassMap<V> {
    pub fn new() -> Self { Self::default() }

    /// Insert or replace the value for `label`.
    /// Replacing keeps the label at its original position.
    pub fn insert(&mut self, label: impl Into<String>, value: V) -> Option<V> {
        let label = label.into();
        match self.index.get(&label) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, value));
                None
            }
        }
    }

    #[inline] pub fn get(&self, label: &str) -> Option<&V> { self.index.get(label).map(|&i| &self.entries[i].1) }

    /// Position of `label` in insertion order.
    #[inline] pub fn position(&self, label: &str) -> Option<usize> { self.index.get(label).copied() }

    #[inline] pub fn contains(&self, label: &str) -> bool { self.index.contains_key(label) }

    #[inline] pub fn len(&self) -> usize { self.entries.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Iterate over `(label, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> + '_ {
        self.entries.iter().map(|(label, value)| (label.as_str(), value))
    }
}

impl<V> ClassMap<V> where V: for<'de> Deserialize<'de> {
    /// Parse a JSON object such as `{"water": 0, "residential": 120.5, "park": null}`.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

impl<K: Into<String>, V> FromIterator<(K, V)> for ClassMap<V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (label, value) in iter { map.insert(label, value); }
        map
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for ClassMap<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> de::Visitor<'de> for OrderedVisitor<V> {
            type Value = ClassMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map from class label to value")
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut map = ClassMap::new();
                while let Some((label, value)) = access.next_entry::<String, V>()? {
                    if map.contains(&label) {
                        return Err(de::Error::custom(format!("duplicate class {label:?}")));
                    }
                    map.insert(label, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}
