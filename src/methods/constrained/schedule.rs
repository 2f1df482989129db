use ahash::AHashMap;

use crate::{config::ThresholdMap, error::{Error, Result}};

#[derive(Debug, Clone, PartialEq)]
struct ScheduledClass {
    label: String,
    threshold: f64,
}

/// Capped classes in processing order: ascending threshold, ties in class map insertion order.
///
/// Sorted once; a class's slot is its position in that order, and the allocator walks
/// slots front to back so each class is consumed exactly once.
#[derive(Debug, Clone, Default)]
pub struct ClassSchedule {
    classes: Vec<ScheduledClass>,
    slots: AHashMap<String, usize>,
}

impl ClassSchedule {
    pub fn new(thresholds: &ThresholdMap) -> Result<Self> {
        let mut classes = Vec::with_capacity(thresholds.len());
        for (label, rule) in thresholds.iter() {
            let Some(threshold) = rule.threshold() else { continue };
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(Error::InvalidConfig(format!("class {label:?} has threshold {threshold}")));
            }
            classes.push(ScheduledClass { label: label.to_string(), threshold });
        }

        // stable: equal thresholds keep insertion order
        classes.sort_by(|a, b| a.threshold.total_cmp(&b.threshold));

        let slots = classes.iter().enumerate()
            .map(|(slot, class)| (class.label.clone(), slot))
            .collect();
        Ok(Self { classes, slots })
    }

    #[inline] pub fn len(&self) -> usize { self.classes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.classes.is_empty() }

    /// Class labels in the order they are processed.
    pub fn order(&self) -> Vec<&str> {
        self.classes.iter().map(|class| class.label.as_str()).collect()
    }

    #[inline] pub(crate) fn slot(&self, label: &str) -> Option<usize> { self.slots.get(label).copied() }

    #[inline] pub(crate) fn label(&self, slot: usize) -> &str { &self.classes[slot].label }

    #[inline] pub(crate) fn threshold(&self, slot: usize) -> f64 { self.classes[slot].threshold }
}
