use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open slice `[min, max)` of the distribution-key (token) space.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct PartitionRange {
    pub min: i128,
    pub max: i128,
}

impl PartitionRange {
    pub fn new(min: i128, max: i128) -> Result<Self, String> {
        if min >= max {
            return Err(format!("Partition range min {} must be below max {}", min, max));
        }
        Ok(Self { min, max })
    }

    /// Murmur3 token space. The top token is excluded by the half-open bound.
    pub fn murmur3_full() -> Self {
        Self {
            min: i64::MIN as i128,
            max: i64::MAX as i128,
        }
    }

    pub fn contains(&self, token: i128) -> bool {
        token >= self.min && token < self.max
    }

    pub fn width(&self) -> i128 {
        self.max - self.min
    }

    /// Splits into `parts` contiguous sub-ranges covering exactly this range.
    /// Fewer parts are returned when the range is narrower than `parts`.
    pub fn split(&self, parts: usize) -> Vec<PartitionRange> {
        let parts = (parts.max(1) as i128).min(self.width()).max(1);
        let step = self.width() / parts;
        let mut ranges = Vec::with_capacity(parts as usize);
        let mut start = self.min;
        for index in 0..parts {
            let end = if index == parts - 1 {
                self.max
            } else {
                start + step
            };
            ranges.push(PartitionRange {
                min: start,
                max: end,
            });
            start = end;
        }
        ranges
    }
}

impl fmt::Display for PartitionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{})", self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_range() {
        assert!(PartitionRange::new(5, 5).is_err());
        assert!(PartitionRange::new(6, 5).is_err());
        assert!(PartitionRange::new(-5, 5).is_ok());
    }

    #[test]
    fn test_contains_is_half_open() {
        let range = PartitionRange::new(0, 10).unwrap();
        assert!(range.contains(0));
        assert!(range.contains(9));
        assert!(!range.contains(10));
        assert!(!range.contains(-1));
    }

    #[test]
    fn test_split_covers_range_without_gaps() {
        let range = PartitionRange::new(-100, 101).unwrap();
        let parts = range.split(4);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts.first().map(|p| p.min), Some(-100));
        assert_eq!(parts.last().map(|p| p.max), Some(101));
        for pair in parts.windows(2) {
            assert_eq!(pair[0].max, pair[1].min);
        }
    }

    #[test]
    fn test_split_narrow_range() {
        let range = PartitionRange::new(0, 2).unwrap();
        assert_eq!(range.split(10).len(), 2);
        assert_eq!(range.split(0).len(), 1);
    }

    #[test]
    fn test_full_range_split() {
        let parts = PartitionRange::murmur3_full().split(3);
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].min, i64::MIN as i128);
        assert_eq!(parts[2].max, i64::MAX as i128);
    }
}
