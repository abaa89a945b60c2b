use crate::ConfigError;

/// Residue class `k-1 mod n` of input row ids owned by one worker.
///
/// Workers over distinct `k` with the same `n` touch disjoint rows, so they
/// can run side by side without coordinating.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    k: u64,
    n: u64,
}

impl Partition {
    pub fn new(k: u64, n: u64) -> Result<Self, ConfigError> {
        if n == 0 || k == 0 || k > n {
            return Err(ConfigError::BadPartition { k, n });
        }
        Ok(Self { k, n })
    }

    /// The single partition that owns every row.
    pub fn whole() -> Self {
        Self { k: 1, n: 1 }
    }

    pub fn k(&self) -> u64 {
        self.k
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn contains(&self, id: i64) -> bool {
        let n = i128::from(self.n);
        i128::from(id).rem_euclid(n) == i128::from(self.k - 1)
    }

    /// Keeps the items whose id falls in this partition, preserving order.
    pub fn select<T>(&self, items: impl IntoIterator<Item = T>, id: impl Fn(&T) -> i64) -> Vec<T> {
        items.into_iter().filter(|item| self.contains(id(item))).collect()
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::whole()
    }
}
