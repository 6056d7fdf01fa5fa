//! Static partitioning of loops between the processes of a pool.
//!
//! A pool contains `pool_size` processes, arranged in one or more groups. Each
//! loop over cells or molecules is split between processes according to a
//! [`DivisionStrategy`], giving every process a [`LoopRange`] to iterate
//! over. Within a single process, the work is further distributed between
//! threads with rayon.

use log::warn;

use crate::Error;

/// How to split a loop between the processes of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
pub enum DivisionStrategy {
    /// Split the loop between process groups, every process in a group runs
    /// the same iterations
    Groups,
    /// Split the loop between the processes of the current group
    GroupProcesses,
    /// Split the loop between all processes in the pool
    Pool,
    /// Do not split the loop, each process runs all iterations
    PoolProcesses,
}

impl DivisionStrategy {
    /// Get the strategy to use for loops nested inside a loop using this
    /// strategy.
    pub fn sub_division(self) -> DivisionStrategy {
        match self {
            DivisionStrategy::Groups => DivisionStrategy::GroupProcesses,
            DivisionStrategy::Pool => DivisionStrategy::PoolProcesses,
            DivisionStrategy::GroupProcesses => {
                warn!("can not sub-divide the GroupProcesses strategy any further");
                DivisionStrategy::GroupProcesses
            }
            DivisionStrategy::PoolProcesses => DivisionStrategy::PoolProcesses,
        }
    }
}

/// Range of loop iterations assigned to a process: `start, start + stride,
/// start + 2 * stride, ...`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopRange {
    pub start: usize,
    pub stride: usize,
}

impl LoopRange {
    /// Loop range covering all iterations
    pub fn all() -> LoopRange {
        LoopRange { start: 0, stride: 1 }
    }

    /// Get the iterations of a loop over `count` items assigned to this range
    pub fn indexes(&self, count: usize) -> impl Iterator<Item = usize> {
        (self.start..count).step_by(self.stride)
    }

    /// Collect the iterations of a loop over `count` items, to be consumed by
    /// a parallel iterator
    pub fn collect(&self, count: usize) -> Vec<usize> {
        self.indexes(count).collect()
    }
}

/// Description of the processes participating in a calculation, and the
/// position of the current process among them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessPool {
    /// rank of this process in the pool
    pool_rank: usize,
    /// number of processes in the pool
    pool_size: usize,
    /// number of processes in each group
    group_sizes: Vec<usize>,
    /// index of the group containing this process
    group_index: usize,
    /// rank of this process in its group
    group_rank: usize,
}

impl Default for ProcessPool {
    fn default() -> Self {
        ProcessPool::serial()
    }
}

impl ProcessPool {
    /// Pool made of the current process only
    pub fn serial() -> ProcessPool {
        ProcessPool {
            pool_rank: 0,
            pool_size: 1,
            group_sizes: vec![1],
            group_index: 0,
            group_rank: 0,
        }
    }

    /// Create a pool of `pool_size` processes split into `n_groups` groups of
    /// consecutive ranks, as seen by the process with rank `pool_rank`.
    pub fn new(pool_rank: usize, pool_size: usize, n_groups: usize) -> Result<ProcessPool, Error> {
        if pool_size == 0 || pool_rank >= pool_size {
            return Err(Error::InvalidParameter(format!(
                "invalid process rank {} for a pool of {} processes", pool_rank, pool_size
            )));
        }

        if n_groups == 0 || n_groups > pool_size {
            return Err(Error::InvalidParameter(format!(
                "can not split {} processes into {} groups", pool_size, n_groups
            )));
        }

        let base = pool_size / n_groups;
        let remainder = pool_size % n_groups;
        let group_sizes = (0..n_groups)
            .map(|group| if group < remainder { base + 1 } else { base })
            .collect::<Vec<_>>();

        let mut first_rank = 0;
        let mut group_index = 0;
        for (group, &size) in group_sizes.iter().enumerate() {
            if pool_rank < first_rank + size {
                group_index = group;
                break;
            }
            first_rank += size;
        }

        return Ok(ProcessPool {
            pool_rank: pool_rank,
            pool_size: pool_size,
            group_sizes: group_sizes,
            group_index: group_index,
            group_rank: pool_rank - first_rank,
        });
    }

    pub fn pool_rank(&self) -> usize {
        self.pool_rank
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    pub fn n_groups(&self) -> usize {
        self.group_sizes.len()
    }

    pub fn group_index(&self) -> usize {
        self.group_index
    }

    pub fn group_rank(&self) -> usize {
        self.group_rank
    }

    /// Get the loop iterations assigned to this process for the given
    /// `strategy`
    pub fn loop_range(&self, strategy: DivisionStrategy) -> LoopRange {
        match strategy {
            DivisionStrategy::Groups => LoopRange {
                start: self.group_index,
                stride: self.group_sizes.len(),
            },
            DivisionStrategy::GroupProcesses => LoopRange {
                start: self.group_rank,
                stride: self.group_sizes[self.group_index],
            },
            DivisionStrategy::Pool => LoopRange {
                start: self.pool_rank,
                stride: self.pool_size,
            },
            DivisionStrategy::PoolProcesses => LoopRange::all(),
        }
    }

    /// Get the best strategy for the top-level loops
    pub fn best_strategy(&self) -> DivisionStrategy {
        if self.group_sizes.len() > 1 {
            DivisionStrategy::Groups
        } else {
            DivisionStrategy::Pool
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial() {
        let pool = ProcessPool::serial();
        for strategy in [DivisionStrategy::Groups, DivisionStrategy::GroupProcesses, DivisionStrategy::Pool, DivisionStrategy::PoolProcesses] {
            assert_eq!(pool.loop_range(strategy), LoopRange::all());
        }
        assert_eq!(pool.best_strategy(), DivisionStrategy::Pool);
        assert_eq!(LoopRange::all().collect(4), [0, 1, 2, 3]);
    }

    #[test]
    fn groups() {
        assert!(ProcessPool::new(3, 3, 1).is_err());
        assert!(ProcessPool::new(0, 3, 4).is_err());
        assert!(ProcessPool::new(0, 0, 1).is_err());

        // 5 processes in 2 groups: [0, 1, 2] and [3, 4]
        let pool = ProcessPool::new(4, 5, 2).unwrap();
        assert_eq!(pool.group_index(), 1);
        assert_eq!(pool.group_rank(), 1);
        assert_eq!(pool.best_strategy(), DivisionStrategy::Groups);

        assert_eq!(pool.loop_range(DivisionStrategy::Groups), LoopRange { start: 1, stride: 2 });
        assert_eq!(pool.loop_range(DivisionStrategy::GroupProcesses), LoopRange { start: 1, stride: 2 });
        assert_eq!(pool.loop_range(DivisionStrategy::Pool), LoopRange { start: 4, stride: 5 });
        assert_eq!(pool.loop_range(DivisionStrategy::Pool).collect(12), [4, 9]);

        let pool = ProcessPool::new(2, 5, 2).unwrap();
        assert_eq!(pool.group_index(), 0);
        assert_eq!(pool.group_rank(), 2);
        assert_eq!(pool.loop_range(DivisionStrategy::GroupProcesses), LoopRange { start: 2, stride: 3 });
    }

    #[test]
    fn ranges_cover_all_iterations() {
        let mut seen = vec![0; 23];
        for rank in 0..4 {
            let pool = ProcessPool::new(rank, 4, 1).unwrap();
            for i in pool.loop_range(DivisionStrategy::Pool).indexes(seen.len()) {
                seen[i] += 1;
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn sub_division() {
        assert_eq!(DivisionStrategy::Groups.sub_division(), DivisionStrategy::GroupProcesses);
        assert_eq!(DivisionStrategy::Pool.sub_division(), DivisionStrategy::PoolProcesses);
        assert_eq!(DivisionStrategy::GroupProcesses.sub_division(), DivisionStrategy::GroupProcesses);
    }
}
