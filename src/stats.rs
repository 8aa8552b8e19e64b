use std::ops::AddAssign;

/// Control block bookkeeping, for diagnosing leaks and the like.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats
{
    /// Control blocks allocated through the registry.
    pub allocated: usize,

    /// Control blocks freed because both of their counts reached zero.
    pub freed: usize,

    /// Control blocks freed forcibly by `Registry::teardown`.
    pub torn_down: usize,

    /// Control blocks still registered when their registry was dropped.
    pub leaked: usize,
}

#[allow(dead_code)]
impl Stats
{
    /// Number of control blocks neither freed nor torn down.
    pub fn live(&self) -> usize { self.allocated - self.freed - self.torn_down }

    /// True if no block ever had to be reclaimed by the safety net.
    pub fn is_clean(&self) -> bool { self.torn_down == 0 && self.leaked == 0 }
}

impl AddAssign for Stats
{
    fn add_assign(&mut self, rhs: Self)
    {
        self.allocated += rhs.allocated;
        self.freed += rhs.freed;
        self.torn_down += rhs.torn_down;
        self.leaked += rhs.leaked;
    }
}

#[cfg(feature = "global")]
mod global
{
    use super::Stats;
    use lazy_static::lazy_static;
    use parking_lot::Mutex;

    lazy_static! {
        static ref GLOBAL_STATS: Mutex<Stats> = Mutex::new(Stats::default());
    }

    pub(crate) fn merge(it: Stats) { *GLOBAL_STATS.lock() += it }

    /// Totals of every registry dropped so far, across all threads.
    pub fn global_stats() -> Stats { *GLOBAL_STATS.lock() }
}

#[cfg(feature = "global")]
pub use global::global_stats;
#[cfg(feature = "global")]
pub(crate) use global::merge;

#[cfg(not(feature = "global"))]
pub(crate) fn merge(_: Stats) {}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn live_excludes_reclaimed()
    {
        let mut s = Stats {
            allocated: 5,
            freed: 2,
            torn_down: 1,
            leaked: 0,
        };
        assert_eq!(s.live(), 2);
        assert!(!s.is_clean());

        s += Stats {
            allocated: 1,
            ..Stats::default()
        };
        assert_eq!(s.allocated, 6);
        assert_eq!(s.live(), 3);
    }
}
