/// Simple axiomatic model of a control block.
///
/// Every operation on handles is viewed in terms of how it changes the
/// counts of one control block and the liveness of its object. The state of
/// the world for one allocation is the four-tuple below.
///
/// Each axiom asserts its preconditions and returns the post-state, so a
/// sequence of handle operations can be replayed on the model and compared
/// with the real counts.
#[allow(dead_code)]
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axioms
{
    /// Number of live `Shared` handles.
    pub strong: usize,

    /// Number of live `Weak` handles.
    pub weak: usize,

    /// Whether the managed object has not been dropped yet.
    pub object: bool,

    /// Whether the control block has not been freed yet.
    pub block: bool,
}

#[allow(dead_code)]
impl Axioms
{
    /// Nothing is allocated and nothing refers to it.
    ///
    /// ```notest
    /// Self {
    ///     strong: 0,
    ///     weak: 0,
    ///     object: false,
    ///     block: false,
    /// }
    /// ```
    pub fn unallocated() -> Self
    {
        Self {
            strong: 0,
            weak: 0,
            object: false,
            block: false,
        }
    }

    /// Construction allocates the object and a block with one strong
    /// reference.
    ///
    /// ```notest
    /// assert!(!self.object && !self.block);
    /// self.strong = 1;
    /// self.object = true;
    /// self.block = true;
    /// self
    /// ```
    ///
    /// Sequencing property:
    ///
    /// ```
    /// sharedref::Axioms::unallocated().construct().drop_strong().reclaimed();
    /// ```
    pub fn construct(mut self) -> Self
    {
        assert!(!self.object && !self.block);
        assert_eq!(self.strong + self.weak, 0);
        self.strong = 1;
        self.object = true;
        self.block = true;
        self
    }

    /// Cloning a `Shared`, or locking a live `Weak`, adds a strong reference.
    ///
    /// ```notest
    /// assert!(self.strong >= 1);
    /// self.strong += 1;
    /// self
    /// ```
    pub fn clone_strong(mut self) -> Self
    {
        assert!(self.strong >= 1 && self.object);
        self.strong += 1;
        self
    }

    /// Dropping a `Shared` removes a strong reference. The last one drops
    /// the object, and frees the block if no weak reference is left.
    ///
    /// ```notest
    /// assert!(self.strong >= 1);
    /// self.strong -= 1;
    /// if self.strong == 0 {
    ///     self.object = false;
    ///     self.block = self.weak > 0;
    /// }
    /// self
    /// ```
    pub fn drop_strong(mut self) -> Self
    {
        assert!(self.strong >= 1 && self.object && self.block);
        self.strong -= 1;
        if self.strong == 0 {
            self.object = false;
            self.block = self.weak > 0;
        }
        self
    }

    /// Downgrading a `Shared` adds a weak reference.
    ///
    /// ```notest
    /// assert!(self.strong >= 1);
    /// self.weak += 1;
    /// self
    /// ```
    pub fn downgrade(mut self) -> Self
    {
        assert!(self.strong >= 1 && self.block);
        self.weak += 1;
        self
    }

    /// Cloning a `Weak` adds a weak reference, expired or not.
    pub fn clone_weak(mut self) -> Self
    {
        assert!(self.weak >= 1 && self.block);
        self.weak += 1;
        self
    }

    /// Dropping a `Weak` always removes a weak reference. The block is freed
    /// once both counts are zero.
    ///
    /// ```notest
    /// assert!(self.weak >= 1);
    /// self.weak -= 1;
    /// self.block = self.strong + self.weak > 0;
    /// self
    /// ```
    pub fn drop_weak(mut self) -> Self
    {
        assert!(self.weak >= 1 && self.block);
        self.weak -= 1;
        self.block = self.strong + self.weak > 0;
        self
    }

    /// Locking a `Weak` succeeds exactly when the object is still alive.
    ///
    /// ```notest
    /// if !self.expired() {
    ///     self.strong += 1;
    /// }
    /// self
    /// ```
    pub fn lock(self) -> Self
    {
        assert!(self.weak >= 1 && self.block);
        if self.expired() {
            self
        } else {
            self.clone_strong()
        }
    }

    /// Assigning a `Shared` to a handle on the same object changes nothing.
    pub fn assign_same(self) -> Self
    {
        assert!(self.strong >= 1 && self.object);
        self
    }

    /// A weak reference is expired iff no strong reference is left.
    pub fn expired(&self) -> bool { self.strong == 0 }

    /// Everything has been released and nothing leaked.
    ///
    /// ```notest
    /// assert_eq!(self.strong + self.weak, 0);
    /// assert!(!self.object && !self.block);
    /// ```
    pub fn reclaimed(self)
    {
        assert_eq!(self.strong + self.weak, 0);
        assert!(!self.object && !self.block);
    }

    /// A weak reference released while the object is alive must not keep
    /// the block around afterwards:
    ///
    /// ```notest
    /// Self::unallocated()
    ///     .construct()
    ///     .downgrade()
    ///     .drop_weak()
    ///     .drop_strong()
    ///     .reclaimed()
    /// ```
    ///
    /// Proof: the following doctest passes
    ///
    /// ```
    /// sharedref::Axioms::weak_released_first()
    /// ```
    pub fn weak_released_first()
    {
        Self::unallocated()
            .construct()
            .downgrade()
            .drop_weak()
            .drop_strong()
            .reclaimed()
    }

    /// A weak reference outliving every strong one keeps the block, not the
    /// object, and can no longer resurrect it:
    ///
    /// ```notest
    /// Self::unallocated()
    ///     .construct()
    ///     .downgrade()
    ///     .drop_strong()
    ///     .lock()
    ///     .drop_weak()
    ///     .reclaimed()
    /// ```
    ///
    /// Proof: the following doctest passes
    ///
    /// ```
    /// sharedref::Axioms::weak_outlives_strong()
    /// ```
    pub fn weak_outlives_strong()
    {
        let s = Self::unallocated().construct().downgrade().drop_strong();
        assert!(s.expired() && !s.object && s.block);
        s.lock().drop_weak().reclaimed()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn proofs()
    {
        Axioms::weak_released_first();
        Axioms::weak_outlives_strong();
    }

    #[test]
    #[should_panic]
    fn cannot_lock_without_weak()
    {
        let _ = Axioms::unallocated().construct().lock();
    }
}
