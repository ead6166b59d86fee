use std::fmt;

use serde::{Deserialize, Serialize};

use crate::exception::{ExcType, RunError, SimpleException};

/// Error returned when a resource limit is exceeded while allocating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// Maximum number of allocations exceeded.
    Allocation { limit: usize, count: usize },
    /// Maximum memory usage exceeded.
    Memory { limit: usize, used: usize },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allocation { limit, count } => {
                write!(f, "allocation limit exceeded: {count} > {limit}")
            }
            Self::Memory { limit, used } => {
                write!(f, "memory limit exceeded: {used} bytes > {limit} bytes")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

impl From<ResourceError> for RunError {
    fn from(err: ResourceError) -> Self {
        Self::Uncatchable(SimpleException::new_msg(ExcType::MemoryError, err.to_string()))
    }
}

/// Limits applied to heap allocation.
///
/// `None` for a field means no limit. The default is unlimited.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimits {
    /// Maximum number of live-or-freed allocations over the heap's lifetime.
    pub max_allocations: Option<usize>,
    /// Maximum estimated bytes held by live values.
    pub max_memory: Option<usize>,
}

impl ResourceLimits {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn max_allocations(mut self, limit: usize) -> Self {
        self.max_allocations = Some(limit);
        self
    }

    #[must_use]
    pub fn max_memory(mut self, limit: usize) -> Self {
        self.max_memory = Some(limit);
        self
    }
}

/// Enforces [`ResourceLimits`] as the heap allocates and frees values.
#[derive(Debug, Clone, Default)]
pub(crate) struct LimitedTracker {
    limits: ResourceLimits,
    allocation_count: usize,
    current_memory: usize,
}

impl LimitedTracker {
    pub fn new(limits: ResourceLimits) -> Self {
        Self {
            limits,
            allocation_count: 0,
            current_memory: 0,
        }
    }

    /// Called before each allocation; fails without recording anything if a limit would be exceeded.
    ///
    /// The size is passed lazily so the estimate is only computed when a memory limit is set.
    /// Returns the bytes charged, which is zero when memory is not limited.
    pub fn on_allocate(&mut self, get_size: impl FnOnce() -> usize) -> Result<usize, ResourceError> {
        if let Some(limit) = self.limits.max_allocations
            && self.allocation_count >= limit
        {
            return Err(ResourceError::Allocation {
                limit,
                count: self.allocation_count + 1,
            });
        }
        let size = if self.limits.max_memory.is_some() { get_size() } else { 0 };
        if let Some(limit) = self.limits.max_memory {
            let used = self.current_memory + size;
            if used > limit {
                return Err(ResourceError::Memory { limit, used });
            }
        }
        self.allocation_count += 1;
        self.current_memory += size;
        Ok(size)
    }

    /// Called before a live container grows by `bytes`. Returns the bytes charged.
    pub fn on_grow(&mut self, bytes: usize) -> Result<usize, ResourceError> {
        let Some(limit) = self.limits.max_memory else {
            return Ok(0);
        };
        let used = self.current_memory + bytes;
        if used > limit {
            return Err(ResourceError::Memory { limit, used });
        }
        self.current_memory = used;
        Ok(bytes)
    }

    /// Credits bytes previously charged by `on_allocate` or `on_grow`.
    pub fn on_free(&mut self, bytes: usize) {
        self.current_memory = self.current_memory.saturating_sub(bytes);
    }

    pub fn allocation_count(&self) -> usize {
        self.allocation_count
    }

    pub fn current_memory(&self) -> usize {
        self.current_memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_limit_is_inclusive() {
        let mut tracker = LimitedTracker::new(ResourceLimits::new().max_allocations(2));
        assert!(tracker.on_allocate(|| 8).is_ok());
        assert!(tracker.on_allocate(|| 8).is_ok());
        assert_eq!(
            tracker.on_allocate(|| 8),
            Err(ResourceError::Allocation { limit: 2, count: 3 })
        );
        assert_eq!(tracker.allocation_count(), 2);
    }

    #[test]
    fn memory_is_released_on_free() {
        let mut tracker = LimitedTracker::new(ResourceLimits::new().max_memory(100));
        tracker.on_allocate(|| 60).unwrap();
        assert!(matches!(tracker.on_allocate(|| 60), Err(ResourceError::Memory { .. })));
        tracker.on_free(60);
        assert_eq!(tracker.current_memory(), 0);
        tracker.on_allocate(|| 60).unwrap();
    }

    #[test]
    fn growth_is_only_charged_under_a_memory_limit() {
        let mut unlimited = LimitedTracker::new(ResourceLimits::new());
        assert_eq!(unlimited.on_grow(1 << 20), Ok(0));
        assert_eq!(unlimited.current_memory(), 0);

        let mut tracker = LimitedTracker::new(ResourceLimits::new().max_memory(100));
        assert_eq!(tracker.on_grow(70), Ok(70));
        assert_eq!(tracker.on_grow(40), Err(ResourceError::Memory { limit: 100, used: 110 }));
        assert_eq!(tracker.current_memory(), 70);
    }

    #[test]
    fn resource_error_becomes_uncatchable_memory_error() {
        let err: RunError = ResourceError::Allocation { limit: 1, count: 2 }.into();
        assert_eq!(err.exc_type(), ExcType::MemoryError);
        assert_eq!(err.message(), Some("allocation limit exceeded: 2 > 1"));
    }
}
