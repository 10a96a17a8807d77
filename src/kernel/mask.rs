// Task and event identities as one-bit-per-slot masks
//
// A task is one bit of a 32-bit word. TaskId is the bounded index,
// TaskSet/EventSet are the sets; the scheduler only ever works on
// whole words so every pending/enable/fairness update stays O(1).

use core::fmt;
use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not, Sub};

/// Hard upper bound on task slots (one bit each in a `u32`).
pub const MAX_TASKS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdError {
    /// Index does not fit in a 32-bit mask
    OutOfRange(u8),
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdError::OutOfRange(index) => {
                write!(f, "task index {} out of range (max {})", index, MAX_TASKS - 1)
            }
        }
    }
}

/// Bounded task slot index, 0..32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u8);

impl TaskId {
    /// Out-of-range indices are a caller contract violation: asserted in
    /// debug builds. In release the id maps to no slot and an empty mask,
    /// so every operation on it is a no-op. Use `try_from` for untrusted
    /// input.
    pub const fn new(index: u8) -> Self {
        debug_assert!((index as usize) < MAX_TASKS, "task index out of range");
        Self(index)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn bit(self) -> u32 {
        match 1u32.checked_shl(self.0 as u32) {
            Some(bit) => bit,
            None => 0,
        }
    }
}

impl TryFrom<u8> for TaskId {
    type Error = IdError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        if (index as usize) < MAX_TASKS {
            Ok(Self(index))
        } else {
            Err(IdError::OutOfRange(index))
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// shared set algebra for both mask domains
macro_rules! bitset {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
        pub struct $name(u32);

        impl $name {
            pub const EMPTY: Self = Self(0);
            pub const ALL: Self = Self(u32::MAX);

            #[inline]
            pub const fn from_bits(bits: u32) -> Self {
                Self(bits)
            }

            #[inline]
            pub const fn bits(self) -> u32 {
                self.0
            }

            #[inline]
            pub const fn is_empty(self) -> bool {
                self.0 == 0
            }

            #[inline]
            pub const fn intersects(self, other: Self) -> bool {
                self.0 & other.0 != 0
            }

            /// Every member of `other` is also in `self`.
            #[inline]
            pub const fn contains_all(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            #[inline]
            pub const fn union(self, other: Self) -> Self {
                Self(self.0 | other.0)
            }

            #[inline]
            pub const fn intersection(self, other: Self) -> Self {
                Self(self.0 & other.0)
            }

            #[inline]
            pub const fn difference(self, other: Self) -> Self {
                Self(self.0 & !other.0)
            }
        }

        impl BitAnd for $name {
            type Output = Self;
            fn bitand(self, rhs: Self) -> Self {
                self.intersection(rhs)
            }
        }

        impl BitAndAssign for $name {
            fn bitand_assign(&mut self, rhs: Self) {
                self.0 &= rhs.0;
            }
        }

        impl BitOr for $name {
            type Output = Self;
            fn bitor(self, rhs: Self) -> Self {
                self.union(rhs)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                self.difference(rhs)
            }
        }

        impl Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self(!self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:#010x}", self.0)
            }
        }
    };
}

bitset!(TaskSet);
bitset!(EventSet);

impl TaskSet {
    #[inline]
    pub const fn only(id: TaskId) -> Self {
        Self(id.bit())
    }

    /// The first `n` task slots.
    pub const fn first(n: usize) -> Self {
        if n >= MAX_TASKS {
            Self::ALL
        } else {
            Self((1u32 << n) - 1)
        }
    }

    #[inline]
    pub const fn contains(self, id: TaskId) -> bool {
        self.0 & id.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, id: TaskId) {
        self.0 |= id.bit();
    }

    #[inline]
    pub fn remove(&mut self, id: TaskId) {
        self.0 &= !id.bit();
    }

    /// Lowest-numbered member; the scheduler's deterministic tie-break.
    #[inline]
    pub const fn lowest(self) -> Option<TaskId> {
        if self.0 == 0 {
            None
        } else {
            Some(TaskId(self.0.trailing_zeros() as u8))
        }
    }

    pub fn iter(self) -> impl Iterator<Item = TaskId> {
        let mut rest = self;
        core::iter::from_fn(move || {
            let id = rest.lowest()?;
            rest.remove(id);
            Some(id)
        })
    }
}

impl From<TaskId> for TaskSet {
    fn from(id: TaskId) -> Self {
        Self::only(id)
    }
}

impl EventSet {
    /// Single event `n` (0..32); empty past that in release builds.
    pub const fn bit(n: u8) -> Self {
        debug_assert!(n < 32, "event index out of range");
        match 1u32.checked_shl(n as u32) {
            Some(bit) => Self(bit),
            None => Self::EMPTY,
        }
    }
}
