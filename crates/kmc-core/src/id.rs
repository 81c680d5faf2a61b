//! Strongly-typed identifiers.

use std::fmt;

/// Dense integer encoding of a particle type.
///
/// Code 0 is reserved for the wildcard `"*"`; declared types are
/// numbered from 1 in declaration order by [`TypeTable`](crate::TypeTable).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeCode(pub u16);

impl TypeCode {
    /// The wildcard code: matches any type, and leaves a site untouched
    /// when it appears in an after-pattern.
    pub const WILDCARD: TypeCode = TypeCode(0);

    /// Whether this is the wildcard code.
    pub fn is_wildcard(self) -> bool {
        self == Self::WILDCARD
    }

    /// The code as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TypeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for TypeCode {
    fn from(v: u16) -> Self {
        Self(v)
    }
}

/// Identifies a process within the interactions list.
///
/// `ProcessId(n)` corresponds to the n-th process in the input order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(pub u32);

impl ProcessId {
    /// The id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ProcessId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Stable identity of a particle, preserved across moves.
///
/// Allocated sequentially by the configuration; never reused within a
/// simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

impl ParticleId {
    /// The id as a `usize` index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ParticleId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
