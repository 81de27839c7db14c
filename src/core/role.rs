//! # Pipeline roles.
//!
//! A pipeline generation has exactly two sides. [`Role`] names them and knows
//! which pipe end and which standard stream each side binds.

use std::fmt;

/// Side of a `producer | consumer` pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Writes to its standard output (the pipe's write end).
    Producer,
    /// Reads from its standard input (the pipe's read end).
    Consumer,
}

impl Role {
    /// Both roles, in launch order.
    pub const ALL: [Role; 2] = [Role::Producer, Role::Consumer];

    /// Returns a short stable label for logs and events.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Producer => "producer",
            Role::Consumer => "consumer",
        }
    }

    /// Returns the other side of the pipeline.
    pub fn sibling(self) -> Role {
        match self {
            Role::Producer => Role::Consumer,
            Role::Consumer => Role::Producer,
        }
    }

    /// Slot index used by per-generation bookkeeping.
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Role::Producer => 0,
            Role::Consumer => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_is_involution() {
        for role in Role::ALL {
            assert_ne!(role, role.sibling());
            assert_eq!(role, role.sibling().sibling());
        }
    }

    #[test]
    fn test_indices_are_distinct() {
        assert_eq!(Role::Producer.index(), 0);
        assert_eq!(Role::Consumer.index(), 1);
        assert_eq!(Role::Consumer.to_string(), "consumer");
    }
}
