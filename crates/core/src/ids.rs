use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! uuid_id {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(Uuid::from_bytes(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                self.0.as_bytes()
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), &self.0.to_string()[..8])
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(SaveId);
uuid_id!(SessionId);

/// Identity of a tree node.
///
/// Positive values are assigned by the backing store. Negative values are
/// session-local and mark nodes that have never been saved.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(i64);

impl NodeId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub fn is_persisted(self) -> bool {
        self.0 > 0
    }

    pub fn is_temporary(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NodeId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Monotonically decreasing allocator for temporary ids, starting at -1.
#[derive(Debug, Clone)]
pub struct TempIds {
    next: i64,
}

impl TempIds {
    pub fn new() -> Self {
        Self { next: -1 }
    }

    /// Resume below every temporary id already present, e.g. after restoring a draft.
    pub fn starting_below(lowest: NodeId) -> Self {
        Self {
            next: lowest.get().min(0) - 1,
        }
    }

    pub fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next -= 1;
        id
    }
}

impl Default for TempIds {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_ids_decrease_from_minus_one() {
        let mut ids = TempIds::new();
        assert_eq!(ids.allocate(), NodeId::new(-1));
        assert_eq!(ids.allocate(), NodeId::new(-2));
        assert_eq!(ids.allocate(), NodeId::new(-3));
    }

    #[test]
    fn resume_below_existing() {
        let mut ids = TempIds::starting_below(NodeId::new(-7));
        assert_eq!(ids.allocate(), NodeId::new(-8));

        let mut ids = TempIds::starting_below(NodeId::new(42));
        assert_eq!(ids.allocate(), NodeId::new(-1));
    }

    #[test]
    fn persisted_vs_temporary() {
        assert!(NodeId::new(3).is_persisted());
        assert!(NodeId::new(-3).is_temporary());
        assert!(!NodeId::new(0).is_persisted());
        assert!(!NodeId::new(0).is_temporary());
    }
}
