use std::ops::BitOr;

use serde::{Deserialize, Serialize};

/// Bit set of per-revision deletion markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeletionFlags(u8);

impl DeletionFlags {
    /// Revision text is hidden.
    pub const TEXT: Self = Self(1);
    /// Edit summary is hidden.
    pub const COMMENT: Self = Self(1 << 1);
    /// Author is hidden.
    pub const USER: Self = Self(1 << 2);
    /// Hidden fields are also hidden from administrators (suppression).
    pub const RESTRICTED: Self = Self(1 << 3);

    /// No field hidden.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Rebuild flags from raw storage bits, discarding unknown bits.
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    /// Raw storage bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Whether all bits of `other` are set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union of two flag sets.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for DeletionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

/// Requester permissions consulted by the visibility gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// May view text hidden by revision deletion.
    DeletedText,
    /// May view text that is also suppressed.
    ViewSuppressed,
    /// May browse the archive of deleted revisions.
    DeletedHistory,
}

/// Notice attached to a diff whose text the requester could only see by
/// explicitly unhiding deleted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionNotice {
    /// At least one side is suppressed, not merely deleted.
    pub suppressed: bool,
}
