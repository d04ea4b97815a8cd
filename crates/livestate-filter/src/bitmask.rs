use std::fmt;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Set of small enumerated values: bit `k` stands for the `k`-th value of a
/// column's domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Bitmask(pub u32);

impl Bitmask {
    pub const WIDTH: u32 = u32::BITS;
    pub const EMPTY: Bitmask = Bitmask(0);
    pub const ALL: Bitmask = Bitmask(u32::MAX);

    /// Mask with only bit `k` set; empty if `k` is out of range.
    pub fn bit(k: u32) -> Self {
        Bitmask(1u32.checked_shl(k).unwrap_or(0))
    }

    /// Mask with the lowest `n` bits set.
    pub fn low_bits(n: u32) -> Self {
        if n >= Self::WIDTH {
            Self::ALL
        } else {
            Bitmask((1u32 << n) - 1)
        }
    }

    pub fn contains_bit(&self, k: u32) -> bool {
        k < Self::WIDTH && self.0 & (1 << k) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn count(&self) -> u32 {
        self.0.count_ones()
    }

    pub fn bits(&self) -> u32 {
        self.0
    }
}

impl BitAnd for Bitmask {
    type Output = Bitmask;

    fn bitand(self, rhs: Self) -> Self::Output {
        Bitmask(self.0 & rhs.0)
    }
}

impl BitAndAssign for Bitmask {
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl BitOr for Bitmask {
    type Output = Bitmask;

    fn bitor(self, rhs: Self) -> Self::Output {
        Bitmask(self.0 | rhs.0)
    }
}

impl BitOrAssign for Bitmask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl Not for Bitmask {
    type Output = Bitmask;

    fn not(self) -> Self::Output {
        Bitmask(!self.0)
    }
}

impl fmt::Display for Bitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl fmt::Binary for Bitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Binary::fmt(&self.0, f)
    }
}
