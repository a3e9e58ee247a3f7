use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Four independent permission bits of a node.
///
/// Callers should rely on the named constants and predicates only, never on bit positions.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Permissions(u8);

impl Permissions {
    pub const READ: Permissions = Permissions(0b0001);
    pub const UPDATE: Permissions = Permissions(0b0010);
    /// Only meaningful for folders.
    pub const CREATE: Permissions = Permissions(0b0100);
    pub const DELETE: Permissions = Permissions(0b1000);

    pub const fn empty() -> Self {
        Permissions(0)
    }

    pub const fn all() -> Self {
        Permissions(0b1111)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Builds a mask from raw bits, dropping unknown ones.
    pub const fn from_bits(bits: u8) -> Self {
        Permissions(bits & 0b1111)
    }

    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn union(self, other: Permissions) -> Self {
        Permissions(self.0 | other.0)
    }

    pub const fn difference(self, other: Permissions) -> Self {
        Permissions(self.0 & !other.0)
    }

    /// Sets or clears `other` depending on `value`.
    pub fn set(&mut self, other: Permissions, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl BitOrAssign for Permissions {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |p: Permissions, c: char| if self.contains(p) { c } else { '-' };
        write!(
            f,
            "Permissions({}{}{}{})",
            flag(Permissions::READ, 'r'),
            flag(Permissions::UPDATE, 'u'),
            flag(Permissions::CREATE, 'c'),
            flag(Permissions::DELETE, 'd'),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_are_independent() {
        let mut perms = Permissions::READ | Permissions::DELETE;
        assert!(perms.contains(Permissions::READ));
        assert!(!perms.contains(Permissions::UPDATE));
        assert!(!perms.contains(Permissions::CREATE));
        assert!(perms.contains(Permissions::DELETE));

        perms.set(Permissions::READ, false);
        perms.set(Permissions::CREATE, true);
        assert_eq!(perms, Permissions::CREATE | Permissions::DELETE);
    }

    #[test]
    fn test_from_bits_drops_unknown() {
        assert_eq!(Permissions::from_bits(0xff), Permissions::all());
        assert!(Permissions::from_bits(0xf0).is_empty());
    }

    #[test]
    fn test_debug_format() {
        let perms = Permissions::READ | Permissions::CREATE;
        assert_eq!(format!("{:?}", perms), "Permissions(r-c-)");
    }
}
