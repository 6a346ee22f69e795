/// Behaviour an entity type opts into. Each capability maps to one hidden
/// column and one row predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    SoftDeletable,
    TenantScoped,
}

impl Capability {
    pub const ALL: [Capability; 2] = [Capability::SoftDeletable, Capability::TenantScoped];

    const fn bit(self) -> u8 {
        match self {
            Capability::SoftDeletable => 0b01,
            Capability::TenantScoped => 0b10,
        }
    }
}

/// Small set of [`Capability`] values, usable in `const` position:
///
/// ```
/// use crudkit_db::{Capabilities, Capability};
///
/// const CAPS: Capabilities = Capabilities::of(&[Capability::SoftDeletable]);
/// assert!(CAPS.contains(Capability::SoftDeletable));
/// assert!(!CAPS.contains(Capability::TenantScoped));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities(u8);

impl Capabilities {
    pub const NONE: Capabilities = Capabilities(0);

    #[must_use]
    pub const fn of(caps: &[Capability]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < caps.len() {
            bits |= caps[i].bit();
            i += 1;
        }
        Self(bits)
    }

    #[must_use]
    pub const fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    #[must_use]
    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterates the contained capabilities in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn empty_set_contains_nothing() {
        assert!(Capabilities::NONE.is_empty());
        assert_eq!(Capabilities::NONE.iter().count(), 0);
    }

    #[test]
    fn with_accumulates() {
        let caps = Capabilities::NONE
            .with(Capability::TenantScoped)
            .with(Capability::SoftDeletable);
        assert_eq!(
            caps.iter().collect::<Vec<_>>(),
            vec![Capability::SoftDeletable, Capability::TenantScoped]
        );
        assert_eq!(caps, Capabilities::of(&Capability::ALL));
    }

    #[test]
    fn duplicates_are_idempotent() {
        let caps = Capabilities::of(&[Capability::SoftDeletable, Capability::SoftDeletable]);
        assert_eq!(caps.iter().count(), 1);
    }
}
