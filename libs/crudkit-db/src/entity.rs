use std::fmt::Debug;
use std::hash::Hash;

use uuid::Uuid;

use crate::capability::Capabilities;

/// How storage produces a key for a freshly inserted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyStrategy {
    /// The store assigns the next value of a sequence (auto-increment).
    Sequence,
    /// The storage layer generates the key itself before inserting.
    Generated,
}

/// Primary key of an [`Entity`]. `Default` is the "unset" key.
pub trait EntityKey: Clone + Eq + Hash + Debug + Default + Send + Sync + 'static {
    const STRATEGY: KeyStrategy;

    /// Converts a sequence value; `None` when it does not fit the key type.
    fn from_sequence(value: u64) -> Option<Self>;

    /// Fresh key for [`KeyStrategy::Generated`] keys.
    #[must_use]
    fn generate() -> Self {
        Self::default()
    }
}

macro_rules! sequence_key {
    ($($t:ty),* $(,)?) => {
        $(
            impl EntityKey for $t {
                const STRATEGY: KeyStrategy = KeyStrategy::Sequence;

                fn from_sequence(value: u64) -> Option<Self> {
                    <$t>::try_from(value).ok()
                }
            }
        )*
    };
}

sequence_key!(i32, i64, u64);

impl EntityKey for Uuid {
    const STRATEGY: KeyStrategy = KeyStrategy::Generated;

    fn from_sequence(_value: u64) -> Option<Self> {
        None
    }

    fn generate() -> Self {
        Uuid::now_v7()
    }
}

/// A persisted record with a single primary key.
///
/// `CAPABILITIES` classifies the type for row filtering; it replaces marker
/// interfaces with a const set checked at registration time.
pub trait Entity: Clone + Send + Sync + 'static {
    type Key: EntityKey;

    /// Name used in diagnostics.
    const NAME: &'static str;
    const CAPABILITIES: Capabilities;

    fn id(&self) -> Self::Key;
    fn set_id(&mut self, id: Self::Key);

    /// Puts the key back to its unset value so storage assigns a new one.
    fn reset_id(&mut self) {
        self.set_id(Self::Key::default());
    }
}
