//! Outcomes of existence probes and idempotent creation.

/// Result of probing the remote system for an entity.
///
/// Only the server's explicit not-found signal becomes [`Lookup::NotFound`];
/// every other failure is an `Err` on the surrounding `Result`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The entity exists.
    Found(T),
    /// The server reported the entity as absent.
    NotFound,
}

impl<T> Lookup<T> {
    /// Returns whether the entity was found.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Converts into an `Option`.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(v) => Some(v),
            Self::NotFound => None,
        }
    }

    /// Maps the found value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Self::Found(v) => Lookup::Found(f(v)),
            Self::NotFound => Lookup::NotFound,
        }
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::NotFound, Self::Found)
    }
}

/// Result of an idempotent `ensure`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured<T> {
    /// The entity was absent and has been created.
    Created(T),
    /// The entity already existed and was left untouched.
    Existing(T),
}

impl<T> Ensured<T> {
    /// Returns whether this call created the entity.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        matches!(self, Self::Created(_))
    }

    /// Borrows the entity.
    pub const fn entity(&self) -> &T {
        match self {
            Self::Created(v) | Self::Existing(v) => v,
        }
    }

    /// Consumes the outcome and returns the entity.
    pub fn into_entity(self) -> T {
        match self {
            Self::Created(v) | Self::Existing(v) => v,
        }
    }
}
