//! Markings over the extended naturals `ℕ ∪ {ω}`.
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Serialize, Serializer};

use crate::net::ids::PlaceId;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::Weight;

/// Token count of a single place. `Omega` stands for "unboundedly many" and
/// compares greater than every finite count.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tokens {
    Finite(Weight),
    Omega,
}

impl Tokens {
    pub const ZERO: Tokens = Tokens::Finite(0);

    pub fn is_omega(self) -> bool {
        matches!(self, Tokens::Omega)
    }

    pub fn is_zero(self) -> bool {
        self == Tokens::ZERO
    }

    pub fn finite(self) -> Option<Weight> {
        match self {
            Tokens::Finite(n) => Some(n),
            Tokens::Omega => None,
        }
    }

    /// `true` iff at least `weight` tokens are available; ω covers any weight.
    pub fn covers(self, weight: Weight) -> bool {
        match self {
            Tokens::Finite(n) => n >= weight,
            Tokens::Omega => true,
        }
    }

    /// Adds a signed delta. `ω + k = ω`; `None` if a finite count would
    /// leave the range of [`Weight`], below zero or above `u64::MAX`.
    pub fn checked_add_signed(self, delta: i128) -> Option<Tokens> {
        match self {
            Tokens::Omega => Some(Tokens::Omega),
            Tokens::Finite(n) => i128::from(n)
                .checked_add(delta)
                .and_then(|sum| Weight::try_from(sum).ok())
                .map(Tokens::Finite),
        }
    }
}

impl Default for Tokens {
    fn default() -> Self {
        Tokens::ZERO
    }
}

impl From<Weight> for Tokens {
    fn from(value: Weight) -> Self {
        Tokens::Finite(value)
    }
}

impl PartialOrd for Tokens {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tokens {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Tokens::Finite(a), Tokens::Finite(b)) => a.cmp(b),
            (Tokens::Finite(_), Tokens::Omega) => Ordering::Less,
            (Tokens::Omega, Tokens::Finite(_)) => Ordering::Greater,
            (Tokens::Omega, Tokens::Omega) => Ordering::Equal,
        }
    }
}

impl fmt::Debug for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tokens::Finite(n) => write!(f, "{n}"),
            Tokens::Omega => f.write_str("ω"),
        }
    }
}

impl Serialize for Tokens {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Tokens::Finite(n) => serializer.serialize_u64(*n),
            Tokens::Omega => serializer.serialize_str("ω"),
        }
    }
}

/// One state of the net: a token count (or ω) per place.
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Marking(IndexVec<PlaceId, Tokens>);

impl Marking {
    pub fn new(tokens: IndexVec<PlaceId, Tokens>) -> Self {
        Self(tokens)
    }

    pub fn from_counts<It: IntoIterator<Item = Weight>>(counts: It) -> Self {
        Self(counts.into_iter().map(Tokens::Finite).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, Tokens)> + '_ {
        self.0.iter_enumerated().map(|(place, tokens)| (place, *tokens))
    }

    pub fn tokens(&self, place: PlaceId) -> Tokens {
        self.0[place]
    }

    pub fn as_slice(&self) -> &[Tokens] {
        self.0.as_slice()
    }

    pub fn has_omega(&self) -> bool {
        self.0.iter().any(|tokens| tokens.is_omega())
    }

    /// An empty marking counts as all-ω: there is nothing left to accelerate.
    pub fn is_all_omega(&self) -> bool {
        self.0.iter().all(|tokens| tokens.is_omega())
    }

    pub fn omega_places(&self) -> impl Iterator<Item = PlaceId> + '_ {
        self.iter()
            .filter(|(_, tokens)| tokens.is_omega())
            .map(|(place, _)| place)
    }

    /// Largest finite count in any place, ignoring ω.
    pub fn max_finite(&self) -> Weight {
        self.0
            .iter()
            .filter_map(|tokens| tokens.finite())
            .max()
            .unwrap_or(0)
    }

    /// Returns a copy with `place` overwritten.
    pub fn with(&self, place: PlaceId, tokens: Tokens) -> Self {
        let mut next = self.clone();
        next.0[place] = tokens;
        next
    }

    pub(crate) fn tokens_mut(&mut self, place: PlaceId) -> &mut Tokens {
        &mut self.0[place]
    }

    pub fn into_inner(self) -> IndexVec<PlaceId, Tokens> {
        self.0
    }
}

impl Hash for Marking {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state);
    }
}

impl From<Vec<Tokens>> for Marking {
    fn from(value: Vec<Tokens>) -> Self {
        Self(IndexVec::from(value))
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (place, tokens) in self.iter() {
            if place.index() > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{tokens}")?;
        }
        f.write_str("]")
    }
}

/// Componentwise order: `Some(_)` only when every place agrees on the direction.
impl PartialOrd for Marking {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.len() != other.len() {
            return None;
        }
        let mut less = false;
        let mut greater = false;
        for (left, right) in self.as_slice().iter().zip(other.as_slice()) {
            match left.cmp(right) {
                Ordering::Less => less = true,
                Ordering::Greater => greater = true,
                Ordering::Equal => {}
            }
        }
        match (less, greater) {
            (true, true) => None,
            (true, false) => Some(Ordering::Less),
            (false, true) => Some(Ordering::Greater),
            (false, false) => Some(Ordering::Equal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omega_absorbs_arithmetic() {
        assert_eq!(Tokens::Omega.checked_add_signed(-5), Some(Tokens::Omega));
        assert_eq!(Tokens::Finite(2).checked_add_signed(-2), Some(Tokens::ZERO));
        assert_eq!(Tokens::Finite(1).checked_add_signed(-2), None);
        assert_eq!(
            Tokens::ZERO.checked_add_signed(i128::from(u64::MAX)),
            Some(Tokens::Finite(u64::MAX))
        );
        assert_eq!(Tokens::Finite(1).checked_add_signed(i128::from(u64::MAX)), None);
        assert!(Tokens::Omega > Tokens::Finite(u64::MAX));
        assert!(Tokens::Omega.covers(1_000));
        assert!(!Tokens::Finite(1).covers(2));
    }

    #[test]
    fn marking_display_and_json() {
        let marking = Marking::from(vec![Tokens::Finite(1), Tokens::ZERO, Tokens::Omega]);
        assert_eq!(marking.to_string(), "[1, 0, ω]");
        assert_eq!(serde_json::to_string(&marking).unwrap(), r#"[1,0,"ω"]"#);
        assert_eq!(marking.omega_places().collect::<Vec<_>>(), vec![PlaceId::new(2)]);
        assert_eq!(marking.max_finite(), 1);
    }

    #[test]
    fn componentwise_order() {
        let small = Marking::from_counts([1, 0]);
        let large = Marking::from_counts([1, 2]);
        let other = Marking::from_counts([0, 3]);
        assert!(small < large);
        assert_eq!(small.partial_cmp(&other), None);
        assert!(large.with(PlaceId::new(0), Tokens::Omega) > large);
    }
}
