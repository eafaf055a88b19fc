//! The nine celestial bodies of the signal and fixed-size per-body maps.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// Closed set of bodies carried by the external strength signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Body {
    Sun,
    Moon,
    Mars,
    Mercury,
    Jupiter,
    Venus,
    Saturn,
    Rahu,
    Ketu,
}

impl Body {
    pub const COUNT: usize = 9;

    pub const ALL: [Body; Body::COUNT] = [
        Body::Sun,
        Body::Moon,
        Body::Mars,
        Body::Mercury,
        Body::Jupiter,
        Body::Venus,
        Body::Saturn,
        Body::Rahu,
        Body::Ketu,
    ];

    /// Dense index in `0..9`, matching the order of [`Body::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Body::Sun => "sun",
            Body::Moon => "moon",
            Body::Mars => "mars",
            Body::Mercury => "mercury",
            Body::Jupiter => "jupiter",
            Body::Venus => "venus",
            Body::Saturn => "saturn",
            Body::Rahu => "rahu",
            Body::Ketu => "ketu",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn parse(name: &str) -> Option<Body> {
        Body::ALL
            .into_iter()
            .find(|b| b.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Lunar nodes are always retrograde in mean-node ephemerides.
    pub fn is_node(self) -> bool {
        matches!(self, Body::Rahu | Body::Ketu)
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One value per body. Completeness is guaranteed by construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BodyMap<T>(pub [T; Body::COUNT]);

impl<T> BodyMap<T> {
    /// Build by evaluating `f` for each body in canonical order.
    pub fn from_fn(mut f: impl FnMut(Body) -> T) -> Self {
        BodyMap(std::array::from_fn(|i| f(Body::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Body, &T)> {
        Body::ALL.into_iter().zip(self.0.iter())
    }

    pub fn map<U>(&self, mut f: impl FnMut(Body, &T) -> U) -> BodyMap<U> {
        BodyMap::from_fn(|b| f(b, &self.0[b.index()]))
    }
}

impl<T: Default> Default for BodyMap<T> {
    fn default() -> Self {
        BodyMap::from_fn(|_| T::default())
    }
}

impl<T> Index<Body> for BodyMap<T> {
    type Output = T;

    fn index(&self, body: Body) -> &T {
        &self.0[body.index()]
    }
}

impl<T> IndexMut<Body> for BodyMap<T> {
    fn index_mut(&mut self, body: Body) -> &mut T {
        &mut self.0[body.index()]
    }
}
