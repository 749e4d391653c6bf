//! Probability masses over basic states

use crate::state::BasicState;
use crate::{OpticsError, Result};
use ahash::AHashMap;
use std::fmt;

/// Insertion-ordered map from [`BasicState`] to probability mass
///
/// Masses are stored as given; nothing normalizes them implicitly. Equality
/// ignores insertion order.
///
/// # Example
/// ```
/// use linopt_core::{BasicState, SVDistribution};
///
/// let mut d = SVDistribution::new();
/// d.insert(BasicState::new(&[0, 1]), 0.2).unwrap();
/// d.insert(BasicState::new(&[1, 0]), 0.3).unwrap();
/// assert_eq!(d.len(), 2);
/// assert!((d.total_mass() - 0.5).abs() < 1e-15);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SVDistribution {
    entries: Vec<(BasicState, f64)>,
    index: AHashMap<BasicState, usize>,
}

impl SVDistribution {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_mass(state: &BasicState, mass: f64) -> Result<()> {
        if !mass.is_finite() {
            return Err(OpticsError::NonFinite(format!("mass {} for {}", mass, state)));
        }
        if mass < 0.0 {
            return Err(OpticsError::Range(format!(
                "negative mass {} for {}",
                mass, state
            )));
        }
        Ok(())
    }

    /// Set the mass of `state`, keeping its position if already present
    ///
    /// Returns the previous mass.
    ///
    /// # Errors
    /// - [`OpticsError::Range`] for a negative mass
    /// - [`OpticsError::NonFinite`] for NaN or infinity
    pub fn insert(&mut self, state: BasicState, mass: f64) -> Result<Option<f64>> {
        Self::check_mass(&state, mass)?;
        match self.index.get(&state) {
            Some(&i) => Ok(Some(std::mem::replace(&mut self.entries[i].1, mass))),
            None => {
                self.index.insert(state.clone(), self.entries.len());
                self.entries.push((state, mass));
                Ok(None)
            },
        }
    }

    /// Accumulate `mass` onto `state`
    ///
    /// # Errors
    /// Same as [`SVDistribution::insert`]; an accumulated mass that overflows
    /// is [`OpticsError::NonFinite`] and leaves the entry unchanged
    pub fn add(&mut self, state: BasicState, mass: f64) -> Result<()> {
        Self::check_mass(&state, mass)?;
        match self.index.get(&state) {
            Some(&i) => {
                let total = self.entries[i].1 + mass;
                Self::check_mass(&state, total)?;
                self.entries[i].1 = total;
            },
            None => {
                self.index.insert(state.clone(), self.entries.len());
                self.entries.push((state, mass));
            },
        }
        Ok(())
    }

    pub fn get(&self, state: &BasicState) -> Option<f64> {
        self.index.get(state).map(|&i| self.entries[i].1)
    }

    pub fn contains(&self, state: &BasicState) -> bool {
        self.index.contains_key(state)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&BasicState, f64)> {
        self.entries.iter().map(|(s, p)| (s, *p))
    }

    pub fn total_mass(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    /// Rescale masses so they sum to 1
    ///
    /// # Errors
    /// Returns [`OpticsError::Range`] if the total mass is zero
    pub fn normalize(&mut self) -> Result<()> {
        let total = self.total_mass();
        if total <= 0.0 {
            return Err(OpticsError::Range(
                "cannot normalize a distribution with zero total mass".to_string(),
            ));
        }
        for (_, p) in &mut self.entries {
            *p /= total;
        }
        Ok(())
    }

    /// Mass-weighted equality within a relative tolerance
    pub fn approx_eq(&self, other: &SVDistribution, tol: f64) -> bool {
        self.len() == other.len()
            && self.iter().all(|(s, p)| {
                other
                    .get(s)
                    .is_some_and(|q| (p - q).abs() <= tol * p.abs().max(q.abs()).max(1.0))
            })
    }
}

impl PartialEq for SVDistribution {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(s, p)| other.get(s) == Some(p))
    }
}

impl fmt::Display for SVDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (state, p)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", state, p)?;
        }
        write!(f, "}}")
    }
}
