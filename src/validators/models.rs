//! Content models
//!
//! Particles with occurrence bounds over sequence, choice and all groups,
//! shared by DTD element declarations and XSD complex types. Matching walks
//! sets of reachable positions over the child list, so ambiguous models are
//! handled without backtracking.

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::collections::BTreeSet;

/// Occurrence bounds for a particle (minOccurs, maxOccurs)
/// None for max means unbounded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    /// Minimum number of occurrences
    pub min: u32,
    /// Maximum number of occurrences (None = unbounded)
    pub max: Option<u32>,
}

impl Default for Occurs {
    fn default() -> Self {
        Self::once()
    }
}

impl Occurs {
    /// Create new occurrence bounds
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self { min, max }
    }

    /// Exactly once (1, 1)
    pub fn once() -> Self {
        Self { min: 1, max: Some(1) }
    }

    /// Optional occurrence (0, 1)
    pub fn optional() -> Self {
        Self { min: 0, max: Some(1) }
    }

    /// Zero or more (0, unbounded)
    pub fn zero_or_more() -> Self {
        Self { min: 0, max: None }
    }

    /// One or more (1, unbounded)
    pub fn one_or_more() -> Self {
        Self { min: 1, max: None }
    }

    /// Check if the particle can be absent
    pub fn is_emptiable(&self) -> bool {
        self.min == 0
    }

    /// Check if occurrence count is at or over the maximum
    pub fn is_over(&self, count: u32) -> bool {
        match self.max {
            Some(max) => count >= max,
            None => false,
        }
    }

    /// Parse minOccurs/maxOccurs attribute values
    pub fn parse(min_occurs: Option<&str>, max_occurs: Option<&str>) -> Result<Self> {
        let mut occurs = Occurs::once();

        if let Some(min) = min_occurs {
            occurs.min = min.trim().parse().map_err(|_| {
                Error::Schema(format!(
                    "minOccurs value '{}' is not a valid non-negative integer",
                    min
                ))
            })?;
        }

        match max_occurs.map(str::trim) {
            Some("unbounded") => occurs.max = None,
            Some(max) => {
                let max: u32 = max.parse().map_err(|_| {
                    Error::Schema(format!(
                        "maxOccurs value '{}' must be a non-negative integer or 'unbounded'",
                        max
                    ))
                })?;
                occurs.max = Some(max);
            }
            None => {}
        }

        if let Some(max) = occurs.max {
            if occurs.min > max {
                return Err(Error::Schema(
                    "minOccurs must be lesser or equal than maxOccurs".to_string(),
                ));
            }
        }

        Ok(occurs)
    }

    /// DTD occurrence indicator (`?`, `*`, `+` or none)
    pub fn from_indicator(indicator: Option<char>) -> Self {
        match indicator {
            Some('?') => Self::optional(),
            Some('*') => Self::zero_or_more(),
            Some('+') => Self::one_or_more(),
            _ => Self::once(),
        }
    }
}

/// Model group or leaf
#[derive(Debug, Clone, PartialEq)]
pub enum Term<L> {
    /// A single matchable item (element name, declaration, wildcard)
    Leaf(L),
    /// Particles in order
    Sequence(Vec<Particle<L>>),
    /// Exactly one of the particles
    Choice(Vec<Particle<L>>),
    /// Every particle in any order
    All(Vec<Particle<L>>),
}

/// A term with occurrence bounds
#[derive(Debug, Clone, PartialEq)]
pub struct Particle<L> {
    /// What is matched
    pub term: Term<L>,
    /// How often
    pub occurs: Occurs,
}

impl<L> Particle<L> {
    /// Create a particle
    pub fn new(term: Term<L>, occurs: Occurs) -> Self {
        Self { term, occurs }
    }

    /// A leaf occurring exactly once
    pub fn leaf(leaf: L) -> Self {
        Self::new(Term::Leaf(leaf), Occurs::once())
    }

    /// An empty sequence, matching only empty content
    pub fn empty() -> Self {
        Self::new(Term::Sequence(Vec::new()), Occurs::once())
    }

    /// Replace the occurrence bounds
    pub fn with_occurs(mut self, occurs: Occurs) -> Self {
        self.occurs = occurs;
        self
    }

    /// All leaves in document order
    pub fn leaves(&self) -> Vec<&L> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    fn collect_leaves<'a>(&'a self, leaves: &mut Vec<&'a L>) {
        match &self.term {
            Term::Leaf(leaf) => leaves.push(leaf),
            Term::Sequence(particles) | Term::Choice(particles) | Term::All(particles) => {
                for particle in particles {
                    particle.collect_leaves(leaves);
                }
            }
        }
    }

    /// Whether the particle can match empty content
    pub fn is_emptiable(&self) -> bool {
        if self.occurs.is_emptiable() {
            return true;
        }
        match &self.term {
            Term::Leaf(_) => false,
            Term::Sequence(particles) | Term::All(particles) => {
                particles.iter().all(Particle::is_emptiable)
            }
            Term::Choice(particles) => particles.iter().any(Particle::is_emptiable),
        }
    }
}

/// Result of matching a child list against a content model
#[derive(Debug, PartialEq)]
pub enum ContentMatch<'m, L> {
    /// Every item was consumed and the model is satisfied
    Complete,
    /// The item at `index` cannot appear there
    Unexpected {
        /// Position of the offending item
        index: usize,
        /// Leaves that would have been accepted at that position
        expected: Vec<&'m L>,
    },
    /// Every item was accepted but required content is missing
    Incomplete {
        /// Leaves that would have continued the content
        expected: Vec<&'m L>,
    },
}

impl<'m, L> ContentMatch<'m, L> {
    /// Whether the content is valid
    pub fn is_complete(&self) -> bool {
        matches!(self, ContentMatch::Complete)
    }
}

/// Match `items` against `model`, using `matches` to test a leaf against an item
pub fn match_content<'m, L, I>(
    model: &'m Particle<L>,
    items: &[I],
    matches: impl Fn(&L, &I) -> bool,
) -> ContentMatch<'m, L> {
    let matcher = Matcher {
        items,
        matches: &matches,
        frontier: RefCell::new(Frontier {
            position: 0,
            expected: Vec::new(),
        }),
    };

    let ends = matcher.particle_ends(model, &BTreeSet::from([0]));
    if ends.contains(&items.len()) {
        return ContentMatch::Complete;
    }

    let frontier = matcher.frontier.into_inner();
    if frontier.position < items.len() {
        ContentMatch::Unexpected {
            index: frontier.position,
            expected: frontier.expected,
        }
    } else {
        ContentMatch::Incomplete {
            expected: frontier.expected,
        }
    }
}

struct Frontier<'m, L> {
    position: usize,
    expected: Vec<&'m L>,
}

struct Matcher<'i, 'm, L, I> {
    items: &'i [I],
    matches: &'i dyn Fn(&L, &I) -> bool,
    frontier: RefCell<Frontier<'m, L>>,
}

impl<'i, 'm, L, I> Matcher<'i, 'm, L, I> {
    fn reach(&self, position: usize) {
        let mut frontier = self.frontier.borrow_mut();
        if position > frontier.position {
            frontier.position = position;
            frontier.expected.clear();
        }
    }

    fn attempt(&self, position: usize, leaf: &'m L) {
        self.reach(position);
        let mut frontier = self.frontier.borrow_mut();
        if position == frontier.position
            && !frontier.expected.iter().any(|l| std::ptr::eq(*l, leaf))
        {
            frontier.expected.push(leaf);
        }
    }

    fn particle_ends(&self, particle: &'m Particle<L>, starts: &BTreeSet<usize>) -> BTreeSet<usize> {
        let occurs = particle.occurs;
        let mut reached = if occurs.is_emptiable() {
            starts.clone()
        } else {
            BTreeSet::new()
        };
        let mut current = starts.clone();
        let mut count: u32 = 0;
        let bound = self.items.len() as u64 + u64::from(occurs.min) + 1;

        loop {
            if occurs.is_over(count) || current.is_empty() {
                break;
            }

            let next = self.term_ends(&particle.term, &current);
            count += 1;

            if next.is_empty() {
                break;
            }
            if count >= occurs.min {
                if next.is_subset(&reached) {
                    break;
                }
                reached.extend(next.iter().copied());
            }
            if u64::from(count) > bound {
                break;
            }
            current = next;
        }

        reached
    }

    fn term_ends(&self, term: &'m Term<L>, starts: &BTreeSet<usize>) -> BTreeSet<usize> {
        match term {
            Term::Leaf(leaf) => starts
                .iter()
                .filter_map(|&pos| {
                    self.attempt(pos, leaf);
                    let item = self.items.get(pos)?;
                    if (self.matches)(leaf, item) {
                        self.reach(pos + 1);
                        Some(pos + 1)
                    } else {
                        None
                    }
                })
                .collect(),
            Term::Sequence(particles) => {
                let mut current = starts.clone();
                for particle in particles {
                    current = self.particle_ends(particle, &current);
                    if current.is_empty() {
                        break;
                    }
                }
                current
            }
            Term::Choice(particles) => {
                let mut ends = BTreeSet::new();
                for particle in particles {
                    ends.extend(self.particle_ends(particle, starts));
                }
                ends
            }
            Term::All(particles) => {
                let mut ends = BTreeSet::new();
                let mut used = vec![false; particles.len()];
                for &start in starts {
                    self.all_ends(particles, &mut used, start, &mut ends);
                }
                ends
            }
        }
    }

    fn all_ends(
        &self,
        particles: &'m [Particle<L>],
        used: &mut [bool],
        position: usize,
        ends: &mut BTreeSet<usize>,
    ) {
        let satisfied = particles
            .iter()
            .zip(used.iter())
            .all(|(particle, &used)| used || particle.is_emptiable());
        if satisfied {
            ends.insert(position);
        }

        for index in 0..particles.len() {
            if used[index] {
                continue;
            }
            let after = self.particle_ends(&particles[index], &BTreeSet::from([position]));
            for next in after.into_iter().filter(|&next| next > position) {
                used[index] = true;
                self.all_ends(particles, used, next, ends);
                used[index] = false;
            }
        }
    }
}
