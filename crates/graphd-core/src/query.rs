//! # Query Engine
//!
//! Read-only set algebra over the `GraphIndex`.
//!
//! - Results are always sorted lexicographically by identifier
//! - Unknown actors yield empty sets, never errors
//! - Two-set operations merge the sorted sets in one pass
//! - N-way intersections are bounded by the smallest set

use crate::index::GraphIndex;
use crate::primitives::MAX_INTERSECT_ACTORS;
use crate::{ActorId, Direction, GraphError};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Query operations supported by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Actors following the actor.
    Followers(ActorId),
    /// Actors the actor follows.
    Following(ActorId),
    /// Actors in a mutual follow with the actor.
    Moots(ActorId),
    /// Followers the actor has not followed back.
    FollowersNotFollowing(ActorId),
    /// Whether `source` follows `target`.
    DoesFollow { source: ActorId, target: ActorId },
    /// Whether the two actors follow each other.
    AreMoots { source: ActorId, target: ActorId },
    /// Actors following every listed actor.
    IntersectFollowers(Vec<ActorId>),
    /// Actors followed by every listed actor.
    IntersectFollowing(Vec<ActorId>),
}

/// Result of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutput {
    /// Sorted identifier list.
    Actors(Vec<ActorId>),
    /// Membership answer.
    Flag(bool),
}

/// Stateless set-algebra operations over a `GraphIndex`.
pub struct QueryEngine;

impl QueryEngine {
    /// Dispatch a `Query`.
    pub fn execute(index: &GraphIndex, query: &Query) -> Result<QueryOutput, GraphError> {
        let output = match query {
            Query::Followers(actor) => QueryOutput::Actors(Self::followers(index, actor)),
            Query::Following(actor) => QueryOutput::Actors(Self::following(index, actor)),
            Query::Moots(actor) => QueryOutput::Actors(Self::moots(index, actor)),
            Query::FollowersNotFollowing(actor) => {
                QueryOutput::Actors(Self::followers_not_following(index, actor))
            }
            Query::DoesFollow { source, target } => {
                QueryOutput::Flag(Self::does_follow(index, source, target))
            }
            Query::AreMoots { source, target } => {
                QueryOutput::Flag(Self::are_moots(index, source, target))
            }
            Query::IntersectFollowers(actors) => {
                QueryOutput::Actors(Self::intersect_followers(index, actors)?)
            }
            Query::IntersectFollowing(actors) => {
                QueryOutput::Actors(Self::intersect_following(index, actors)?)
            }
        };
        Ok(output)
    }

    /// Actors following `actor`, sorted.
    #[must_use]
    pub fn followers(index: &GraphIndex, actor: &ActorId) -> Vec<ActorId> {
        index.followers(actor).iter().cloned().collect()
    }

    /// Actors `actor` follows, sorted.
    #[must_use]
    pub fn following(index: &GraphIndex, actor: &ActorId) -> Vec<ActorId> {
        index.following(actor).iter().cloned().collect()
    }

    /// `Following(actor) ∩ Followers(actor)`.
    #[must_use]
    pub fn moots(index: &GraphIndex, actor: &ActorId) -> Vec<ActorId> {
        merge_intersection(index.following(actor), index.followers(actor))
    }

    /// `Followers(actor) \ Following(actor)`.
    #[must_use]
    pub fn followers_not_following(index: &GraphIndex, actor: &ActorId) -> Vec<ActorId> {
        merge_difference(index.followers(actor), index.following(actor))
    }

    /// Whether `source` follows `target`.
    #[must_use]
    pub fn does_follow(index: &GraphIndex, source: &ActorId, target: &ActorId) -> bool {
        index.contains(source, target)
    }

    /// Whether `a` and `b` follow each other.
    #[must_use]
    pub fn are_moots(index: &GraphIndex, a: &ActorId, b: &ActorId) -> bool {
        index.contains(a, b) && index.contains(b, a)
    }

    /// Actors that follow every actor in `actors`.
    pub fn intersect_followers(
        index: &GraphIndex,
        actors: &[ActorId],
    ) -> Result<Vec<ActorId>, GraphError> {
        Self::intersect(index, actors, Direction::Followers)
    }

    /// Actors that every actor in `actors` follows.
    pub fn intersect_following(
        index: &GraphIndex,
        actors: &[ActorId],
    ) -> Result<Vec<ActorId>, GraphError> {
        Self::intersect(index, actors, Direction::Following)
    }

    /// N-way intersection of one adjacency direction.
    ///
    /// Sets are ordered by ascending size; candidates come from the smallest
    /// and are dropped on the first set that lacks them, so the work is
    /// bounded by the smallest set rather than the sum of all sets.
    fn intersect(
        index: &GraphIndex,
        actors: &[ActorId],
        direction: Direction,
    ) -> Result<Vec<ActorId>, GraphError> {
        if actors.is_empty() || actors.len() > MAX_INTERSECT_ACTORS {
            return Err(GraphError::TooManyActors {
                count: actors.len(),
                max: MAX_INTERSECT_ACTORS,
            });
        }

        let distinct: BTreeSet<&ActorId> = actors.iter().collect();
        let mut sets: Vec<&BTreeSet<ActorId>> = distinct
            .into_iter()
            .map(|actor| index.adjacent(actor, direction))
            .collect();
        sets.sort_by_key(|set| set.len());

        let Some((smallest, rest)) = sets.split_first() else {
            return Ok(Vec::new());
        };
        if smallest.is_empty() {
            return Ok(Vec::new());
        }

        Ok(smallest
            .iter()
            .filter(|candidate| rest.iter().all(|set| set.contains(candidate.as_str())))
            .cloned()
            .collect())
    }
}

/// Elements present in both sorted sets, in one merge pass.
fn merge_intersection(a: &BTreeSet<ActorId>, b: &BTreeSet<ActorId>) -> Vec<ActorId> {
    let mut out = Vec::new();
    let mut left = a.iter().peekable();
    let mut right = b.iter().peekable();
    while let (Some(l), Some(r)) = (left.peek(), right.peek()) {
        match l.cmp(r) {
            Ordering::Less => {
                left.next();
            }
            Ordering::Greater => {
                right.next();
            }
            Ordering::Equal => {
                out.push((*l).clone());
                left.next();
                right.next();
            }
        }
    }
    out
}

/// Elements of sorted set `a` absent from sorted set `b`, in one merge pass.
fn merge_difference(a: &BTreeSet<ActorId>, b: &BTreeSet<ActorId>) -> Vec<ActorId> {
    let mut out = Vec::new();
    let mut right = b.iter().peekable();
    for l in a {
        while right.peek().is_some_and(|r| *r < l) {
            right.next();
        }
        if right.peek() != Some(&l) {
            out.push(l.clone());
        }
    }
    out
}

// =============================================================================
// TESTS
// =============================================================================
