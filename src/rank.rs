//! # Rank Selector
//! Picks the extreme key of a counter mapping, or nothing when there is no
//! unique winner.
//!
//! Tie rule: after ordering by value in the chosen direction only the entries
//! at rank 0 and rank 1 are compared. Equal values there mean "no unique
//! winner", however many further entries share that value.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Max,
    Min,
}

/// `None` is the "no unique winner" sentinel.
pub type RankResult = Option<String>;

pub fn select(counts: &HashMap<String, i64>, direction: Direction) -> RankResult {
    let mut ranked: Vec<(&String, i64)> = counts.iter().map(|(k, &v)| (k, v)).collect();
    match direction {
        Direction::Max => ranked.sort_by(|a, b| b.1.cmp(&a.1)),
        Direction::Min => ranked.sort_by(|a, b| a.1.cmp(&b.1)),
    }

    match ranked.as_slice() {
        [] => None,
        [(_, first), (_, second), ..] if first == second => None,
        [(key, _), ..] => Some((*key).clone()),
    }
}
