//! Shared deterministic types for build steps.
//!
//! These types define stable contracts between the parser, the merger and the
//! step log. They do not depend on external state or I/O.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Kind of build action a step describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    CreateFile,
    CreateFolder,
    RunScript,
}

/// Lifecycle of a step: `pending -> in-progress -> completed`.
///
/// Only `Pending` and `Completed` are used by the merge algorithm. A completed
/// step never goes back to pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepStatus {
    Pending,
    InProgress,
    Completed,
}

impl StepStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::InProgress => "in-progress",
            StepStatus::Completed => "completed",
        }
    }

    /// Move forward in the lifecycle. Returns `false` for a backwards move,
    /// which is ignored.
    pub fn advance(&mut self, next: StepStatus) -> bool {
        if next.rank() < self.rank() {
            return false;
        }
        *self = next;
        true
    }

    fn rank(self) -> u8 {
        match self {
            StepStatus::Pending => 0,
            StepStatus::InProgress => 1,
            StepStatus::Completed => 2,
        }
    }
}

/// One discrete build action extracted from model text.
///
/// `id` is unique within one parse call and assigned in encounter order,
/// starting at 1. `title` and `description` are display-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: u32,
    #[serde(rename = "type")]
    pub kind: StepKind,
    pub title: String,
    pub description: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Step {
    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }
}

/// A logged step together with the parse round it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedStep {
    pub round: u32,
    #[serde(flatten)]
    pub step: Step,
}

/// Append-only log of every parsed step.
///
/// Parser ids restart at 1 on every parse, so entries are addressed by
/// `(round, id)`. Entries are never removed; only their status changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLog {
    entries: Vec<LoggedStep>,
}

impl StepLog {
    pub fn entries(&self) -> &[LoggedStep] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest round recorded so far, `0` for an empty log.
    pub fn last_round(&self) -> u32 {
        self.entries.iter().map(|entry| entry.round).max().unwrap_or(0)
    }

    /// Append one parse batch as a new round and return its number.
    pub fn append_round(&mut self, steps: Vec<Step>) -> u32 {
        let round = self.last_round() + 1;
        let logged = steps.into_iter().map(|step| LoggedStep { round, step });
        self.entries.extend(logged);
        round
    }

    /// Pending steps grouped by round, oldest round first.
    pub fn pending_rounds(&self) -> Vec<(u32, Vec<Step>)> {
        let mut rounds: Vec<(u32, Vec<Step>)> = Vec::new();
        for entry in self.entries.iter().filter(|entry| entry.step.is_pending()) {
            match rounds.last_mut() {
                Some((round, steps)) if *round == entry.round => steps.push(entry.step.clone()),
                _ => rounds.push((entry.round, vec![entry.step.clone()])),
            }
        }
        rounds
    }

    /// Mark the given ids of `round` as completed. Returns how many changed.
    pub fn mark_completed(&mut self, round: u32, ids: &[u32]) -> usize {
        let mut changed = 0;
        for entry in &mut self.entries {
            if entry.round == round
                && ids.contains(&entry.step.id)
                && entry.step.status != StepStatus::Completed
                && entry.step.status.advance(StepStatus::Completed)
            {
                changed += 1;
            }
        }
        changed
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.step.is_pending())
            .count()
    }

    /// Check that rounds never decrease, start at 1, and `(round, id)` is unique.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = HashSet::new();
        let mut previous = 0;
        for entry in &self.entries {
            if entry.round == 0 {
                errors.push(format!("step {}: round must be > 0", entry.step.id));
            }
            if entry.round < previous {
                errors.push(format!(
                    "step {}.{}: round is out of order",
                    entry.round, entry.step.id
                ));
            }
            previous = previous.max(entry.round);
            if !seen.insert((entry.round, entry.step.id)) {
                errors.push(format!("duplicate step {}.{}", entry.round, entry.step.id));
            }
        }
        errors
    }
}
