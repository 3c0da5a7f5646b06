// SPDX-FileCopyrightText: 2026 Frontdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure position arithmetic for the waiting line.
//!
//! A line is the slice of non-terminal entry ids ordered by position, so the
//! entry at index `i` holds position `i + 1`. Every function here returns a
//! new line that is a permutation of its input, which keeps the position set
//! exactly `{1..N}`.

use std::collections::{HashMap, HashSet};

use frontdesk_core::types::EntryId;
use frontdesk_core::FrontdeskError;

fn position_of(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

/// Apply an explicit `(entry, new_position)` mapping to `line`.
///
/// Mapped entries take their new positions; unmapped entries fill the
/// remaining slots keeping their previous relative order.
pub fn plan_reorder(
    line: &[EntryId],
    mapping: &[(EntryId, u32)],
) -> Result<Vec<EntryId>, FrontdeskError> {
    let len = line.len();
    let members: HashSet<EntryId> = line.iter().copied().collect();
    let mut seen_ids = HashSet::with_capacity(mapping.len());
    let mut slots: Vec<Option<EntryId>> = vec![None; len];

    for &(id, position) in mapping {
        if !members.contains(&id) {
            return Err(FrontdeskError::Conflict(format!(
                "entry {id} is not waiting in this queue"
            )));
        }
        if !seen_ids.insert(id) {
            return Err(FrontdeskError::Validation(format!(
                "entry {id} appears more than once"
            )));
        }
        if position == 0 || position as usize > len {
            return Err(FrontdeskError::Validation(format!(
                "position {position} is outside 1..={len}"
            )));
        }
        let slot = &mut slots[position as usize - 1];
        if slot.is_some() {
            return Err(FrontdeskError::Validation(format!(
                "position {position} is assigned twice"
            )));
        }
        *slot = Some(id);
    }

    let mut rest = line.iter().filter(|id| !seen_ids.contains(*id));
    slots
        .into_iter()
        .map(|slot| {
            slot.or_else(|| rest.next().copied()).ok_or_else(|| {
                FrontdeskError::Internal("reorder left an empty position".to_string())
            })
        })
        .collect()
}

/// Move `id` to `new_position`, shifting only the entries in between by one.
pub fn plan_move(
    line: &[EntryId],
    id: EntryId,
    new_position: u32,
) -> Result<Vec<EntryId>, FrontdeskError> {
    let len = line.len();
    if new_position == 0 || new_position as usize > len {
        return Err(FrontdeskError::Validation(format!(
            "position {new_position} is outside 1..={len}"
        )));
    }
    let from = line.iter().position(|e| *e == id).ok_or_else(|| {
        FrontdeskError::Conflict(format!("entry {id} is not waiting in this queue"))
    })?;

    let mut next = line.to_vec();
    let moved = next.remove(from);
    next.insert(new_position as usize - 1, moved);
    Ok(next)
}

/// Line after `id` leaves it (entry became terminal).
pub fn plan_remove(line: &[EntryId], id: EntryId) -> Vec<EntryId> {
    line.iter().copied().filter(|e| *e != id).collect()
}

/// Position writes needed to turn `before` into `after`.
///
/// Entries absent from `after` lose their position; entries whose slot is
/// unchanged are left out.
pub fn position_changes(before: &[EntryId], after: &[EntryId]) -> Vec<(EntryId, Option<u32>)> {
    let old: HashMap<EntryId, usize> = before
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i))
        .collect();
    let kept: HashSet<EntryId> = after.iter().copied().collect();

    let mut changes: Vec<(EntryId, Option<u32>)> = before
        .iter()
        .filter(|id| !kept.contains(*id))
        .map(|id| (*id, None))
        .collect();
    changes.extend(
        after
            .iter()
            .enumerate()
            .filter(|(i, id)| old.get(*id) != Some(i))
            .map(|(i, id)| (*id, Some(position_of(i)))),
    );
    changes
}

/// Whether `positions` is exactly `{1..N}`.
pub fn is_dense(positions: &[u32]) -> bool {
    let mut sorted = positions.to_vec();
    sorted.sort_unstable();
    sorted.iter().enumerate().all(|(i, p)| *p == position_of(i))
}
