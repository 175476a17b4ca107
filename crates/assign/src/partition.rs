use dlb_core::BatchNo;
use std::collections::HashSet;
use std::hash::Hash;

/// Splits `items` into `num_cells` groups whose sizes differ by at
/// most one (spec §4.3 step 3). The first `len % num_cells` groups get
/// the extra item.
pub fn partition_evenly<T: Copy>(items: &[T], num_cells: usize) -> Vec<Vec<T>> {
    if num_cells == 0 {
        return Vec::new();
    }
    let base = items.len() / num_cells;
    let extra = items.len() % num_cells;
    let mut groups = Vec::with_capacity(num_cells);
    let mut offset = 0;
    for i in 0..num_cells {
        let size = base + usize::from(i < extra);
        groups.push(items[offset..offset + size].to_vec());
        offset += size;
    }
    groups
}

/// A relaxed author-conflict: `member` was assigned to `cell_index`
/// despite authoring an idea seated there, because every conflict-free
/// cell was already full (spec §4.3's "relax to avoid starvation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaxedConflict<M> {
    pub cell_index: usize,
    pub member: M,
}

/// Greedily assigns each member to the least-loaded cell they are not
/// an author-conflict with, falling back to the least-loaded cell with
/// spare capacity (still recording the conflict) when no conflict-free
/// cell has room, and finally to the globally least-loaded cell if
/// every cell is already full (spec §4.3 step 4).
///
/// `cell_authors[i]` is the set of members who authored an idea seated
/// in cell `i`. Returns one member vector per cell plus the relaxed
/// conflicts, in assignment order.
pub fn assign_members<M: Copy + Eq + Hash>(
    members: &[M],
    cell_authors: &[HashSet<M>],
    cell_size: usize,
) -> (Vec<Vec<M>>, Vec<RelaxedConflict<M>>) {
    let num_cells = cell_authors.len();
    let mut assignment: Vec<Vec<M>> = vec![Vec::new(); num_cells];
    let mut conflicts = Vec::new();

    for &member in members {
        let conflict_free = least_loaded(&assignment, cell_size, |i| {
            !cell_authors[i].contains(&member)
        });
        let chosen = match conflict_free {
            Some(i) => i,
            None => match least_loaded(&assignment, cell_size, |_| true) {
                Some(i) => {
                    conflicts.push(RelaxedConflict {
                        cell_index: i,
                        member,
                    });
                    i
                }
                None => {
                    // Every cell is already at capacity; no starvation
                    // is acceptable, so overflow the globally smallest.
                    let i = (0..num_cells)
                        .min_by_key(|&i| assignment[i].len())
                        .unwrap_or(0);
                    conflicts.push(RelaxedConflict {
                        cell_index: i,
                        member,
                    });
                    i
                }
            },
        };
        assignment[chosen].push(member);
    }

    (assignment, conflicts)
}

fn least_loaded<M>(
    assignment: &[Vec<M>],
    cell_size: usize,
    eligible: impl Fn(usize) -> bool,
) -> Option<usize> {
    assignment
        .iter()
        .enumerate()
        .filter(|(i, cell)| cell.len() < cell_size && eligible(*i))
        .min_by_key(|(_, cell)| cell.len())
        .map(|(i, _)| i)
}

/// Next batch index at a tier, given the batches already opened there
/// (spec §4.3's `nextBatchIndex(T)`).
pub fn next_batch_index(existing: &[BatchNo]) -> BatchNo {
    existing.iter().copied().max().map_or(0, |max| max + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_evenly_differs_by_at_most_one() {
        let ideas = [1, 2, 3, 4, 5, 6, 7];
        let groups = partition_evenly(&ideas, 3);
        let sizes: Vec<_> = groups.iter().map(Vec::len).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 7);
        assert!(sizes.iter().max().unwrap() - sizes.iter().min().unwrap() <= 1);
    }

    #[test]
    fn partition_evenly_handles_zero_cells() {
        assert!(partition_evenly(&[1, 2, 3], 0).is_empty());
    }

    #[test]
    fn assign_members_avoids_author_conflicts_when_possible() {
        let members = [1, 2, 3, 4];
        // member 1 authored an idea in cell 0.
        let authors = vec![
            HashSet::from([1]),
            HashSet::<i32>::new(),
        ];
        let (assignment, conflicts) = assign_members(&members, &authors, 2);
        assert!(conflicts.is_empty());
        assert!(!assignment[0].contains(&1));
    }

    #[test]
    fn assign_members_relaxes_conflict_to_avoid_starvation() {
        // Single cell, its only member also authored its only idea.
        let members = [1];
        let authors = vec![HashSet::from([1])];
        let (assignment, conflicts) = assign_members(&members, &authors, 1);
        assert_eq!(assignment[0], vec![1]);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].cell_index, 0);
    }

    #[test]
    fn next_batch_index_starts_at_zero() {
        assert_eq!(next_batch_index(&[]), 0);
        assert_eq!(next_batch_index(&[0, 1, 2]), 3);
    }
}
