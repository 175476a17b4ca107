use dlb_core::Xp;

/// Normalizes a voter's raw XP allocations to sum exactly to `budget`,
/// per spec §4.4.
///
/// `raw` must be non-empty with every entry already positive (callers
/// are expected to have dropped zero allocations before calling, since
/// "zero allocations are not stored"). If `raw` already sums to
/// `budget` it is returned unchanged. Otherwise the first N−1 entries
/// are scaled proportionally and rounded, the last absorbs whatever
/// residual remains, and any entry that rounds down to zero is bumped
/// to 1 with the excess clawed back from the currently-largest entry —
/// the same share-then-remainder idea `gameplay::Showdown` uses to
/// hand out an odd chip, run in reverse to take one back.
pub fn normalize_allocations(raw: &[u32], budget: Xp) -> Vec<Xp> {
    assert!(!raw.is_empty(), "allocations must be non-empty");
    assert!(
        raw.iter().all(|&x| x > 0),
        "zero allocations must be filtered before normalizing"
    );
    let n = raw.len();
    let budget = budget as i64;
    debug_assert!(
        budget >= n as i64,
        "budget must allow at least 1 XP per allocation"
    );

    let total: i64 = raw.iter().map(|&x| x as i64).sum();
    if total == budget {
        return raw.to_vec();
    }

    let mut scaled: Vec<i64> = raw[..n - 1]
        .iter()
        .map(|&x| (x as f64 * budget as f64 / total as f64).round() as i64)
        .collect();
    let residual = budget - scaled.iter().sum::<i64>();
    scaled.push(residual);

    // Bounded: realistic cells have a handful of ideas, so this
    // converges in at most one or two passes; the cap guards against
    // pathological inputs rather than reflecting an expected cost.
    for _ in 0..(n * 4) {
        let Some(low) = scaled.iter().position(|&v| v < 1) else {
            break;
        };
        let (high, _) = scaled
            .iter()
            .enumerate()
            .max_by_key(|&(_, &v)| v)
            .expect("scaled is non-empty");
        let deficit = 1 - scaled[low];
        scaled[low] += deficit;
        scaled[high] -= deficit;
    }

    debug_assert_eq!(scaled.iter().sum::<i64>(), budget);
    debug_assert!(scaled.iter().all(|&v| v >= 1));
    scaled.into_iter().map(|v| v as Xp).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn already_exact_passes_through() {
        assert_eq!(normalize_allocations(&[6, 4], 10), vec![6, 4]);
    }

    #[test]
    fn single_vote_degenerate_case_absorbs_whole_budget() {
        assert_eq!(normalize_allocations(&[1], 10), vec![10]);
    }

    #[test]
    fn over_budget_scales_down_and_last_absorbs_residual() {
        let out = normalize_allocations(&[8, 8, 4], 10);
        assert_eq!(out.iter().sum::<Xp>(), 10);
        assert!(out.iter().all(|&v| v >= 1));
    }

    #[test]
    fn under_budget_scales_up() {
        let out = normalize_allocations(&[1, 1], 10);
        assert_eq!(out.iter().sum::<Xp>(), 10);
    }

    #[test]
    fn rounding_to_zero_is_bumped_to_one_from_largest() {
        // 99 vs 1 vs 1 scaled to a budget of 10: the long tail would
        // round to zero without the bump-up pass.
        let out = normalize_allocations(&[98, 1, 1], 10);
        assert_eq!(out.iter().sum::<Xp>(), 10);
        assert!(out.iter().all(|&v| v >= 1));
    }

    #[test]
    fn property_sum_always_matches_budget() {
        let cases: &[(&[u32], Xp)] = &[
            (&[1, 1, 1, 1, 1], 10),
            (&[3, 7], 10),
            (&[1, 2, 3, 4], 20),
            (&[50, 1], 10),
            (&[1, 50], 10),
            (&[7], 10),
        ];
        for &(raw, budget) in cases {
            let out = normalize_allocations(raw, budget);
            assert_eq!(out.len(), raw.len());
            assert_eq!(out.iter().sum::<Xp>(), budget);
            assert!(out.iter().all(|&v| v >= 1));
        }
    }
}
