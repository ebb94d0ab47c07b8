//! Candidate combination generation.

use std::collections::HashSet;

use super::scoring::build_combination;
use crate::models::{Combination, PackageRecord, PackageUnit};

/// Extra units tried beyond the minimum covering count.
const EXTRA_UNITS: u32 = 2;

/// Every combination worth scoring for `target`.
///
/// `packages` must be active, non-empty sizes, ordered largest first. Produces
/// repeated single-NDC counts and, when `allow_multiple` is set, one greedy
/// two-NDC pairing per ordered pair of packages. Duplicates are dropped.
pub(super) fn generate(target: f64, packages: &[PackageRecord], allow_multiple: bool) -> Vec<Combination> {
    let mut seen = HashSet::new();
    let mut combinations = Vec::new();
    let mut push = |combination: Combination| {
        if seen.insert(combination.key()) {
            combinations.push(combination);
        }
    };

    for package in packages {
        let size = f64::from(package.package_size);
        let max_count = saturating_count((target / size).ceil()).saturating_add(EXTRA_UNITS);
        for count in 1..=max_count {
            push(build_combination(
                vec![PackageUnit {
                    package: package.clone(),
                    count,
                }],
                target,
            ));
        }
    }

    if allow_multiple {
        for (i, primary) in packages.iter().enumerate() {
            for (j, secondary) in packages.iter().enumerate() {
                if i == j {
                    continue;
                }
                if let Some(pair) = greedy_pair(target, primary, secondary) {
                    push(build_combination(pair, target));
                }
            }
        }
    }

    combinations
}

/// As many whole `primary` packages as fit, topped up with `secondary`.
fn greedy_pair(target: f64, primary: &PackageRecord, secondary: &PackageRecord) -> Option<Vec<PackageUnit>> {
    let primary_count = saturating_count((target / f64::from(primary.package_size)).floor());
    if primary_count == 0 {
        return None;
    }

    let remaining = target - f64::from(primary_count) * f64::from(primary.package_size);
    if remaining <= 0.0 {
        return None;
    }

    let secondary_count = saturating_count((remaining / f64::from(secondary.package_size)).ceil());
    Some(vec![
        PackageUnit {
            package: primary.clone(),
            count: primary_count,
        },
        PackageUnit {
            package: secondary.clone(),
            count: secondary_count,
        },
    ])
}

fn saturating_count(value: f64) -> u32 {
    if value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value as u32
    }
}
