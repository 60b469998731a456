//! Ring migration between colonies.

use super::archive::Candidate;
use super::colony::Colony;

/// Copies the `size` best members of colony `i` over the `size` worst members
/// of colony `(i + 1) % n`, for every `i`.
///
/// Emigrants are taken from a snapshot of every archive before the pass, so
/// the result does not depend on the order colonies are visited in. A single
/// colony never migrates onto itself. Returns the number of members moved.
pub(crate) fn ring_migration(colonies: &mut [Colony], size: usize) -> usize {
    let n = colonies.len();
    if n <= 1 || size == 0 {
        return 0;
    }

    let emigrants: Vec<Vec<Candidate>> = colonies.iter().map(|c| c.archive().top(size)).collect();
    let mut moved = 0;
    for (source, migrants) in emigrants.iter().enumerate() {
        let target = (source + 1) % n;
        colonies[target].archive_mut().replace_worst(migrants);
        moved += migrants.len();
    }
    moved
}
