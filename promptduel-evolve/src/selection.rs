//! Selection over a best-first rank order
//!
//! The authoritative ranking produces an order over every pool index;
//! these helpers restrict it to the active set and pick from either end.

/// Top `n` active candidates, best first.
///
/// # Arguments
/// * `order` - Best-first order over all pool indices
/// * `active` - Indices still eligible
/// * `n` - Number of candidates to select
pub fn select_elite(order: &[usize], active: &[usize], n: usize) -> Vec<usize> {
    order
        .iter()
        .copied()
        .filter(|i| active.contains(i))
        .take(n)
        .collect()
}

/// Bottom `n` active candidates, worst first
pub fn select_bottom(order: &[usize], active: &[usize], n: usize) -> Vec<usize> {
    order
        .iter()
        .rev()
        .copied()
        .filter(|i| active.contains(i))
        .take(n)
        .collect()
}

/// Split `total` slots round-robin over `parents`: 5 over 3 gives 2, 2, 1
pub fn distribute_slots(total: usize, parents: usize) -> Vec<usize> {
    if parents == 0 {
        return Vec::new();
    }
    (0..parents)
        .map(|p| total / parents + usize::from(p < total % parents))
        .collect()
}
