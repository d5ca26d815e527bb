use crate::domain::Interval;

/// Merge possibly-overlapping intervals of one host into a sorted, disjoint list.
///
/// Touching intervals (`next.start == current.end`) are merged too. Empty intervals are dropped.
pub fn merge_intervals(intervals: &[Interval]) -> Vec<Interval> {
    let mut sorted: Vec<Interval> = intervals.iter().copied().filter(|iv| !iv.is_empty()).collect();
    sorted.sort();

    let mut merged: Vec<Interval> = Vec::with_capacity(sorted.len());
    for iv in sorted {
        match merged.last_mut() {
            Some(current) if iv.start <= current.end => {
                current.end = current.end.max(iv.end);
            }
            _ => merged.push(iv),
        }
    }
    merged
}

/// Total seconds covered by a merged interval list.
pub fn covered_seconds(merged: &[Interval]) -> i64 {
    merged.iter().map(Interval::duration).sum()
}
