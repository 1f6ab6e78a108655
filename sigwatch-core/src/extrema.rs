//! Local extrema detection.
//!
//! A point is a peak when it is strictly greater than each of its `order`
//! neighbours on both sides, a valley when strictly smaller. Equal neighbours
//! disqualify the point, and so does an undefined (`NaN`) value anywhere in
//! the neighbourhood. Indices within `order` of either boundary are never
//! reported.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtremumKind {
    Peak,
    Valley,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExtremumPoint {
    pub index: usize,
    pub value: f64,
    pub kind: ExtremumKind,
}

/// Returns `(peaks, valleys)` as ascending index lists.
pub fn find_extrema(values: &[f64], order: usize) -> (Vec<usize>, Vec<usize>) {
    let mut peaks = Vec::new();
    let mut valleys = Vec::new();

    let n = values.len();
    if order == 0 || n < 2 * order + 1 {
        return (peaks, valleys);
    }

    for i in order..(n - order) {
        let v = values[i];
        let mut neighbours = (1..=order).flat_map(|j| [values[i - j], values[i + j]]);

        if neighbours.clone().all(|u| v > u) {
            peaks.push(i);
        } else if neighbours.all(|u| v < u) {
            valleys.push(i);
        }
    }

    (peaks, valleys)
}

/// Extrema as value-carrying points, in index order.
pub fn extremum_points(values: &[f64], order: usize) -> Vec<ExtremumPoint> {
    let (peaks, valleys) = find_extrema(values, order);
    let mut points: Vec<ExtremumPoint> = peaks
        .into_iter()
        .map(|index| ExtremumPoint {
            index,
            value: values[index],
            kind: ExtremumKind::Peak,
        })
        .chain(valleys.into_iter().map(|index| ExtremumPoint {
            index,
            value: values[index],
            kind: ExtremumKind::Valley,
        }))
        .collect();
    points.sort_by_key(|p| p.index);
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_peak_and_valley() {
        let v = [1.0, 2.0, 3.0, 9.0, 3.0, 2.0, 1.0, 0.0, -5.0, 0.0, 1.0, 2.0, 3.0];
        let (peaks, valleys) = find_extrema(&v, 3);
        assert_eq!(peaks, vec![3]);
        assert_eq!(valleys, vec![8]);
    }

    #[test]
    fn valley_must_undercut_both_sides() {
        // lower than everything on the left, but not than index 5
        let v = [5.0, 4.0, 3.0, 1.0, 2.0, 0.0, 6.0];
        let (peaks, valleys) = find_extrema(&v, 3);
        assert!(peaks.is_empty());
        assert!(valleys.is_empty());

        let (_, valleys) = find_extrema(&v, 1);
        assert_eq!(valleys, vec![3, 5]);
    }

    #[test]
    fn ties_disqualify() {
        let v = [1.0, 2.0, 3.0, 5.0, 5.0, 3.0, 2.0, 1.0];
        let (peaks, _) = find_extrema(&v, 3);
        assert!(peaks.is_empty());
    }

    #[test]
    fn boundaries_are_never_reported() {
        // global max at index 1 sits within `order` of the left edge
        let v = [0.0, 10.0, 1.0, 2.0, 3.0, 2.0, 1.0, 0.0];
        let (peaks, _) = find_extrema(&v, 2);
        assert_eq!(peaks, vec![4]);
    }

    #[test]
    fn nan_neighbourhood_disqualifies() {
        let v = [f64::NAN, 1.0, 2.0, 9.0, 2.0, 1.0, 0.0];
        let (peaks, _) = find_extrema(&v, 3);
        assert!(peaks.is_empty());
        let (peaks, _) = find_extrema(&v[1..], 2);
        assert_eq!(peaks, vec![2]);
    }

    #[test]
    fn short_or_zero_order_is_empty() {
        assert_eq!(find_extrema(&[1.0, 3.0, 1.0], 2), (vec![], vec![]));
        assert_eq!(find_extrema(&[1.0, 3.0, 1.0], 0), (vec![], vec![]));
    }

    #[test]
    fn points_are_sorted_with_values() {
        let v = [0.0, 5.0, 0.0, -5.0, 0.0, 5.0, 0.0];
        let pts = extremum_points(&v, 1);
        let idx: Vec<usize> = pts.iter().map(|p| p.index).collect();
        assert_eq!(idx, vec![1, 3, 5]);
        assert_eq!(pts[1].kind, ExtremumKind::Valley);
        assert_eq!(pts[1].value, -5.0);
    }
}
