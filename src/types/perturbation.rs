/// Label value that marks "no derivative". A tuple containing it is skipped entirely.
pub const NO_DERIVATIVE: usize = 0;

/// Cartesian direction of a center-component label.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CartesianAxis {
    X,
    Y,
    Z,
}

impl CartesianAxis {
    pub fn index(&self) -> usize {
        match self {
            CartesianAxis::X => 0,
            CartesianAxis::Y => 1,
            CartesianAxis::Z => 2,
        }
    }
}

/// Atomic center of a one-based center-component label.
/// The labels 1, 2, 3 are x, y, z of center 0, 4, 5, 6 of center 1 and so on.
/// Panics for [NO_DERIVATIVE], which does not name a center.
pub fn center_of(label: usize) -> usize {
    assert_ne!(label, NO_DERIVATIVE, "label 0 does not refer to a center");
    (label - 1) / 3
}

/// Cartesian axis of a one-based center-component label.
pub fn axis_of(label: usize) -> CartesianAxis {
    assert_ne!(label, NO_DERIVATIVE, "label 0 does not refer to an axis");
    match (label - 1) % 3 {
        0 => CartesianAxis::X,
        1 => CartesianAxis::Y,
        _ => CartesianAxis::Z,
    }
}

/// Center-component label of `axis` on `center`.
pub fn label_of(center: usize, axis: CartesianAxis) -> usize {
    3 * center + axis.index() + 1
}

/// Number of derivatives along x, y and z contained in a perturbation tuple.
pub fn axis_counts(coor: &[usize]) -> [usize; 3] {
    let mut counts: [usize; 3] = [0, 0, 0];
    for label in coor.iter() {
        counts[axis_of(*label).index()] += 1;
    }
    counts
}

/// Centers of all labels of a perturbation tuple, in tuple order.
pub fn centers_of(coor: &[usize]) -> Vec<usize> {
    coor.iter().map(|label| center_of(*label)).collect()
}

/// An AO on `center` takes part in a derivative if every label of the tuple refers
/// to that center. This is always true for an empty tuple (no derivatives).
pub fn is_same_center(center: usize, centers: &[usize]) -> bool {
    centers.iter().all(|c| *c == center)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_decode_to_center_and_axis() {
        assert_eq!(center_of(1), 0);
        assert_eq!(center_of(3), 0);
        assert_eq!(center_of(4), 1);
        assert_eq!(center_of(9), 2);
        assert_eq!(axis_of(1), CartesianAxis::X);
        assert_eq!(axis_of(5), CartesianAxis::Y);
        assert_eq!(axis_of(9), CartesianAxis::Z);
        for center in 0..5 {
            for axis in [CartesianAxis::X, CartesianAxis::Y, CartesianAxis::Z].iter() {
                let label: usize = label_of(center, *axis);
                assert_eq!(center_of(label), center);
                assert_eq!(axis_of(label), *axis);
            }
        }
    }

    #[test]
    fn axis_counts_of_mixed_tuple() {
        // x of center 0, z of center 0, x of center 0 again
        assert_eq!(axis_counts(&[1, 3, 1]), [2, 0, 1]);
        assert_eq!(axis_counts(&[]), [0, 0, 0]);
    }

    #[test]
    fn same_center_rules() {
        assert!(is_same_center(7, &[]));
        assert!(is_same_center(1, &[1, 1]));
        assert!(!is_same_center(1, &[1, 2]));
        assert!(!is_same_center(0, &[1]));
    }

    #[test]
    #[should_panic]
    fn sentinel_has_no_center() {
        let _ = centers_of(&[4, NO_DERIVATIVE]);
    }
}
