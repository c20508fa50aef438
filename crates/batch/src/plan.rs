use std::fmt::{self, Display, Formatter};
use thumbs_engine::Dimensions;

/// Longest-side pixel length of a thumbnail.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetSize(u32);

/// Every size a thumbnail can be generated at, largest first.
pub const TARGET_SIZES: [TargetSize; 7] = [
    TargetSize::new(2500),
    TargetSize::new(2000),
    TargetSize::new(1500),
    TargetSize::new(1000),
    TargetSize::new(750),
    TargetSize::new(500),
    TargetSize::new(250),
];

impl TargetSize {
    pub(crate) const fn new(pixels: u32) -> Self {
        Self(pixels)
    }

    pub fn pixels(&self) -> u32 {
        self.0
    }

    /// Filename fragment identifying a thumbnail of this size, e.g. `250px`.
    pub fn marker(&self) -> String {
        format!("{}px", self.0)
    }
}

impl Display for TargetSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}px", self.0)
    }
}

/// Sizes strictly smaller than the image's longest side, largest first.
///
/// An empty plan means the image is already small enough; that's a skip, not
/// a failure.
pub fn plan(dimensions: Dimensions) -> Vec<TargetSize> {
    let longest = dimensions.longest_side();
    TARGET_SIZES.into_iter().filter(|size| size.pixels() < longest).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    fn pixels(plan: Vec<TargetSize>) -> Vec<u32> {
        plan.iter().map(TargetSize::pixels).collect()
    }

    #[rstest]
    #[case(dims(3000, 2000), vec![2500, 2000, 1500, 1000, 750, 500, 250])]
    #[case(dims(2000, 3000), vec![2500, 2000, 1500, 1000, 750, 500, 250])]
    #[case(dims(2501, 1), vec![2500, 2000, 1500, 1000, 750, 500, 250])]
    #[case(dims(2500, 2500), vec![2000, 1500, 1000, 750, 500, 250])]
    #[case(dims(800, 600), vec![750, 500, 250])]
    #[case(dims(600, 800), vec![750, 500, 250])]
    #[case(dims(751, 10), vec![750, 500, 250])]
    #[case(dims(750, 10), vec![500, 250])]
    #[case(dims(251, 251), vec![250])]
    fn test_plan(#[case] dimensions: Dimensions, #[case] expected: Vec<u32>) {
        assert_eq!(pixels(plan(dimensions)), expected);
    }

    #[rstest]
    #[case(dims(250, 250))]
    #[case(dims(250, 100))]
    #[case(dims(1, 1))]
    fn test_plan_nothing_to_do(#[case] dimensions: Dimensions) {
        assert!(plan(dimensions).is_empty());
    }

    #[test]
    fn sizes_are_strictly_descending() {
        assert!(TARGET_SIZES.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn target_sizes_in_pixels() {
        assert_eq!(TARGET_SIZES.map(|s| s.pixels()), [2500, 2000, 1500, 1000, 750, 500, 250]);
    }

    #[test]
    fn marker_and_display_agree() {
        assert_eq!(TargetSize::new(1000).marker(), "1000px");
        assert_eq!(TargetSize::new(1000).to_string(), "1000px");
    }
}
