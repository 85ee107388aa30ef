use std::cmp::PartialOrd;

/// A pair of elements sorted in increasing order.
///
/// Used as an undirected edge key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct SortedPair<T: PartialOrd>([T; 2]);

impl<T: PartialOrd + Copy> SortedPair<T> {
    /// Sorts two elements in increasing order into a new pair.
    pub fn new(element1: T, element2: T) -> Self {
        if element1 > element2 {
            SortedPair([element2, element1])
        } else {
            SortedPair([element1, element2])
        }
    }

    /// The smallest element.
    #[inline]
    pub fn low(&self) -> T {
        self.0[0]
    }

    /// The largest element.
    #[inline]
    pub fn high(&self) -> T {
        self.0[1]
    }

    /// Given one element of the pair, returns the other one.
    #[inline]
    pub fn other(&self, element: T) -> T {
        if self.0[0] == element {
            self.0[1]
        } else {
            self.0[0]
        }
    }
}

#[cfg(test)]
mod test {
    use super::SortedPair;

    #[test]
    fn pair_is_sorted_by_value() {
        let edge = SortedPair::new(7u32, 3);
        assert_eq!(edge.low(), 3);
        assert_eq!(edge.high(), 7);
        assert_eq!(edge.other(3), 7);
        assert_eq!(edge, SortedPair::new(3, 7));

        let by_value = |e: SortedPair<u32>| (e.low(), e.high());
        assert_eq!(by_value(edge), (3, 7));
    }
}
