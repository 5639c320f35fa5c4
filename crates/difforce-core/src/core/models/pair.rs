/// An unordered candidate interaction `i < j` with its covalent order.
///
/// `order` is `0` for atoms not connected within the covalent map's cap, otherwise the
/// bond-path length. Field order makes the derived `Ord` sort by `(i, j)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair {
    pub i: usize,
    pub j: usize,
    pub order: u8,
}

impl Pair {
    /// Builds a pair with indices in canonical `i < j` order.
    #[inline]
    pub fn new(a: usize, b: usize, order: u8) -> Self {
        Self {
            i: a.min(b),
            j: a.max(b),
            order,
        }
    }
}
