use std::fmt;

/// Handle of a rendering-backend marker, `(index, generation)`.
///
/// The generation distinguishes a re-created marker from a released one that
/// happened to reuse the same index.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(u32, u32);

impl MarkerHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        MarkerHandle(index, generation)
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn generation(self) -> u32 {
        self.1
    }
}

impl fmt::Display for MarkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}v{}", self.0, self.1)
    }
}
