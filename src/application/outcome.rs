/// Result of a controller operation.
///
/// Backend failures are logged where they happen and never propagated, so
/// callers only learn whether state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Outcome {
    /// The backend call succeeded and local state was updated.
    Done,
    /// Nothing was sent to the backend (missing input, declined confirmation).
    Skipped,
    /// The backend call failed; local state is unchanged.
    Failed,
}

impl Outcome {
    pub fn is_done(&self) -> bool {
        matches!(self, Outcome::Done)
    }
}
