/// Where a session stands in its schedule.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// Nothing has been run yet.
    #[default]
    Setup,
    /// A scheduled trial is on the shelves.
    Running,
    /// The last lookup found no trial: the schedule is exhausted or was
    /// never loaded.
    Complete,
}

impl SessionPhase {
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self, SessionPhase::Running)
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, SessionPhase::Complete)
    }
}
