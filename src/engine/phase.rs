use crate::control::ControlSignal;

/// Engine lifecycle.
///
/// ```text
/// Running --INT--> RemapRequested --(end of iteration)--> AwaitingRemap
///    ^                                                        |
///    +----------------- new input path ----------------------+
///
/// any --TERM--> Terminating      RemapRequested/AwaitingRemap --INT--> Terminating
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Running,
    /// An interrupt arrived; the current iteration finishes before prompting
    RemapRequested,
    /// Blocked on the operator for a new input path
    AwaitingRemap,
    /// Terminal
    Terminating,
}

impl Phase {
    /// The only place signals turn into state changes.
    pub fn on_signal(self, signal: ControlSignal) -> Phase {
        match (self, signal) {
            (Phase::Running, ControlSignal::Interrupt) => Phase::RemapRequested,
            (_, ControlSignal::Interrupt) => Phase::Terminating,
            (_, ControlSignal::Terminate) => Phase::Terminating,
        }
    }

    pub fn is_terminating(self) -> bool {
        self == Phase::Terminating
    }
}
