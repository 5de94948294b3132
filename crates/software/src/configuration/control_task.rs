use embassy_time::Duration;

/// The jobs run by the [`Scheduler`][crate::scheduler::Scheduler] at a fixed rate. Reading the panel is not one of
/// them; it happens on every pass through the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlTask {
    /// Sends Control Change messages for faders which have moved. Runs as often as practical while leaving room for
    /// the rest of the loop.
    TransmitMidi,
    /// Redraws the display if anything changed. Writing to the display is slow, so this runs only a handful of times
    /// per second.
    RefreshDisplay,
}

impl ControlTask {
    /// Both tasks, in the order they are registered with the scheduler.
    pub const ALL: [ControlTask; 2] = [ControlTask::TransmitMidi, ControlTask::RefreshDisplay];

    /// Returns how often the task runs.
    pub fn period(&self) -> Duration {
        match self {
            Self::TransmitMidi => Duration::from_millis(5),
            Self::RefreshDisplay => Duration::from_millis(50),
        }
    }
}
