//! Error kinds surfaced by the homing and probing state machines (spec §7).

/// Failure modes for [`crate::homer::Homer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HomingError {
    /// A watching phase (fast or slow approach) ran its full configured
    /// distance without the endstop triggering.
    EndstopNotTriggered,
    /// A non-watching phase (retract) was about to start with the endstop
    /// already asserted, which means the previous approach never actually
    /// cleared it.
    SpuriousEndstop,
}

/// Failure modes for [`crate::prober::Prober`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeError {
    /// The fast approach toward the bed never triggered the probe within
    /// `home_fast_max_dist` (spec §7 `EndstopNotTriggeredInProbeMove`).
    EndstopNotTriggeredInProbeMove,
    /// The probe point list is full; no more points can be recorded.
    TooManyPoints,
    /// The least-squares bed-correction solve produced a non-finite result.
    BadCorrections,
}
