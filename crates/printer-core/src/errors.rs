//! The core's unified error type (spec §7): every failure surfaced to the
//! G-code source as an `Error:<token>` reply.

use motion::PlannerError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoreError {
    Planner(PlannerError),
    Homing(homing::HomingError),
    Probe(homing::ProbeError),
    /// A heater's safety monitor reported [`thermal::safety::ThermalState::Shutdown`].
    ThermalShutdown,
    /// An unplanned/locked command was requested while another already
    /// holds `locked_command`.
    PlannerBusy,
    /// `try_unplanned_command`/`try_locked_command` was called before the
    /// planner had fully drained (drain-before-unplanned violation).
    NotDrained,
    /// The axis index passed to a core method is out of range for this
    /// machine's configured axis count.
    InvalidAxis,
}

impl CoreError {
    /// The `<token>` half of the `Error:<token>` reply format.
    pub fn token(&self) -> &'static str {
        match self {
            CoreError::Planner(PlannerError::BufferFull) => "PlannerBufferFull",
            CoreError::Planner(PlannerError::InvalidMove) => "InvalidMove",
            CoreError::Planner(PlannerError::OutOfBounds { .. }) => "OutOfBounds",
            CoreError::Homing(homing::HomingError::EndstopNotTriggered) => "EndstopNotTriggered",
            CoreError::Homing(homing::HomingError::SpuriousEndstop) => "SpuriousEndstop",
            CoreError::Probe(homing::ProbeError::EndstopNotTriggeredInProbeMove) => {
                "EndstopNotTriggeredInProbeMove"
            }
            CoreError::Probe(homing::ProbeError::TooManyPoints) => "TooManyProbePoints",
            CoreError::Probe(homing::ProbeError::BadCorrections) => "BadCorrections",
            CoreError::ThermalShutdown => "ThermalShutdown",
            CoreError::PlannerBusy => "PlannerBusy",
            CoreError::NotDrained => "NotDrained",
            CoreError::InvalidAxis => "InvalidAxis",
        }
    }
}

impl From<PlannerError> for CoreError {
    fn from(e: PlannerError) -> Self {
        CoreError::Planner(e)
    }
}

impl From<homing::HomingError> for CoreError {
    fn from(e: homing::HomingError) -> Self {
        CoreError::Homing(e)
    }
}

impl From<homing::ProbeError> for CoreError {
    fn from(e: homing::ProbeError) -> Self {
        CoreError::Probe(e)
    }
}
