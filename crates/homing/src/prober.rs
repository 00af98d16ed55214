//! Bed-probing state machine (spec §4.5 "Prober").
//!
//! A probing pass visits a configured list of `(x, y)` points. At each
//! point: move to `(x, y)` at travel height, fast-approach down while
//! watching the probe, retract, slow-approach down again while watching and
//! recording the triggered Z, then move back up to travel height. Once every
//! point has been visited the accumulated points are handed to
//! [`crate::leveling::LevelingState`] for the least-squares fit; the caller
//! decides whether to apply the result (spec's `apply`/`D` flag) or run the
//! pass dry (report-only).

use crate::errors::ProbeError;
use crate::leveling::{BedCorrection, LevelingState, ProbePoint};

/// Static probing parameters, analogous to [`crate::homer::HomerConfig`] but
/// for a single shared Z probe driven over a list of XY points.
#[derive(Debug, Clone, Copy)]
pub struct ProberConfig {
    pub travel_height: f64,
    pub probe_fast_speed: f64,
    pub probe_fast_max_dist: f64,
    pub probe_retract_dist: f64,
    pub probe_retract_speed: f64,
    pub probe_slow_speed: f64,
    pub probe_slow_max_dist: f64,
    pub xy_travel_speed: f64,
}

/// One request the caller should turn into an actual move. Probing mixes
/// two kinds of motion: lateral repositioning (not endstop-watched) and
/// vertical probing (watched, like [`crate::homer::MoveRequest`]).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProbeRequest {
    /// Move to `(x, y)` at the configured travel height, at XY travel speed.
    MoveToPoint { x: f64, y: f64 },
    /// A vertical move relative to the current Z, exactly like a homing move.
    Vertical { distance: f64, speed: f64, watch_endstop: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    MoveToPoint,
    FastApproach,
    Retract,
    SlowApproach,
    MoveBackUp,
    Done,
    Failed,
}

/// Drives a full bed-probing pass across a list of points.
pub struct Prober {
    config: ProberConfig,
    points: heapless::Vec<(f64, f64), { crate::leveling::MAX_PROBE_POINTS }>,
    current: usize,
    phase: Phase,
    /// Z reached during `SlowApproach`, recorded against `points[current]`
    /// once the probe triggers.
    triggered_z: f64,
    leveling: LevelingState,
    error: Option<ProbeError>,
}

impl Prober {
    pub fn new(config: ProberConfig, points: &[(f64, f64)], quadratic: bool) -> Result<Self, ProbeError> {
        let mut stored = heapless::Vec::new();
        for &p in points {
            stored.push(p).map_err(|_| ProbeError::TooManyPoints)?;
        }
        if stored.is_empty() {
            return Err(ProbeError::TooManyPoints);
        }
        Ok(Self {
            config,
            points: stored,
            current: 0,
            phase: Phase::MoveToPoint,
            triggered_z: 0.0,
            leveling: LevelingState::new(quadratic),
            error: None,
        })
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done | Phase::Failed)
    }

    pub fn error(&self) -> Option<ProbeError> {
        self.error
    }

    pub fn points_recorded(&self) -> &[ProbePoint] {
        self.leveling.points()
    }

    pub fn next_request(&self) -> Option<ProbeRequest> {
        if self.current >= self.points.len() {
            return None;
        }
        let (x, y) = self.points[self.current];
        match self.phase {
            Phase::MoveToPoint => Some(ProbeRequest::MoveToPoint { x, y }),
            Phase::FastApproach => Some(ProbeRequest::Vertical {
                distance: -self.config.probe_fast_max_dist,
                speed: self.config.probe_fast_speed,
                watch_endstop: true,
            }),
            Phase::Retract => Some(ProbeRequest::Vertical {
                distance: self.config.probe_retract_dist,
                speed: self.config.probe_retract_speed,
                watch_endstop: false,
            }),
            Phase::SlowApproach => Some(ProbeRequest::Vertical {
                distance: -self.config.probe_slow_max_dist,
                speed: self.config.probe_slow_speed,
                watch_endstop: true,
            }),
            Phase::MoveBackUp => Some(ProbeRequest::Vertical {
                distance: self.config.travel_height - self.triggered_z,
                speed: self.config.probe_retract_speed,
                watch_endstop: false,
            }),
            Phase::Done | Phase::Failed => None,
        }
    }

    /// Reports the outcome of the move `next_request` described.
    ///
    /// `endstop_triggered` matters only for the watching phases (fast/slow
    /// approach); `z_at_finish` is the machine's absolute Z when the move
    /// ended, used to record the triggered height during `SlowApproach`.
    pub fn on_move_finished(&mut self, endstop_triggered: bool, z_at_finish: f64) {
        match self.phase {
            Phase::MoveToPoint => {
                self.phase = Phase::FastApproach;
            }
            Phase::FastApproach => {
                if endstop_triggered {
                    self.phase = Phase::Retract;
                } else {
                    self.error = Some(ProbeError::EndstopNotTriggeredInProbeMove);
                    self.phase = Phase::Failed;
                }
            }
            Phase::Retract => {
                self.phase = Phase::SlowApproach;
            }
            Phase::SlowApproach => {
                if endstop_triggered {
                    self.triggered_z = z_at_finish;
                    let (x, y) = self.points[self.current];
                    if let Err(e) = self.leveling.record(ProbePoint { x, y, z: z_at_finish }) {
                        self.error = Some(e);
                        self.phase = Phase::Failed;
                        return;
                    }
                    self.phase = Phase::MoveBackUp;
                } else {
                    self.error = Some(ProbeError::EndstopNotTriggeredInProbeMove);
                    self.phase = Phase::Failed;
                }
            }
            Phase::MoveBackUp => {
                self.current += 1;
                self.phase = if self.current >= self.points.len() { Phase::Done } else { Phase::MoveToPoint };
            }
            Phase::Done | Phase::Failed => {}
        }
    }

    /// Fits the bed correction surface from the points recorded so far.
    /// Valid once `is_done()` reports success; may also be called mid-pass
    /// for diagnostics since the fit only needs enough points.
    pub fn fit(&self) -> Result<BedCorrection, ProbeError> {
        self.leveling.fit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ProberConfig {
        ProberConfig {
            travel_height: 10.0,
            probe_fast_speed: 5.0,
            probe_fast_max_dist: 15.0,
            probe_retract_dist: 2.0,
            probe_retract_speed: 5.0,
            probe_slow_speed: 1.0,
            probe_slow_max_dist: 3.0,
            xy_travel_speed: 100.0,
        }
    }

    fn drive_one_point(prober: &mut Prober, z: f64) {
        assert!(matches!(prober.next_request().unwrap(), ProbeRequest::MoveToPoint { .. }));
        prober.on_move_finished(false, 0.0);
        assert!(matches!(prober.next_request().unwrap(), ProbeRequest::Vertical { watch_endstop: true, .. }));
        prober.on_move_finished(true, 0.0);
        assert!(matches!(
            prober.next_request().unwrap(),
            ProbeRequest::Vertical { watch_endstop: false, .. }
        ));
        prober.on_move_finished(false, 0.0);
        assert!(matches!(prober.next_request().unwrap(), ProbeRequest::Vertical { watch_endstop: true, .. }));
        prober.on_move_finished(true, z);
        assert!(matches!(
            prober.next_request().unwrap(),
            ProbeRequest::Vertical { watch_endstop: false, .. }
        ));
        prober.on_move_finished(false, 10.0);
    }

    #[test]
    fn visits_all_points_then_fits_a_flat_bed() {
        let points = [(0.0, 0.0), (100.0, 0.0), (0.0, 100.0)];
        let mut prober = Prober::new(config(), &points, false).unwrap();
        for _ in 0..3 {
            drive_one_point(&mut prober, 0.5);
        }
        assert!(prober.is_done());
        assert!(prober.error().is_none());
        let fit = prober.fit().unwrap();
        assert!((fit.c0 - 0.5).abs() < 1e-6);
        assert!(fit.cx.abs() < 1e-6);
        assert!(fit.cy.abs() < 1e-6);
    }

    #[test]
    fn missed_fast_approach_fails_the_pass() {
        let points = [(0.0, 0.0)];
        let mut prober = Prober::new(config(), &points, false).unwrap();
        prober.on_move_finished(false, 0.0); // MoveToPoint
        prober.on_move_finished(false, 0.0); // FastApproach, never triggers
        assert!(prober.is_done());
        assert_eq!(prober.error(), Some(ProbeError::EndstopNotTriggeredInProbeMove));
    }

    #[test]
    fn empty_point_list_is_rejected() {
        assert_eq!(Prober::new(config(), &[], false).err(), Some(ProbeError::TooManyPoints));
    }
}
