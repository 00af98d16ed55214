//! Host-to-MCU wire framing.
//!
//! The link between `printer-host` and a real board is a single UART.
//! Frames are small and fixed-size so the bridge task can decode them
//! without buffering a variable-length message: a one-byte start-of-frame
//! marker, a one-byte command tag, the payload, and a trailing XOR checksum
//! over every byte from the tag to the end of the payload.

use crate::fixed_point::Fixed16_16;
use stepper::Command as StepCommand;

/// Number of heaters the firmware tracks (extruder, bed).
pub const MAX_HEATERS: usize = 2;
/// Number of stepper axes the firmware drives (X, Y, Z, E).
pub const MAX_AXES: usize = 4;

const SOF: u8 = 0xAA;
const TAG_STEP: u8 = 0x01;
const TAG_SET_TARGET: u8 = 0x02;

/// Length in bytes of a `Step` frame: SOF, tag, axis, direction, step_count(4),
/// v0(4), accel(4), time_mul(4), checksum.
pub const STEP_FRAME_LEN: usize = 1 + 1 + 1 + 1 + 4 + 4 + 4 + 4 + 1;
/// Length in bytes of a `SetHeaterTarget` frame: SOF, tag, heater, target(4), checksum.
pub const SET_TARGET_FRAME_LEN: usize = 1 + 1 + 1 + 4 + 1;

/// A decoded command from the host.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HostCommand {
    /// Enqueue one step-time-integrator segment on the given axis.
    Step { axis: u8, command: StepCommand },
    /// Set a heater's target temperature.
    SetHeaterTarget { heater: u8, target: Fixed16_16 },
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Attempts to decode one frame starting at the beginning of `buf`.
///
/// Returns the decoded command and the number of bytes consumed, or `None`
/// if `buf` does not start with a recognized, checksum-valid frame. The
/// caller is responsible for resynchronizing (e.g. dropping one byte and
/// retrying) when decoding fails.
pub fn decode_frame(buf: &[u8]) -> Option<(HostCommand, usize)> {
    if buf.is_empty() || buf[0] != SOF {
        return None;
    }
    let tag = *buf.get(1)?;
    match tag {
        TAG_STEP => {
            if buf.len() < STEP_FRAME_LEN {
                return None;
            }
            let frame = &buf[..STEP_FRAME_LEN];
            if checksum(&frame[1..STEP_FRAME_LEN - 1]) != frame[STEP_FRAME_LEN - 1] {
                return None;
            }
            let axis = frame[2];
            let direction = frame[3] != 0;
            let step_count = u32::from_le_bytes(frame[4..8].try_into().ok()?);
            let v0 = u32::from_le_bytes(frame[8..12].try_into().ok()?);
            let accel = i32::from_le_bytes(frame[12..16].try_into().ok()?);
            let time_mul = u32::from_le_bytes(frame[16..20].try_into().ok()?);
            let command = StepCommand::new(direction, step_count, v0, accel, time_mul);
            Some((HostCommand::Step { axis, command }, STEP_FRAME_LEN))
        }
        TAG_SET_TARGET => {
            if buf.len() < SET_TARGET_FRAME_LEN {
                return None;
            }
            let frame = &buf[..SET_TARGET_FRAME_LEN];
            if checksum(&frame[1..SET_TARGET_FRAME_LEN - 1]) != frame[SET_TARGET_FRAME_LEN - 1] {
                return None;
            }
            let heater = frame[2];
            let raw = i32::from_le_bytes(frame[3..7].try_into().ok()?);
            Some((HostCommand::SetHeaterTarget { heater, target: Fixed16_16(raw) }, SET_TARGET_FRAME_LEN))
        }
        _ => None,
    }
}

/// Length in bytes of a telemetry frame reporting one heater's temperature.
pub const TEMP_REPORT_FRAME_LEN: usize = 1 + 1 + 1 + 4 + 1;
const TAG_TEMP_REPORT: u8 = 0x80;

/// Encodes a temperature telemetry frame for `heater` into `out`, returning
/// the number of bytes written. `out` must be at least `TEMP_REPORT_FRAME_LEN`
/// bytes long.
pub fn encode_temp_report(out: &mut [u8], heater: u8, temp: Fixed16_16) -> usize {
    out[0] = SOF;
    out[1] = TAG_TEMP_REPORT;
    out[2] = heater;
    out[3..7].copy_from_slice(&temp.0.to_le_bytes());
    out[7] = checksum(&out[1..7]);
    TEMP_REPORT_FRAME_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_step_frame() {
        let command = StepCommand::new(true, 100, 4000, -200, 1_000_000);
        let mut buf = [0u8; STEP_FRAME_LEN];
        buf[0] = SOF;
        buf[1] = TAG_STEP;
        buf[2] = 1; // axis Y
        buf[3] = command.direction as u8;
        buf[4..8].copy_from_slice(&command.step_count.to_le_bytes());
        buf[8..12].copy_from_slice(&command.v0.to_le_bytes());
        buf[12..16].copy_from_slice(&command.accel.to_le_bytes());
        buf[16..20].copy_from_slice(&command.time_mul.to_le_bytes());
        buf[20] = checksum(&buf[1..20]);

        let (decoded, consumed) = decode_frame(&buf).unwrap();
        assert_eq!(consumed, STEP_FRAME_LEN);
        assert_eq!(decoded, HostCommand::Step { axis: 1, command });
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut buf = [0u8; STEP_FRAME_LEN];
        buf[0] = SOF;
        buf[1] = TAG_STEP;
        buf[STEP_FRAME_LEN - 1] = 0xFF;
        assert!(decode_frame(&buf).is_none());
    }

    #[test]
    fn round_trips_a_temp_report() {
        let mut buf = [0u8; TEMP_REPORT_FRAME_LEN];
        let n = encode_temp_report(&mut buf, 0, Fixed16_16::from_float(205.5));
        assert_eq!(n, TEMP_REPORT_FRAME_LEN);
        assert_eq!(buf[0], SOF);
        assert_eq!(buf[2], 0);
    }
}
