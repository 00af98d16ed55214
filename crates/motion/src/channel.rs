//! Channel commands: non-motion events scheduled inline with the motion
//! stream (heaters, fans, digital outputs, dwell, laser power) so they fire
//! at the exact step position the G-code issuing them implied, rather than
//! racing ahead of or behind the motion they were interleaved with.

/// A non-motion event carried in the same ordered stream as motion segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelCommand {
    /// Sets a heater's target temperature without waiting for it to settle.
    SetHeaterTarget { heater: u8, target_celsius: f32 },
    /// Sets a fan/laser PWM channel to a duty cycle in `[0.0, 1.0]`.
    SetPwmChannel { channel: u8, duty: f32 },
    /// Sets a plain digital output.
    SetDigitalOutput { pin: u8, state: bool },
    /// Pauses the command stream for a fixed duration before continuing.
    Dwell { duration_ticks: u32 },
    /// Emits a line number / checkpoint marker used for resend bookkeeping;
    /// carries no hardware effect.
    Checkpoint { sequence: u32 },
}

/// Capacity of the channel-command staging queue `MotionPlanner` holds for
/// commands submitted ahead of whatever segment they'll end up riding on
/// (spec §3.4, §4.1 `submit_channel_command`). Sized independently of the
/// segment look-ahead buffer since channel commands are cheap to hold.
pub const CHANNEL_BUFFER_SIZE: usize = 16;

/// A plain FIFO, not a producer/consumer split: `MotionPlanner` is the only
/// thing that ever pushes to or pops from this queue, from the same main
/// context `push`/`submit_channel_command` run in.
pub type ChannelQueue = heapless::Deque<ChannelCommand, { CHANNEL_BUFFER_SIZE + 1 }>;
