//! Landmark sources: LeapMotion hardware and a mouse/keyboard simulation.
//!
//! The public interface is [`InputEvent`] delivered over a `mpsc` channel.
//! Consumers don't need to know whether frames came from real hardware or
//! from the simulated hand that follows the mouse.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::debug;

use gesture_tone::landmark::{Landmark, LandmarkFrame, LANDMARK_COUNT};

// ════════════════════════════════════════════════════════════════════════════
// InputEvent
// ════════════════════════════════════════════════════════════════════════════

/// A user command from the keyboard, independent of hand tracking.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCommand {
    /// Unlock audio output (the sink stays silent until this happens).
    ArmAudio,
    /// Start a new recording, or stop the current one.
    ToggleRecording,
    ClearRecording,
    PlayAll,
    PlaySelected,
    StopPlayback,
    SelectAll,
    DeselectAll,
    /// Flip the selection of one event (0-based).
    ToggleSelection(usize),
    VolumeUp,
    VolumeDown,
}

/// Everything the control loop consumes.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    /// One tracked hand.
    Frame(LandmarkFrame),
    /// The tracker ran but saw no hand.
    NoHand,
    Control(ControlCommand),
    Quit,
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait: unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`InputEvent`]s over a channel.
pub trait LandmarkSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<InputEvent>);
}

// ════════════════════════════════════════════════════════════════════════════
// Spawn helpers
// ════════════════════════════════════════════════════════════════════════════

/// Spawn a source on its own thread and return the receiving end.
pub fn spawn_landmark_source<L: LandmarkSource>(source: L) -> Receiver<InputEvent> {
    let (tx, rx) = mpsc::channel();
    spawn_into(source, tx);
    rx
}

/// Spawn a source that feeds an existing channel, so several sources can
/// share one consumer.
pub fn spawn_into<L: LandmarkSource>(source: L, tx: Sender<InputEvent>) {
    thread::spawn(move || Box::new(source).run(tx));
}

// ════════════════════════════════════════════════════════════════════════════
// Synthetic hand
// ════════════════════════════════════════════════════════════════════════════

/// Offsets of every landmark from the index fingertip, in normalised image
/// units, for a relaxed right hand pointing up.  Order follows the usual
/// 21-point layout: wrist, then thumb, index, middle, ring, pinky from
/// base to tip.
const HAND_SHAPE: [(f32, f32); LANDMARK_COUNT] = [
    ( 0.040,  0.300), // wrist
    (-0.030,  0.270), (-0.070, 0.220), (-0.095, 0.175), (-0.110, 0.135), // thumb
    ( 0.000,  0.150), ( 0.000, 0.090), ( 0.000, 0.040), ( 0.000, 0.000), // index
    ( 0.035,  0.150), ( 0.037, 0.085), ( 0.038, 0.035), ( 0.039,-0.010), // middle
    ( 0.065,  0.160), ( 0.070, 0.100), ( 0.073, 0.060), ( 0.075, 0.025), // ring
    ( 0.090,  0.180), ( 0.098, 0.135), ( 0.102, 0.105), ( 0.105, 0.080), // pinky
];

/// Build a plausible hand whose index fingertip sits at `(tip_x, tip_y)`
/// and whose landmarks all share `depth`.
pub fn synthetic_hand(tip_x: f32, tip_y: f32, depth: f32) -> LandmarkFrame {
    let mut points = [Landmark::default(); LANDMARK_COUNT];
    for (p, &(dx, dy)) in points.iter_mut().zip(HAND_SHAPE.iter()) {
        *p = Landmark::new(tip_x + dx, tip_y + dy, depth);
    }
    LandmarkFrame::from_array(points)
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource: mouse/keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the simulation window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Mouse over the stage, normalised to `[0,1]²`.
    Pointer { x: f32, y: f32 },
    /// Mouse left the stage.
    PointerLost,
    /// Nudge the simulated depth (scroll wheel / arrow keys).
    Depth(f32),
    Command(ControlCommand),
    Quit,
}

/// Landmark source driven by [`SimInput`] events from the visualizer
/// window.  Converts pointer positions into full 21-point frames.
pub struct SimLandmarkSource {
    rx:         Receiver<SimInput>,
    depth:      f32,
    depth_min:  f32,
    depth_max:  f32,
    /// When false only commands are forwarded (hardware supplies frames).
    emit_frames: bool,
}

impl SimLandmarkSource {
    /// Full simulation: frames and commands.  `depth_range` bounds the
    /// simulated depth; it starts at the midpoint.
    pub fn new(rx: Receiver<SimInput>, depth_range: (f32, f32)) -> Self {
        let (lo, hi) = depth_range;
        Self { rx, depth: (lo + hi) / 2.0, depth_min: lo, depth_max: hi, emit_frames: true }
    }

    /// Forward only keyboard commands.
    pub fn controls_only(rx: Receiver<SimInput>) -> Self {
        Self { rx, depth: 0.0, depth_min: 0.0, depth_max: 0.0, emit_frames: false }
    }

    /// Translate one window event; `None` when nothing is to be sent.
    fn translate(&mut self, input: SimInput) -> Option<InputEvent> {
        match input {
            SimInput::Pointer { x, y } if self.emit_frames => {
                Some(InputEvent::Frame(synthetic_hand(x, y, self.depth)))
            }
            SimInput::PointerLost if self.emit_frames => Some(InputEvent::NoHand),
            SimInput::Depth(delta) if self.emit_frames => {
                self.depth = (self.depth + delta).clamp(self.depth_min, self.depth_max);
                debug!(depth = self.depth, "simulated depth");
                None
            }
            SimInput::Command(cmd) => Some(InputEvent::Control(cmd)),
            SimInput::Quit         => Some(InputEvent::Quit),
            _ => None,
        }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn run(mut self: Box<Self>, tx: Sender<InputEvent>) {
        while let Ok(input) = self.rx.recv() {
            let Some(event) = self.translate(input) else { continue };
            let quit = event == InputEvent::Quit;
            if tx.send(event).is_err() || quit {
                return;
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapLandmarkSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Landmark source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// The first tracked hand is converted into the 21-point layout: the wrist
/// from the middle metacarpal base, then for each digit the joints at the
/// base of the proximal, intermediate and distal bones plus the tip.
/// Leap millimetres are mapped to normalised image coordinates over an
/// interaction box above the device.
#[cfg(feature = "leap")]
pub struct LeapLandmarkSource;

#[cfg(feature = "leap")]
impl LandmarkSource for LeapLandmarkSource {
    fn run(self: Box<Self>, tx: Sender<InputEvent>) {
        use leaprs::*;
        use tracing::{error, info};

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                error!(error = ?e, "failed to create LeapC connection");
                return;
            }
        };
        if let Err(e) = connection.open() {
            error!(error = ?e, "failed to open LeapMotion device");
            return;
        }
        info!("LeapMotion connected");

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };
            if let Event::Tracking(frame) = msg.event() {
                let event = match frame.hands().next() {
                    Some(hand) => InputEvent::Frame(leap_hand_to_frame(&hand)),
                    None       => InputEvent::NoHand,
                };
                if tx.send(event).is_err() {
                    return;
                }
            }
        }
    }
}

/// Interaction box above the device, millimetres.
#[cfg(feature = "leap")]
mod leap_box {
    pub const X_HALF: f32 = 200.0;
    pub const Y_LOW:  f32 = 100.0;
    pub const Y_SPAN: f32 = 400.0;
    /// Depth units per millimetre (toward the screen is negative).
    pub const Z_SCALE: f32 = 0.001;
}

#[cfg(feature = "leap")]
fn to_landmark(x: f32, y: f32, z: f32) -> Landmark {
    Landmark::new(
        (x + leap_box::X_HALF) / (2.0 * leap_box::X_HALF),
        1.0 - (y - leap_box::Y_LOW) / leap_box::Y_SPAN,
        z * leap_box::Z_SCALE,
    )
}

#[cfg(feature = "leap")]
fn leap_hand_to_frame(hand: &leaprs::Hand) -> LandmarkFrame {
    macro_rules! joint {
        ($v:expr) => {{
            let v = $v;
            to_landmark(v.x, v.y, v.z)
        }};
    }

    let mut points = [Landmark::default(); LANDMARK_COUNT];
    let digits: Vec<_> = hand.digits().collect();
    if let Some(middle) = digits.get(2) {
        points[0] = joint!(middle.metacarpal().prev_joint());
    }
    for (d, digit) in digits.iter().take(5).enumerate() {
        let base = 1 + d * 4;
        points[base]     = joint!(digit.proximal().prev_joint());
        points[base + 1] = joint!(digit.intermediate().prev_joint());
        points[base + 2] = joint!(digit.distal().prev_joint());
        points[base + 3] = joint!(digit.distal().next_joint());
    }
    LandmarkFrame::from_array(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gesture_tone::landmark::INDEX_FINGER_TIP;

    #[test]
    fn synthetic_tip_is_where_asked() {
        let f = synthetic_hand(0.3, 0.6, -0.02);
        let tip = f.point(INDEX_FINGER_TIP).unwrap();
        assert_eq!((tip.x, tip.y), (0.3, 0.6));
        assert!((f.mean_depth() - (-0.02)).abs() < 1e-6);
    }

    #[test]
    fn synthetic_wrist_below_tip() {
        let f = synthetic_hand(0.5, 0.2, 0.0);
        assert!(f.points()[0].y > f.points()[INDEX_FINGER_TIP].y);
    }

    fn sim() -> (Sender<SimInput>, SimLandmarkSource) {
        let (tx, rx) = mpsc::channel();
        (tx, SimLandmarkSource::new(rx, (-0.1, 0.05)))
    }

    #[test]
    fn pointer_becomes_frame_at_current_depth() {
        let (_tx, mut s) = sim();
        s.translate(SimInput::Depth(1.0));
        match s.translate(SimInput::Pointer { x: 0.5, y: 0.5 }) {
            Some(InputEvent::Frame(f)) => assert!((f.mean_depth() - 0.05).abs() < 1e-6),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn lost_pointer_is_no_hand() {
        let (_tx, mut s) = sim();
        assert_eq!(s.translate(SimInput::PointerLost), Some(InputEvent::NoHand));
    }

    #[test]
    fn controls_only_drops_pointer() {
        let (_tx, rx) = mpsc::channel();
        let mut s = SimLandmarkSource::controls_only(rx);
        assert_eq!(s.translate(SimInput::Pointer { x: 0.1, y: 0.1 }), None);
        assert_eq!(
            s.translate(SimInput::Command(ControlCommand::PlayAll)),
            Some(InputEvent::Control(ControlCommand::PlayAll))
        );
    }

    #[test]
    fn spawned_source_forwards_until_quit() {
        let (tx, s) = sim();
        let rx = spawn_landmark_source(s);
        tx.send(SimInput::Command(ControlCommand::ArmAudio)).unwrap();
        tx.send(SimInput::Quit).unwrap();
        assert_eq!(rx.recv().unwrap(), InputEvent::Control(ControlCommand::ArmAudio));
        assert_eq!(rx.recv().unwrap(), InputEvent::Quit);
        assert!(rx.recv().is_err());
    }
}
