//! Landmark frames and the preprocessor that turns them into a pointer.
//!
//! A detector reports 21 points per hand in normalised image coordinates
//! (x, y roughly in [0,1], z a relative depth where more negative means
//! closer to the camera).  The preprocessor keeps exactly two things from a
//! frame: the pointer landmark scaled into pixel space, and the mean depth
//! of *all* landmarks.

use crate::config::PointerConfig;
use crate::error::{Result, ToneError};

/// Points per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Index of the wrist landmark.
pub const WRIST: usize = 0;

/// Index of the index-finger tip; the default pointer.
pub const INDEX_FINGER_TIP: usize = 8;

// ════════════════════════════════════════════════════════════════════════════
// Landmark / LandmarkFrame
// ════════════════════════════════════════════════════════════════════════════

/// One tracked hand joint.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Exactly [`LANDMARK_COUNT`] points describing one hand.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    points: [Landmark; LANDMARK_COUNT],
}

impl LandmarkFrame {
    /// Build a frame from detector output; anything but 21 points is rejected.
    pub fn new(points: &[Landmark]) -> Result<Self> {
        let points: [Landmark; LANDMARK_COUNT] = points.try_into().map_err(|_| {
            ToneError::MalformedFrame { got: points.len(), expected: LANDMARK_COUNT }
        })?;
        Ok(Self { points })
    }

    pub fn from_array(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] { &self.points }

    pub fn point(&self, index: usize) -> Option<&Landmark> { self.points.get(index) }

    /// Arithmetic mean of z over every landmark.
    pub fn mean_depth(&self) -> f32 {
        self.points.iter().map(|p| p.z).sum::<f32>() / LANDMARK_COUNT as f32
    }
}

/// What the landmark source delivers once per processing tick.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameInput {
    Hand(LandmarkFrame),
    NoHand,
}

/// Size of the image the landmarks were detected in, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width:  f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// PointerSample + preprocess
// ════════════════════════════════════════════════════════════════════════════

/// Pointer position in pixels plus the frame-wide mean depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x:     f32,
    pub y:     f32,
    pub depth: f32,
}

/// Extract the pointer sample from one input.  `None` when no hand was
/// reported, or when `cfg.landmark` is past the frame (which
/// [`EngineConfig::validate`](crate::config::EngineConfig::validate) rejects).
pub fn preprocess(input: &FrameInput, viewport: Viewport, cfg: &PointerConfig) -> Option<PointerSample> {
    let frame = match input {
        FrameInput::Hand(frame) => frame,
        FrameInput::NoHand      => return None,
    };
    let tip = *frame.point(cfg.landmark)?;
    let nx = if cfg.mirror_x { 1.0 - tip.x } else { tip.x };
    Some(PointerSample {
        x:     nx * viewport.width,
        y:     tip.y * viewport.height,
        depth: frame.mean_depth(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A flat hand with every landmark at `(x, y, z)`, the tip at `(tx, ty)`.
    pub(crate) fn hand_at(tx: f32, ty: f32, z: f32) -> LandmarkFrame {
        let mut pts = [Landmark::new(0.5, 0.8, z); LANDMARK_COUNT];
        pts[INDEX_FINGER_TIP] = Landmark::new(tx, ty, z);
        LandmarkFrame::from_array(pts)
    }

    #[test]
    fn frame_rejects_wrong_point_count() {
        let pts = vec![Landmark::default(); 20];
        let err = LandmarkFrame::new(&pts).unwrap_err();
        assert!(matches!(err, ToneError::MalformedFrame { got: 20, expected: 21 }));
    }

    #[test]
    fn frame_accepts_21_points() {
        let pts = vec![Landmark::default(); 21];
        assert!(LandmarkFrame::new(&pts).is_ok());
    }

    #[test]
    fn no_hand_yields_none() {
        let out = preprocess(&FrameInput::NoHand, Viewport::new(640.0, 480.0), &PointerConfig::default());
        assert!(out.is_none());
    }

    #[test]
    fn tip_scaled_to_pixels() {
        let input = FrameInput::Hand(hand_at(0.25, 0.5, 0.0));
        let s = preprocess(&input, Viewport::new(640.0, 480.0), &PointerConfig::default()).unwrap();
        assert_eq!(s.x, 160.0);
        assert_eq!(s.y, 240.0);
    }

    #[test]
    fn depth_is_mean_of_all_landmarks() {
        let mut pts = [Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        // Only the tip is far forward; the mean must be diluted by the rest.
        pts[INDEX_FINGER_TIP].z = -0.21;
        let input = FrameInput::Hand(LandmarkFrame::from_array(pts));
        let s = preprocess(&input, Viewport::new(100.0, 100.0), &PointerConfig::default()).unwrap();
        assert!((s.depth - (-0.01)).abs() < 1e-6);
    }

    #[test]
    fn mirror_flips_x() {
        let cfg = PointerConfig { mirror_x: true, ..PointerConfig::default() };
        let input = FrameInput::Hand(hand_at(0.25, 0.5, 0.0));
        let s = preprocess(&input, Viewport::new(400.0, 400.0), &cfg).unwrap();
        assert_eq!(s.x, 300.0);
    }

    #[test]
    fn custom_pointer_landmark() {
        let cfg = PointerConfig { landmark: WRIST, ..PointerConfig::default() };
        let input = FrameInput::Hand(hand_at(0.1, 0.1, 0.0));
        let s = preprocess(&input, Viewport::new(100.0, 100.0), &cfg).unwrap();
        assert_eq!(s.x, 50.0);
        assert_eq!(s.y, 80.0);
    }

    #[test]
    fn pointer_landmark_past_frame_yields_none() {
        let cfg = PointerConfig { landmark: LANDMARK_COUNT, ..PointerConfig::default() };
        let input = FrameInput::Hand(hand_at(0.1, 0.1, 0.0));
        assert_eq!(preprocess(&input, Viewport::new(100.0, 100.0), &cfg), None);
    }
}
