//! End-to-end scenarios through the public engine API.

use gesture_tone::landmark::{INDEX_FINGER_TIP, LANDMARK_COUNT};
use gesture_tone::{
    Engine, EngineConfig, FrameInput, Landmark, LandmarkFrame, PlaybackState, PlaybackToggle, ToneSink, Viewport,
};

const VP: Viewport = Viewport { width: 700.0, height: 700.0 };

/// Sink call, as seen by [`Tape`].
#[derive(Debug, Clone, Copy, PartialEq)]
enum Call {
    Attack(f32),
    Retarget(f32),
    Release,
    Volume(f32),
}

/// Records everything the engine sends.
#[derive(Debug, Default)]
struct Tape {
    calls: Vec<Call>,
}

impl Tape {
    fn note_calls(&self) -> Vec<Call> {
        self.calls.iter().copied().filter(|c| !matches!(c, Call::Volume(_))).collect()
    }
}

impl ToneSink for Tape {
    fn attack(&mut self, hz: f32)      { self.calls.push(Call::Attack(hz)); }
    fn retarget(&mut self, hz: f32)    { self.calls.push(Call::Retarget(hz)); }
    fn release(&mut self)              { self.calls.push(Call::Release); }
    fn set_volume(&mut self, pct: f32) { self.calls.push(Call::Volume(pct)); }
}

fn hand(tx: f32, ty: f32, z: f32) -> FrameInput {
    let mut pts = [Landmark::new(0.5, 0.8, z); LANDMARK_COUNT];
    pts[INDEX_FINGER_TIP] = Landmark::new(tx, ty, z);
    FrameInput::Hand(LandmarkFrame::from_array(pts))
}

fn zone_y(zone: usize) -> f32 { (zone as f32 + 0.5) / 7.0 }

fn engine() -> Engine<Tape> { Engine::new(EngineConfig::default(), Tape::default()).unwrap() }

/// Record a short melody: B, E, C with 300 ms and 450 ms gaps.
fn record_melody(e: &mut Engine<Tape>) {
    e.start_recording(10_000.0);
    e.process_frame(&hand(0.5, zone_y(0), -0.025), VP, 10_000.0);
    e.process_frame(&hand(0.5, zone_y(4), -0.025), VP, 10_300.0);
    e.process_frame(&hand(0.5, zone_y(6), -0.025), VP, 10_750.0);
    e.stop_recording();
    e.process_frame(&FrameInput::NoHand, VP, 11_000.0);
}

/// Tick every millisecond from `start` until idle; return every note call
/// with its offset from `start`.
fn replay(e: &mut Engine<Tape>, start: f64) -> Vec<(f64, Call)> {
    let mut seen = e.sink().note_calls().len();
    let mut timeline = Vec::new();
    e.play_all(start).unwrap();
    let mut t = start;
    loop {
        let calls = e.sink().note_calls();
        for call in &calls[seen..] {
            timeline.push((t - start, *call));
        }
        seen = calls.len();
        if !e.is_playing_back() {
            break;
        }
        t += 1.0;
        e.tick(t);
    }
    timeline
}

// ── gesture → frequency ──────────────────────────────────────────────────
#[test]
fn zone_three_at_max_depth_plays_f_two_octaves_up() {
    let mut e = engine();
    let max_z = EngineConfig::default().octave.max_z;
    let snap = e.process_frame(&hand(0.5, zone_y(3), max_z), VP, 0.0);

    assert_eq!(snap.note_name, Some("F"));
    assert_eq!(snap.octave_shift, 2);
    let hz = snap.frequency_hz.unwrap();
    assert!((hz - 1396.92).abs() < 0.01, "{hz}");
    // Horizontal centre: multiplier 1.0, so volume equals the base.
    assert_eq!(snap.volume_percent, EngineConfig::default().volume.base_percent);
    match snap.state {
        PlaybackState::Sounding { frequency_hz } => assert!((frequency_hz - 1396.92).abs() < 0.01),
        PlaybackState::Silent => panic!("expected a sounding note"),
    }
}

#[test]
fn depth_change_retargets_without_reattack() {
    let mut e = engine();
    e.process_frame(&hand(0.5, zone_y(1), -0.025), VP, 0.0);
    e.process_frame(&hand(0.5, zone_y(1), -0.1), VP, 33.0);
    let calls = e.sink().note_calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], Call::Attack(440.0));
    assert_eq!(calls[1], Call::Retarget(110.0));
}

// ── recording ────────────────────────────────────────────────────────────
#[test]
fn recording_round_trip() {
    let mut e = engine();
    record_melody(&mut e);
    let names: Vec<&str> = e.events().iter().map(|ev| ev.note_name()).collect();
    assert_eq!(names, vec!["B", "E", "C"]);
    let ts: Vec<f64> = e.events().iter().map(|ev| ev.timestamp_ms).collect();
    assert_eq!(ts, vec![0.0, 300.0, 750.0]);

    e.clear_recording().unwrap();
    assert!(e.events().is_empty());

    record_melody(&mut e);
    e.start_recording(20_000.0);
    e.process_frame(&hand(0.5, zone_y(2), -0.025), VP, 20_100.0);
    assert_eq!(e.events().len(), 1);
    assert_eq!(e.events()[0].timestamp_ms, 100.0);
}

// ── playback ─────────────────────────────────────────────────────────────
#[test]
fn playback_is_deterministic_across_start_times() {
    let mut e = engine();
    record_melody(&mut e);
    let first = replay(&mut e, 50_000.0);
    let second = replay(&mut e, 123_456.0);
    assert_eq!(first, second);
    assert_eq!(first, vec![
        (0.0,    Call::Attack(493.88)),
        (300.0,  Call::Retarget(329.63)),
        (750.0,  Call::Retarget(261.63)),
        (1250.0, Call::Release),
    ]);
}

#[test]
fn playback_of_selection_skips_unselected_events() {
    let mut e = engine();
    record_melody(&mut e);
    e.set_selection(&[0, 2]).unwrap();
    let mut t = 60_000.0;
    assert_eq!(e.play_selected(t).unwrap(), PlaybackToggle::Started { events: 2 });
    while e.tick(t) {
        t += 1.0;
    }
    let tail: Vec<Call> = e.sink().note_calls().into_iter().rev().take(3).rev().collect();
    assert_eq!(tail, vec![Call::Attack(493.88), Call::Retarget(261.63), Call::Release]);
}

#[test]
fn stop_mid_run_leaves_silence_and_no_further_calls() {
    let mut e = engine();
    record_melody(&mut e);
    e.play_all(0.0).unwrap();
    e.tick(400.0);
    assert!(e.state().is_sounding());

    assert!(e.stop_playback());
    assert_eq!(e.state(), PlaybackState::Silent);
    let n = e.sink().calls.len();
    for t in (400..5_000).step_by(10) {
        e.tick(t as f64);
    }
    assert_eq!(e.sink().calls.len(), n);
    assert!(!e.stop_playback());
}
