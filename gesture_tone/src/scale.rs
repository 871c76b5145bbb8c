//! The fixed seven-note scale and octave arithmetic.

/// One entry of the scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub name:    &'static str,
    pub base_hz: f32,
}

/// Number of notes; also the number of vertical zones.
pub const NOTE_COUNT: usize = 7;

/// C major from C4 to B4, ordered **highest first**: index 0 is the top of
/// the vertical input range.
pub const SCALE: [Note; NOTE_COUNT] = [
    Note { name: "B", base_hz: 493.88 },
    Note { name: "A", base_hz: 440.00 },
    Note { name: "G", base_hz: 392.00 },
    Note { name: "F", base_hz: 349.23 },
    Note { name: "E", base_hz: 329.63 },
    Note { name: "D", base_hz: 293.66 },
    Note { name: "C", base_hz: 261.63 },
];

/// Octave shift limits.
pub const MIN_OCTAVE: i32 = -2;
pub const MAX_OCTAVE: i32 = 2;

/// Look up a note by index.
pub fn note(index: usize) -> Option<&'static Note> {
    SCALE.get(index)
}

/// `base_hz * 2^octave`.
pub fn frequency_with_octave(base_hz: f32, octave: i32) -> f32 {
    base_hz * 2f32.powi(octave)
}

/// Effective frequency for a scale index and octave shift.
pub fn effective_frequency(index: usize, octave: i32) -> Option<f32> {
    note(index).map(|n| frequency_with_octave(n.base_hz, octave))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_ordered_high_to_low() {
        for pair in SCALE.windows(2) {
            assert!(pair[0].base_hz > pair[1].base_hz, "{} !> {}", pair[0].name, pair[1].name);
        }
        assert_eq!(SCALE[0].name, "B");
        assert_eq!(SCALE[6].name, "C");
        assert_eq!(SCALE[6].base_hz, 261.63);
    }

    #[test]
    fn octave_shift_doubles_and_halves() {
        let f = 440.0;
        assert_eq!(frequency_with_octave(f, 0), f);
        assert_eq!(frequency_with_octave(f, 1), 2.0 * f);
        assert_eq!(frequency_with_octave(f, -1), f / 2.0);
        assert_eq!(frequency_with_octave(f, 2), 4.0 * f);
        assert_eq!(frequency_with_octave(f, -2), f / 4.0);
    }

    #[test]
    fn effective_frequency_of_f_two_octaves_up() {
        let hz = effective_frequency(3, 2).unwrap();
        assert!((hz - 1396.92).abs() < 1e-3);
    }

    #[test]
    fn out_of_range_index_has_no_frequency() {
        assert!(effective_frequency(NOTE_COUNT, 0).is_none());
    }
}
