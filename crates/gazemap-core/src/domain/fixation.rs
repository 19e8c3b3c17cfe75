//! Gaze fixation records from eye-tracking sessions.

use serde::{Deserialize, Serialize};

/// Number of independent gaze-tracking sessions recorded per image.
pub const SESSIONS_PER_IMAGE: usize = 5;

/// A single gaze coordinate, normalized to the unit square.
///
/// `x` grows rightward, `y` downward. Values are only meaningful inside
/// `[0, 1)`; the tracker emits out-of-range values when the subject looked
/// off-screen. Serialized as an `[x, y]` pair, matching the corpus format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct GazePoint {
    /// Horizontal coordinate in `[0, 1)`.
    pub x: f32,
    /// Vertical coordinate in `[0, 1)`.
    pub y: f32,
}

impl From<(f32, f32)> for GazePoint {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<GazePoint> for (f32, f32) {
    fn from(p: GazePoint) -> Self {
        (p.x, p.y)
    }
}

impl GazePoint {
    /// Creates a new gaze point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns true if both coordinates are strictly inside `(0, 1)`.
    #[must_use]
    pub fn in_bounds(&self) -> bool {
        self.x > 0.0 && self.x < 1.0 && self.y > 0.0 && self.y < 1.0
    }
}

/// Which eye's stream is authoritative for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum DominantEye {
    /// Left-eye stream is authoritative.
    Left,
    /// Right-eye stream is authoritative.
    Right,
}

impl TryFrom<u8> for DominantEye {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Left),
            1 => Ok(Self::Right),
            other => Err(format!("dominant_eye must be 0 or 1, got {other}")),
        }
    }
}

impl From<DominantEye> for u8 {
    fn from(eye: DominantEye) -> Self {
        match eye {
            DominantEye::Left => 0,
            DominantEye::Right => 1,
        }
    }
}

/// One eye-tracking session for one image.
///
/// Each stream is an ordered sequence of samples; `None` entries mark frames
/// where tracking dropped out. Only the dominant-eye stream is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GazeRecord {
    /// Which eye stream is authoritative.
    pub dominant_eye: DominantEye,
    /// Left-eye samples, `null` where tracking dropped.
    pub left_eye: Vec<Option<GazePoint>>,
    /// Right-eye samples, `null` where tracking dropped.
    pub right_eye: Vec<Option<GazePoint>>,
}

impl GazeRecord {
    /// Returns the dominant-eye stream.
    #[must_use]
    pub fn dominant_stream(&self) -> &[Option<GazePoint>] {
        match self.dominant_eye {
            DominantEye::Left => &self.left_eye,
            DominantEye::Right => &self.right_eye,
        }
    }
}

/// Concatenates the dominant-eye streams of several sessions, in session
/// order, preserving sample order (including dropped-tracking gaps).
#[must_use]
pub fn merge_sessions(records: &[GazeRecord]) -> Vec<Option<GazePoint>> {
    records
        .iter()
        .flat_map(|r| r.dominant_stream().iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_bounds() {
        assert!(GazePoint::new(0.5, 0.5).in_bounds());
        assert!(!GazePoint::new(0.0, 0.5).in_bounds());
        assert!(!GazePoint::new(0.5, 1.0).in_bounds());
        assert!(!GazePoint::new(-0.1, 0.5).in_bounds());
        assert!(!GazePoint::new(1.3, 0.5).in_bounds());
    }

    #[test]
    fn test_dominant_eye_roundtrip() {
        assert_eq!(DominantEye::try_from(0u8), Ok(DominantEye::Left));
        assert_eq!(DominantEye::try_from(1u8), Ok(DominantEye::Right));
        assert!(DominantEye::try_from(2u8).is_err());
        assert_eq!(u8::from(DominantEye::Right), 1);
    }

    #[test]
    fn test_dominant_stream_selection() {
        let record = GazeRecord {
            dominant_eye: DominantEye::Right,
            left_eye: vec![Some(GazePoint::new(0.1, 0.1))],
            right_eye: vec![Some(GazePoint::new(0.9, 0.9)), None],
        };
        assert_eq!(record.dominant_stream().len(), 2);
        assert_eq!(
            record.dominant_stream()[0],
            Some(GazePoint::new(0.9, 0.9))
        );
    }

    #[test]
    fn test_merge_preserves_session_order() {
        let a = GazeRecord {
            dominant_eye: DominantEye::Left,
            left_eye: vec![Some(GazePoint::new(0.1, 0.1)), None],
            right_eye: vec![],
        };
        let b = GazeRecord {
            dominant_eye: DominantEye::Left,
            left_eye: vec![Some(GazePoint::new(0.2, 0.2))],
            right_eye: vec![],
        };
        let merged = merge_sessions(&[a, b]);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0], Some(GazePoint::new(0.1, 0.1)));
        assert_eq!(merged[1], None);
        assert_eq!(merged[2], Some(GazePoint::new(0.2, 0.2)));
    }

    #[test]
    fn test_gaze_record_corpus_json() {
        let json = r#"{
            "dominant_eye": 1,
            "left_eye": [[0.1, 0.2], null],
            "right_eye": [[0.3, 0.4]]
        }"#;
        let record: GazeRecord = serde_json::from_str(json).expect("deserialize corpus record");
        assert_eq!(record.dominant_eye, DominantEye::Right);
        assert_eq!(record.left_eye.len(), 2);
        assert_eq!(record.left_eye[1], None);
        assert_eq!(record.dominant_stream(), &[Some(GazePoint::new(0.3, 0.4))]);
    }
}
