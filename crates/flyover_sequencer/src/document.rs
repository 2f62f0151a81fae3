// SPDX-License-Identifier: MIT OR Apache-2.0
//! Project document: the JSON shape a camera path is saved and loaded as.

use crate::easing::{CubicBezier, Easing};
use crate::keyframe::{CameraPose, Keyframe, DEFAULT_FOV};
use crate::playback::validate_fps;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while reading a project document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Not valid JSON or missing required fields
    #[error("malformed project document: {0}")]
    Json(#[from] serde_json::Error),

    /// Parsed but semantically invalid
    #[error("invalid project document: {field}: {reason}")]
    Invalid {
        /// Offending field, e.g. `keyframes[3].time`
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type for document operations
pub type Result<T> = std::result::Result<T, DocumentError>;

/// One keyframe as stored in a project file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyframeRecord {
    /// Seconds
    pub time: f64,
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Meters
    pub height: f64,
    /// Degrees
    pub heading: f64,
    /// Degrees
    pub pitch: f64,
    /// Degrees
    pub roll: f64,
    /// Degrees
    #[serde(default = "default_fov")]
    pub fov: f64,
    /// Easing name
    #[serde(default = "default_interpolation")]
    pub interpolation_type: String,
    /// Control points for `bezier` easing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bezier: Option<[f64; 4]>,
}

fn default_fov() -> f64 {
    DEFAULT_FOV
}

fn default_interpolation() -> String {
    Easing::Linear.name().to_owned()
}

impl From<&Keyframe> for KeyframeRecord {
    fn from(keyframe: &Keyframe) -> Self {
        let pose = &keyframe.pose;
        let bezier = match keyframe.easing {
            Easing::Bezier(curve) => Some(curve.to_array()),
            _ => None,
        };
        Self {
            time: keyframe.time,
            latitude: pose.latitude,
            longitude: pose.longitude,
            height: pose.height,
            heading: pose.heading,
            pitch: pose.pitch,
            roll: pose.roll,
            fov: pose.fov,
            interpolation_type: keyframe.easing.name().to_owned(),
            bezier,
        }
    }
}

impl KeyframeRecord {
    /// Validate and convert into a timeline keyframe
    pub fn to_keyframe(&self, index: usize) -> Result<Keyframe> {
        let field = |name: &str| format!("keyframes[{index}].{name}");

        let numbers = [
            ("time", self.time),
            ("latitude", self.latitude),
            ("longitude", self.longitude),
            ("height", self.height),
            ("heading", self.heading),
            ("pitch", self.pitch),
            ("roll", self.roll),
            ("fov", self.fov),
        ];
        for (name, value) in numbers {
            if !value.is_finite() {
                return Err(invalid(field(name), "must be a finite number"));
            }
        }
        if self.time < 0.0 {
            return Err(invalid(field("time"), "must not be negative"));
        }

        let mut easing = Easing::from_name(&self.interpolation_type).ok_or_else(|| {
            invalid(
                field("interpolationType"),
                format!("unknown easing '{}'", self.interpolation_type),
            )
        })?;
        if let (Easing::Bezier(_), Some(points)) = (easing, self.bezier) {
            if points.iter().any(|p| !p.is_finite()) {
                return Err(invalid(field("bezier"), "control points must be finite"));
            }
            easing = Easing::Bezier(CubicBezier::from(points));
        }

        let pose = CameraPose {
            latitude: self.latitude,
            longitude: self.longitude,
            height: self.height,
            heading: self.heading,
            pitch: self.pitch,
            roll: self.roll,
            fov: self.fov,
        };
        Ok(Keyframe::new(self.time, pose).with_easing(easing))
    }
}

/// Saved project: clip settings plus the camera path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDocument {
    /// Clip length in seconds
    pub duration: f64,
    /// Frames per second
    pub fps: f64,
    /// Keyframes in time order
    pub keyframes: Vec<KeyframeRecord>,
}

impl ProjectDocument {
    /// Capture the current path and clip settings
    pub fn from_keyframes<'a>(
        duration: f64,
        fps: f64,
        keyframes: impl IntoIterator<Item = &'a Keyframe>,
    ) -> Self {
        Self {
            duration,
            fps,
            keyframes: keyframes.into_iter().map(KeyframeRecord::from).collect(),
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Self = serde_json::from_str(json)?;
        document.validate()?;
        Ok(document)
    }

    /// Serialize as pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check clip settings and every keyframe
    pub fn validate(&self) -> Result<()> {
        if !(self.duration.is_finite() && self.duration > 0.0) {
            return Err(invalid("duration", "must be a positive number"));
        }
        if validate_fps(self.fps).is_err() {
            return Err(invalid(
                "fps",
                "must be a positive number with a representable frame interval",
            ));
        }
        for (index, record) in self.keyframes.iter().enumerate() {
            record.to_keyframe(index)?;
        }
        Ok(())
    }

    /// Convert every record into a keyframe.
    ///
    /// Fails on the first invalid record; nothing is returned partially.
    pub fn to_keyframes(&self) -> Result<Vec<Keyframe>> {
        self.keyframes
            .iter()
            .enumerate()
            .map(|(index, record)| record.to_keyframe(index))
            .collect()
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> DocumentError {
    DocumentError::Invalid {
        field: field.into(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::Timeline;

    fn sample_timeline() -> Timeline {
        Timeline::from_keyframes([
            Keyframe::new(
                0.0,
                CameraPose::at(40.7, -74.0, 5000.0).with_orientation(10.0, -35.0, 0.0),
            ),
            Keyframe::new(4.5, CameraPose::at(41.0, -73.5, 2500.0).with_fov(45.0))
                .with_easing(Easing::EaseInOut),
            Keyframe::new(
                9.0,
                CameraPose::at(41.2, -73.1, 900.0).with_orientation(-170.0, -20.0, 3.0),
            )
            .with_easing(Easing::Bezier(CubicBezier::new(0.1, 0.7, 0.3, 1.0))),
        ])
    }

    fn strip_ids(keyframes: &[Keyframe]) -> Vec<(f64, CameraPose, Easing)> {
        keyframes.iter().map(|k| (k.time, k.pose, k.easing)).collect()
    }

    #[test]
    fn test_round_trip_reproduces_keyframes() {
        let timeline = sample_timeline();
        let document = ProjectDocument::from_keyframes(12.0, 30.0, timeline.keyframes());
        let json = document.to_json().unwrap();

        let parsed = ProjectDocument::from_json(&json).unwrap();
        assert_eq!(parsed, document);
        let restored = parsed.to_keyframes().unwrap();
        assert_eq!(strip_ids(&restored), strip_ids(timeline.keyframes()));
    }

    #[test]
    fn test_document_field_names() {
        let json = r#"{
            "duration": 5,
            "fps": 24,
            "keyframes": [
                {"time": 0, "latitude": 1, "longitude": 2, "height": 3,
                 "heading": 4, "pitch": 5, "roll": 6, "fov": 70,
                 "interpolationType": "easeOut"}
            ]
        }"#;
        let document = ProjectDocument::from_json(json).unwrap();
        let keyframes = document.to_keyframes().unwrap();
        assert_eq!(keyframes[0].easing, Easing::EaseOut);
        assert_eq!(keyframes[0].pose.fov, 70.0);

        let value: serde_json::Value = serde_json::from_str(&document.to_json().unwrap()).unwrap();
        assert_eq!(value["keyframes"][0]["interpolationType"], "easeOut");
        assert!(value["keyframes"][0].get("bezier").is_none());
    }

    #[test]
    fn test_missing_fov_and_easing_use_defaults() {
        let json = r#"{"duration": 1, "fps": 10, "keyframes": [
            {"time": 0, "latitude": 0, "longitude": 0, "height": 0,
             "heading": 0, "pitch": 0, "roll": 0}
        ]}"#;
        let keyframes = ProjectDocument::from_json(json).unwrap().to_keyframes().unwrap();
        assert_eq!(keyframes[0].pose.fov, DEFAULT_FOV);
        assert_eq!(keyframes[0].easing, Easing::Linear);
    }

    #[test]
    fn test_bezier_without_points_uses_ease() {
        let record = KeyframeRecord {
            time: 0.0,
            latitude: 0.0,
            longitude: 0.0,
            height: 0.0,
            heading: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fov: 60.0,
            interpolation_type: "bezier".into(),
            bezier: None,
        };
        let keyframe = record.to_keyframe(0).unwrap();
        assert_eq!(keyframe.easing, Easing::Bezier(CubicBezier::EASE));
    }

    #[test]
    fn test_rejects_invalid_documents() {
        assert!(matches!(
            ProjectDocument::from_json("{ not json"),
            Err(DocumentError::Json(_))
        ));

        let zero_fps = r#"{"duration": 1, "fps": 0, "keyframes": []}"#;
        assert!(matches!(
            ProjectDocument::from_json(zero_fps),
            Err(DocumentError::Invalid { ref field, .. }) if field == "fps"
        ));

        let tiny_fps = r#"{"duration": 1, "fps": 1e-300, "keyframes": []}"#;
        assert!(matches!(
            ProjectDocument::from_json(tiny_fps),
            Err(DocumentError::Invalid { ref field, .. }) if field == "fps"
        ));

        let bad_easing = r#"{"duration": 1, "fps": 10, "keyframes": [
            {"time": 0, "latitude": 0, "longitude": 0, "height": 0, "heading": 0,
             "pitch": 0, "roll": 0, "interpolationType": "bounce"}
        ]}"#;
        assert!(matches!(
            ProjectDocument::from_json(bad_easing),
            Err(DocumentError::Invalid { ref field, .. })
                if field == "keyframes[0].interpolationType"
        ));

        let negative_time = r#"{"duration": 1, "fps": 10, "keyframes": [
            {"time": -1, "latitude": 0, "longitude": 0, "height": 0,
             "heading": 0, "pitch": 0, "roll": 0}
        ]}"#;
        assert!(ProjectDocument::from_json(negative_time).is_err());
    }
}
