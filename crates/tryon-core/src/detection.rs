//! Decoding of the detection service response body.
//!
//! Expected shape:
//!
//! ```json
//! {"results": {"ear_coordinates": ..., "zoom_factor": 1.0, "norm_prod_height": 1.0}}
//! ```
//!
//! `ear_coordinates` is either a flat list of `[x, y]` pairs or an object
//! with optional `left` / `right` lists.

use crate::types::{NormalizedLandmark, PixelLandmark};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

const DEFAULT_SCALE_HINT: f64 = 1.0;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to decode JSON from the API response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API response does not contain 'results' key")]
    MissingResults,
    #[error("invalid format for 'ear_coordinates' in API response: {0}")]
    InvalidCoordinates(String),
}

/// Ear landmarks in one of the two shapes the service emits.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Coordinates {
    List(Vec<NormalizedLandmark>),
    Sided {
        #[serde(default)]
        left: Option<Vec<NormalizedLandmark>>,
        #[serde(default)]
        right: Option<Vec<NormalizedLandmark>>,
    },
}

impl Default for Coordinates {
    fn default() -> Self {
        Coordinates::List(Vec::new())
    }
}

impl Coordinates {
    /// Convert to pixel space, one group per list (left before right).
    pub fn to_pixel_groups(&self, width: u32, height: u32) -> Vec<Vec<PixelLandmark>> {
        let convert = |points: &[NormalizedLandmark]| {
            points.iter().map(|p| p.to_pixel(width, height)).collect::<Vec<_>>()
        };

        match self {
            Coordinates::List(points) => vec![convert(points)],
            Coordinates::Sided { left, right } => [left, right]
                .into_iter()
                .flatten()
                .map(|points| convert(points))
                .collect(),
        }
    }

    /// Total number of landmarks across all groups.
    pub fn len(&self) -> usize {
        match self {
            Coordinates::List(points) => points.len(),
            Coordinates::Sided { left, right } => {
                left.as_ref().map_or(0, Vec::len) + right.as_ref().map_or(0, Vec::len)
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded `results` object.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResults {
    pub ear_coordinates: Coordinates,
    /// Scale hint from the service. Not consumed by compositing.
    pub zoom_factor: f64,
    /// Product-height hint from the service. Not consumed by compositing.
    pub norm_prod_height: f64,
}

/// Parse a raw response body.
///
/// Fails on malformed JSON, a missing or non-object `results`, or an
/// `ear_coordinates` value matching neither shape. Absent
/// `ear_coordinates` decodes to an empty list.
pub fn parse_response(body: &str) -> Result<DetectionResults, ParseError> {
    let value: Value = serde_json::from_str(body)?;

    let results = value
        .get("results")
        .and_then(Value::as_object)
        .ok_or(ParseError::MissingResults)?;

    let ear_coordinates = match results.get("ear_coordinates") {
        None | Some(Value::Null) => Coordinates::default(),
        Some(raw) => Coordinates::deserialize(raw)
            .map_err(|e| ParseError::InvalidCoordinates(e.to_string()))?,
    };

    let hint = |key: &str| {
        results
            .get(key)
            .and_then(Value::as_f64)
            .unwrap_or(DEFAULT_SCALE_HINT)
    };

    let parsed = DetectionResults {
        zoom_factor: hint("zoom_factor"),
        norm_prod_height: hint("norm_prod_height"),
        ear_coordinates,
    };

    tracing::debug!(
        landmarks = parsed.ear_coordinates.len(),
        zoom_factor = parsed.zoom_factor,
        norm_prod_height = parsed.norm_prod_height,
        "parsed detection response"
    );

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_shape() {
        let body = r#"{"results": {"ear_coordinates": [[0.1, 0.2], [0.3, 0.4]], "zoom_factor": 1.5, "norm_prod_height": 0.2}}"#;
        let parsed = parse_response(body).unwrap();
        assert_eq!(
            parsed.ear_coordinates,
            Coordinates::List(vec![
                NormalizedLandmark::new(0.1, 0.2),
                NormalizedLandmark::new(0.3, 0.4),
            ])
        );
        assert_eq!(parsed.zoom_factor, 1.5);
        assert_eq!(parsed.norm_prod_height, 0.2);
    }

    #[test]
    fn test_parse_sided_shape() {
        let body = r#"{"results": {"ear_coordinates": {"left": [[0.1, 0.5]], "right": [[0.9, 0.5]]}}}"#;
        let parsed = parse_response(body).unwrap();
        let groups = parsed.ear_coordinates.to_pixel_groups(100, 10);
        assert_eq!(
            groups,
            vec![
                vec![PixelLandmark { x: 10, y: 5 }],
                vec![PixelLandmark { x: 90, y: 5 }],
            ]
        );
    }

    #[test]
    fn test_parse_sided_one_side_only() {
        let body = r#"{"results": {"ear_coordinates": {"right": [[0.5, 0.5]]}}}"#;
        let parsed = parse_response(body).unwrap();
        assert_eq!(
            parsed.ear_coordinates,
            Coordinates::Sided {
                left: None,
                right: Some(vec![NormalizedLandmark::new(0.5, 0.5)]),
            }
        );
        assert_eq!(parsed.ear_coordinates.to_pixel_groups(10, 10).len(), 1);
    }

    #[test]
    fn test_parse_defaults_when_fields_absent() {
        let parsed = parse_response(r#"{"results": {}}"#).unwrap();
        assert!(parsed.ear_coordinates.is_empty());
        assert_eq!(parsed.zoom_factor, 1.0);
        assert_eq!(parsed.norm_prod_height, 1.0);
        assert_eq!(parsed.ear_coordinates.to_pixel_groups(10, 10), vec![Vec::new()]);
    }

    #[test]
    fn test_parse_malformed_json() {
        assert!(matches!(parse_response("{not json"), Err(ParseError::Json(_))));
        assert!(matches!(parse_response(""), Err(ParseError::Json(_))));
    }

    #[test]
    fn test_parse_missing_results() {
        assert!(matches!(
            parse_response(r#"{"error": "unauthorized"}"#),
            Err(ParseError::MissingResults)
        ));
        assert!(matches!(
            parse_response(r#"{"results": [1, 2]}"#),
            Err(ParseError::MissingResults)
        ));
        assert!(matches!(parse_response("[]"), Err(ParseError::MissingResults)));
    }

    #[test]
    fn test_parse_invalid_coordinates() {
        for coords in [r#""abc""#, "42", "[[0.1, 0.2, 0.3]]", "[[0.1]]", r#"{"left": "x"}"#] {
            let body = format!(r#"{{"results": {{"ear_coordinates": {coords}}}}}"#);
            assert!(
                matches!(parse_response(&body), Err(ParseError::InvalidCoordinates(_))),
                "expected invalid coordinates for {coords}"
            );
        }
    }

    #[test]
    fn test_parse_non_numeric_hint_falls_back() {
        let parsed =
            parse_response(r#"{"results": {"ear_coordinates": [], "zoom_factor": "big"}}"#).unwrap();
        assert_eq!(parsed.zoom_factor, 1.0);
    }
}
