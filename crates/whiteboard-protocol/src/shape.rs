//! Shape data model
//!
//! A [`ShapeData`] is the authoritative state of one vector object on a
//! board. It is keyed by `id` within a room's shape index (see
//! `whiteboard_server::room`) and is what gets persisted by the board save
//! API and reproduced for late joiners via the replay log.

use serde::{Deserialize, Serialize};

/// Tagged union over the shape kinds the client can draw.
///
/// Mirrors the teacher's `#[serde(tag = "type")]` tagged-enum convention
/// (see `tallow_protocol::wire::Message`), here tagged on `shapeType` to
/// match the wire field name the spec's `shapeAdded` envelope uses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "shapeType", rename_all = "UPPERCASE")]
pub enum ShapeData {
    Rectangle(Geometry),
    Circle(Geometry),
    Line(LineShape),
    Triangle(Geometry),
    Text(TextShape),
    Image(ImageShape),
}

impl ShapeData {
    /// The shape's unique id within its room
    pub fn id(&self) -> &str {
        match self {
            ShapeData::Rectangle(g) | ShapeData::Circle(g) | ShapeData::Triangle(g) => &g.common.id,
            ShapeData::Line(l) => &l.common.id,
            ShapeData::Text(t) => &t.common.id,
            ShapeData::Image(i) => &i.common.id,
        }
    }
}

/// Fields every shape kind carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommonShapeFields {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub size: f64,
    pub username: String,
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<String>,
}

/// Rectangle / circle / triangle geometry: a bounding box anchored at
/// `(x, y)`. Circles may alternatively carry `radius` instead of
/// `width`/`height`; both are accepted on decode.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Geometry {
    #[serde(flatten)]
    pub common: CommonShapeFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

/// A straight line from the common `(x, y)` origin to `(endX, endY)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineShape {
    #[serde(flatten)]
    pub common: CommonShapeFields,
    #[serde(rename = "endX")]
    pub end_x: f64,
    #[serde(rename = "endY")]
    pub end_y: f64,
}

/// A text label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextShape {
    #[serde(flatten)]
    pub common: CommonShapeFields,
    pub text: String,
    #[serde(rename = "fontSize")]
    pub font_size: f64,
}

/// An uploaded image, placed by the image upload port or drawn directly by
/// a client that already knows a URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageShape {
    #[serde(flatten)]
    pub common: CommonShapeFields,
    pub url: String,
    pub width: f64,
    pub height: f64,
}

/// A freehand stroke delta. Not indexed by id — strokes only ever live in a
/// room's replay log, never in the shape index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrokeDelta {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: String,
    pub size: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_round_trips_through_json() {
        let shape = ShapeData::Rectangle(Geometry {
            common: CommonShapeFields {
                id: "s1".into(),
                x: 10.0,
                y: 20.0,
                color: "#ff0000".into(),
                size: 2.0,
                username: "alice".into(),
                timestamp: 1000,
                fill_color: None,
            },
            width: Some(100.0),
            height: Some(50.0),
            radius: None,
        });

        let json = serde_json::to_string(&shape).unwrap();
        assert!(json.contains("\"shapeType\":\"RECTANGLE\""));
        let back: ShapeData = serde_json::from_str(&json).unwrap();
        assert_eq!(shape, back);
        assert_eq!(back.id(), "s1");
    }

    #[test]
    fn image_requires_url() {
        let json = r#"{"shapeType":"IMAGE","id":"i1","x":0,"y":0,"color":"#000","size":1,
            "username":"bob","timestamp":1,"url":"http://x/y.png","width":50,"height":40}"#;
        let shape: ShapeData = serde_json::from_str(json).unwrap();
        match shape {
            ShapeData::Image(img) => assert_eq!(img.url, "http://x/y.png"),
            _ => panic!("expected image"),
        }
    }
}
