//! Geometry elements for the model description

use crate::config::{format_float, Geometry};
use crate::template::Element;

impl Geometry {
    /// Link pose: boxes are lifted by half their thickness to rest on the ground
    pub fn link_pose(self, thickness: f64) -> String {
        let z = match self {
            Geometry::Box => thickness / 2.0,
            Geometry::Plane => 0.0,
        };
        format!("0.0 0.0 {} 0.0 0.0 0.0", format_float(z))
    }

    /// The `<box>` or `<plane>` element for a square marker of `size`
    pub fn element(self, size: f64, thickness: f64) -> Element {
        match self {
            Geometry::Box => box_geometry(size, size, thickness),
            Geometry::Plane => plane_geometry(size, size),
        }
    }
}

fn box_geometry(width: f64, length: f64, height: f64) -> Element {
    Element::new("box").with_child(Element::new("size").with_text(format!(
        "{} {} {}",
        format_float(width),
        format_float(length),
        format_float(height)
    )))
}

fn plane_geometry(width: f64, length: f64) -> Element {
    Element::new("plane")
        .with_child(Element::new("normal").with_text("0 0 1"))
        .with_child(
            Element::new("size").with_text(format!(
                "{} {}",
                format_float(width),
                format_float(length)
            )),
        )
}
