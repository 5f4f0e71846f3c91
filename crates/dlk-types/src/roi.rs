use serde::{Deserialize, Serialize};

/// Region of interest attached to a signal or an image.
///
/// The workspace treats ROIs as opaque: it stores and returns them with the
/// object but never creates or interprets them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Roi {
    /// Free-form ROI kind as understood by the owning application
    /// (e.g. "rectangle", "circle", "segment").
    pub kind: String,
    /// Raw coordinates, meaning depends on `kind`.
    pub coords: Vec<f64>,
    pub title: Option<String>,
}

impl Roi {
    pub fn new(kind: impl Into<String>, coords: Vec<f64>) -> Self {
        Self {
            kind: kind.into(),
            coords,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
