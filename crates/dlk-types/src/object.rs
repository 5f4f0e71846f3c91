use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::image::Image;
use crate::roi::Roi;
use crate::signal::Signal;

/// Kind tag of a workspace object.
///
/// The kind also fixes the panel an object lives in on a remote peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Signal,
    Image,
}

impl ObjectKind {
    /// Both kinds, in panel probing order.
    pub const ALL: [ObjectKind; 2] = [ObjectKind::Signal, ObjectKind::Image];

    /// Panel name on a remote peer.
    pub fn panel_name(&self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Image => "image",
        }
    }

    /// Type tag written to persisted workspace files.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Signal => "SignalObj",
            Self::Image => "ImageObj",
        }
    }

    /// Inverse of [`ObjectKind::type_tag`].
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        match tag {
            "SignalObj" => Some(Self::Signal),
            "ImageObj" => Some(Self::Image),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.panel_name())
    }
}

impl FromStr for ObjectKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "signal" => Ok(Self::Signal),
            "image" => Ok(Self::Image),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

/// A workspace object value: either a signal or an image.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum DataObject {
    Signal(Signal),
    Image(Image),
}

impl DataObject {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Signal(_) => ObjectKind::Signal,
            Self::Image(_) => ObjectKind::Image,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Signal(s) => &s.title,
            Self::Image(i) => &i.title,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        match self {
            Self::Signal(s) => s.title = title,
            Self::Image(i) => i.title = title,
        }
    }

    /// Consume and return the object with a new title.
    pub fn retitled(mut self, title: impl Into<String>) -> Self {
        self.set_title(title);
        self
    }

    pub fn rois(&self) -> &[Roi] {
        match self {
            Self::Signal(s) => &s.rois,
            Self::Image(i) => &i.rois,
        }
    }

    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            Self::Signal(s) => Some(s),
            Self::Image(_) => None,
        }
    }

    pub fn as_image(&self) -> Option<&Image> {
        match self {
            Self::Image(i) => Some(i),
            Self::Signal(_) => None,
        }
    }

    /// Short human-readable description, e.g. `signal[100]` or `image[64x48]`.
    pub fn describe(&self) -> String {
        match self {
            Self::Signal(s) => format!("signal[{}]", s.len()),
            Self::Image(i) => {
                let (rows, cols) = i.shape();
                format!("image[{rows}x{cols}]")
            }
        }
    }
}

impl From<Signal> for DataObject {
    fn from(signal: Signal) -> Self {
        Self::Signal(signal)
    }
}

impl From<Image> for DataObject {
    fn from(image: Image) -> Self {
        Self::Image(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;

    fn signal() -> DataObject {
        Signal::new("s1", vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.0])
            .unwrap()
            .into()
    }

    fn image() -> DataObject {
        Image::new("i1", Grid::filled(4, 3, 0.5)).into()
    }

    #[test]
    fn kind_and_panel() {
        assert_eq!(signal().kind(), ObjectKind::Signal);
        assert_eq!(image().kind().panel_name(), "image");
    }

    #[test]
    fn type_tags() {
        for kind in ObjectKind::ALL {
            assert_eq!(ObjectKind::from_type_tag(kind.type_tag()), Some(kind));
        }
        assert_eq!(ObjectKind::from_type_tag("CurveObj"), None);
    }

    #[test]
    fn parse_kind() {
        assert_eq!("Signal".parse::<ObjectKind>().unwrap(), ObjectKind::Signal);
        assert_eq!("image".parse::<ObjectKind>().unwrap(), ObjectKind::Image);
        assert!(matches!("curve".parse::<ObjectKind>(), Err(TypeError::UnknownKind(_))));
    }

    #[test]
    fn retitle() {
        let obj = signal().retitled("renamed");
        assert_eq!(obj.title(), "renamed");
        assert_eq!(obj.as_signal().unwrap().y(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn describe() {
        assert_eq!(signal().describe(), "signal[3]");
        assert_eq!(image().describe(), "image[4x3]");
    }

    #[test]
    fn rois_are_carried() {
        let mut s = Signal::new("s", vec![0.0, 1.0], vec![1.0, 2.0]).unwrap();
        s.rois.push(Roi::new("segment", vec![0.0, 1.0]).with_title("peak"));
        let obj = DataObject::from(s);
        assert_eq!(obj.rois().len(), 1);
        assert_eq!(obj.rois()[0].title.as_deref(), Some("peak"));
    }

    #[test]
    fn serde_roundtrip() {
        let obj = image();
        let json = serde_json::to_string(&obj).unwrap();
        let parsed: DataObject = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, obj);
    }
}
