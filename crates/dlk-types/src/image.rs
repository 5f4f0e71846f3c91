use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::grid::Grid;
use crate::roi::Roi;

/// 2-D image with optional mask and pixel geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub title: String,
    data: Grid<f64>,
    mask: Option<Grid<bool>>,
    /// Origin of the first pixel along x.
    pub x0: Option<f64>,
    /// Origin of the first pixel along y.
    pub y0: Option<f64>,
    /// Pixel spacing along x.
    pub dx: Option<f64>,
    /// Pixel spacing along y.
    pub dy: Option<f64>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub zlabel: Option<String>,
    pub xunit: Option<String>,
    pub yunit: Option<String>,
    pub zunit: Option<String>,
    pub rois: Vec<Roi>,
}

impl Image {
    pub fn new(title: impl Into<String>, data: Grid<f64>) -> Self {
        Self {
            title: title.into(),
            data,
            mask: None,
            x0: None,
            y0: None,
            dx: None,
            dy: None,
            xlabel: None,
            ylabel: None,
            zlabel: None,
            xunit: None,
            yunit: None,
            zunit: None,
            rois: Vec::new(),
        }
    }

    /// Attach a mask. It must have the same shape as the data.
    pub fn with_mask(mut self, mask: Grid<bool>) -> TypeResult<Self> {
        self.set_mask(Some(mask))?;
        Ok(self)
    }

    pub fn set_mask(&mut self, mask: Option<Grid<bool>>) -> TypeResult<()> {
        if let Some(mask) = &mask {
            if mask.shape() != self.data.shape() {
                return Err(TypeError::ShapeMismatch {
                    field: "mask",
                    expected: self.data.shape(),
                    actual: mask.shape(),
                });
            }
        }
        self.mask = mask;
        Ok(())
    }

    /// Replace the pixel data. An existing mask must still match.
    pub fn set_data(&mut self, data: Grid<f64>) -> TypeResult<()> {
        if let Some(mask) = &self.mask {
            if mask.shape() != data.shape() {
                return Err(TypeError::ShapeMismatch {
                    field: "data",
                    expected: mask.shape(),
                    actual: data.shape(),
                });
            }
        }
        self.data = data;
        Ok(())
    }

    pub fn with_geometry(mut self, x0: f64, y0: f64, dx: f64, dy: f64) -> Self {
        self.x0 = Some(x0);
        self.y0 = Some(y0);
        self.dx = Some(dx);
        self.dy = Some(dy);
        self
    }

    pub fn data(&self) -> &Grid<f64> {
        &self.data
    }

    pub fn mask(&self) -> Option<&Grid<bool>> {
        self.mask.as_ref()
    }

    pub fn shape(&self) -> (usize, usize) {
        self.data.shape()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_2x2() -> Grid<f64> {
        Grid::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap()
    }

    #[test]
    fn image_with_mask() {
        let mask = Grid::from_rows(vec![vec![false, true], vec![false, false]]).unwrap();
        let img = Image::new("i1", data_2x2()).with_mask(mask).unwrap();
        assert_eq!(img.shape(), (2, 2));
        assert_eq!(img.mask().unwrap().get(0, 1), Some(&true));
    }

    #[test]
    fn mask_shape_checked() {
        let err = Image::new("i1", data_2x2())
            .with_mask(Grid::filled(3, 2, false))
            .unwrap_err();
        assert_eq!(
            err,
            TypeError::ShapeMismatch { field: "mask", expected: (2, 2), actual: (3, 2) }
        );
    }

    #[test]
    fn set_data_respects_mask() {
        let mut img = Image::new("i1", data_2x2())
            .with_mask(Grid::filled(2, 2, false))
            .unwrap();
        assert!(img.set_data(Grid::filled(4, 4, 0.0)).is_err());
        assert!(img.set_data(Grid::filled(2, 2, 7.0)).is_ok());
        assert_eq!(img.data().values(), &[7.0; 4]);
    }

    #[test]
    fn geometry_is_optional() {
        let img = Image::new("i1", data_2x2());
        assert!(img.x0.is_none());
        let img = img.with_geometry(0.0, 1.0, 0.5, 0.25);
        assert_eq!(img.dy, Some(0.25));
    }
}
