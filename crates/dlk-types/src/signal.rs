use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};
use crate::roi::Roi;

/// 1-D signal: ordered `(x, y)` samples with optional uncertainties.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub title: String,
    x: Vec<f64>,
    y: Vec<f64>,
    dx: Option<Vec<f64>>,
    dy: Option<Vec<f64>>,
    pub xlabel: Option<String>,
    pub ylabel: Option<String>,
    pub xunit: Option<String>,
    pub yunit: Option<String>,
    pub rois: Vec<Roi>,
}

impl Signal {
    /// Create a signal. `x` and `y` must have the same length.
    pub fn new(title: impl Into<String>, x: Vec<f64>, y: Vec<f64>) -> TypeResult<Self> {
        check_len("y", x.len(), y.len())?;
        Ok(Self {
            title: title.into(),
            x,
            y,
            dx: None,
            dy: None,
            xlabel: None,
            ylabel: None,
            xunit: None,
            yunit: None,
            rois: Vec::new(),
        })
    }

    /// Replace the sample data, including optional uncertainties.
    pub fn set_xydata(
        &mut self,
        x: Vec<f64>,
        y: Vec<f64>,
        dx: Option<Vec<f64>>,
        dy: Option<Vec<f64>>,
    ) -> TypeResult<()> {
        check_len("y", x.len(), y.len())?;
        if let Some(dx) = &dx {
            check_len("dx", x.len(), dx.len())?;
        }
        if let Some(dy) = &dy {
            check_len("dy", x.len(), dy.len())?;
        }
        self.x = x;
        self.y = y;
        self.dx = dx;
        self.dy = dy;
        Ok(())
    }

    /// Builder form of [`Signal::set_xydata`] for the uncertainties only.
    pub fn with_errors(mut self, dx: Option<Vec<f64>>, dy: Option<Vec<f64>>) -> TypeResult<Self> {
        let x = std::mem::take(&mut self.x);
        let y = std::mem::take(&mut self.y);
        self.set_xydata(x, y, dx, dy)?;
        Ok(self)
    }

    pub fn with_labels(mut self, xlabel: impl Into<String>, ylabel: impl Into<String>) -> Self {
        self.xlabel = Some(xlabel.into());
        self.ylabel = Some(ylabel.into());
        self
    }

    pub fn with_units(mut self, xunit: impl Into<String>, yunit: impl Into<String>) -> Self {
        self.xunit = Some(xunit.into());
        self.yunit = Some(yunit.into());
        self
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn dx(&self) -> Option<&[f64]> {
        self.dx.as_deref()
    }

    pub fn dy(&self) -> Option<&[f64]> {
        self.dy.as_deref()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> TypeResult<()> {
    if expected != actual {
        return Err(TypeError::LengthMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_signal() {
        let s = Signal::new("s1", vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 0.0]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.y(), &[0.0, 1.0, 0.0]);
        assert!(s.dx().is_none());
        assert!(s.dy().is_none());
    }

    #[test]
    fn mismatched_y_rejected() {
        let err = Signal::new("s", vec![0.0, 1.0], vec![0.0]).unwrap_err();
        assert_eq!(
            err,
            TypeError::LengthMismatch { field: "y", expected: 2, actual: 1 }
        );
    }

    #[test]
    fn errors_must_match_x() {
        let s = Signal::new("s", vec![0.0, 1.0], vec![2.0, 3.0]).unwrap();
        let err = s.with_errors(None, Some(vec![0.1])).unwrap_err();
        assert!(matches!(err, TypeError::LengthMismatch { field: "dy", .. }));
    }

    #[test]
    fn with_errors_keeps_samples() {
        let s = Signal::new("s", vec![0.0, 1.0], vec![2.0, 3.0])
            .unwrap()
            .with_errors(Some(vec![0.5, 0.5]), Some(vec![0.1, 0.2]))
            .unwrap();
        assert_eq!(s.x(), &[0.0, 1.0]);
        assert_eq!(s.dx(), Some(&[0.5, 0.5][..]));
        assert_eq!(s.dy(), Some(&[0.1, 0.2][..]));
    }

    #[test]
    fn labels_and_units() {
        let s = Signal::new("s", vec![], vec![])
            .unwrap()
            .with_labels("time", "amplitude")
            .with_units("s", "V");
        assert!(s.is_empty());
        assert_eq!(s.xlabel.as_deref(), Some("time"));
        assert_eq!(s.yunit.as_deref(), Some("V"));
    }
}
