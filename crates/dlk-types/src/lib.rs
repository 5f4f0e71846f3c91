//! Object value types for the DataLab kernel workspace.
//!
//! The workspace stores and exchanges two kinds of scientific objects. This
//! crate defines them as plain values; every other `dlk-*` crate depends on
//! it.
//!
//! # Key Types
//!
//! - [`Signal`]: 1-D `(x, y)` samples with optional `dx`/`dy` uncertainties
//! - [`Image`]: 2-D data [`Grid`] with optional mask and pixel geometry
//! - [`DataObject`]: the closed set of object values held by a workspace
//! - [`ObjectKind`]: kind tag, also the panel an object lives in remotely
//! - [`Roi`]: opaque region of interest carried along with an object

pub mod error;
pub mod grid;
pub mod image;
pub mod object;
pub mod roi;
pub mod signal;

pub use error::{TypeError, TypeResult};
pub use grid::Grid;
pub use image::Image;
pub use object::{DataObject, ObjectKind};
pub use roi::Roi;
pub use signal::Signal;
