//! Mapping between [`DataObject`] values and file [`Group`]s.

use dlk_types::{DataObject, Grid, Image, ObjectKind, Roi, Signal};

use crate::entry::{Dataset, Group};
use crate::error::{PackError, PackResult};

/// Group attribute holding the object type tag.
pub const TYPE_ATTR: &str = "type";
/// Group attribute holding the JSON-encoded ROI list.
pub const ROIS_ATTR: &str = "rois";

const GEOMETRY_ATTRS: [&str; 4] = ["x0", "y0", "dx", "dy"];

/// Encode an object into a group named `name`.
///
/// Optional fields are written only when present; empty strings count as
/// absent.
pub fn encode_object(name: &str, object: &DataObject) -> PackResult<Group> {
    let mut group = Group::new(name);
    group.set_attr(TYPE_ATTR, object.kind().type_tag());
    put_text(&mut group, "title", Some(object.title()));

    match object {
        DataObject::Signal(s) => {
            group.set_dataset("x", Dataset::vector(s.x().to_vec()));
            group.set_dataset("y", Dataset::vector(s.y().to_vec()));
            if let Some(dx) = s.dx() {
                group.set_dataset("dx", Dataset::vector(dx.to_vec()));
            }
            if let Some(dy) = s.dy() {
                group.set_dataset("dy", Dataset::vector(dy.to_vec()));
            }
            put_text(&mut group, "xlabel", s.xlabel.as_deref());
            put_text(&mut group, "ylabel", s.ylabel.as_deref());
            put_text(&mut group, "xunit", s.xunit.as_deref());
            put_text(&mut group, "yunit", s.yunit.as_deref());
        }
        DataObject::Image(i) => {
            group.set_dataset("data", Dataset::from_grid(i.data()));
            if let Some(mask) = i.mask() {
                group.set_dataset("mask", Dataset::from_mask(mask));
            }
            for (key, value) in GEOMETRY_ATTRS.iter().zip([i.x0, i.y0, i.dx, i.dy]) {
                if let Some(v) = value {
                    group.set_attr(key, v);
                }
            }
            put_text(&mut group, "xlabel", i.xlabel.as_deref());
            put_text(&mut group, "ylabel", i.ylabel.as_deref());
            put_text(&mut group, "zlabel", i.zlabel.as_deref());
            put_text(&mut group, "xunit", i.xunit.as_deref());
            put_text(&mut group, "yunit", i.yunit.as_deref());
            put_text(&mut group, "zunit", i.zunit.as_deref());
        }
    }

    if !object.rois().is_empty() {
        let json = serde_json::to_string(object.rois())
            .map_err(|e| PackError::Serialization(e.to_string()))?;
        group.set_attr(ROIS_ATTR, json);
    }
    Ok(group)
}

/// Decode a group back into an object.
///
/// The `type` attribute is trusted only when the group layout agrees with
/// it; otherwise the kind is inferred from the datasets (`x` and `y` make a
/// signal, a 2-D `data` makes an image). Returns `Ok(None)` when neither
/// applies.
pub fn decode_group(group: &Group) -> PackResult<Option<DataObject>> {
    let tagged = group.attr_text(TYPE_ATTR).and_then(ObjectKind::from_type_tag);
    let kind = match tagged {
        Some(kind) if has_layout(group, kind) => Some(kind),
        _ => infer_kind(group),
    };
    match kind {
        Some(ObjectKind::Signal) => decode_signal(group).map(Some),
        Some(ObjectKind::Image) => decode_image(group).map(Some),
        None => Ok(None),
    }
}

/// Structural kind inference used when the type tag is missing or wrong.
pub fn infer_kind(group: &Group) -> Option<ObjectKind> {
    ObjectKind::ALL.into_iter().find(|kind| has_layout(group, *kind))
}

fn has_layout(group: &Group, kind: ObjectKind) -> bool {
    match kind {
        ObjectKind::Signal => group.has_dataset("x") && group.has_dataset("y"),
        ObjectKind::Image => group.dataset("data").is_some_and(|d| d.ndim() == 2),
    }
}

fn decode_signal(group: &Group) -> PackResult<DataObject> {
    let x = floats(group, "x")?;
    let y = floats(group, "y")?;
    let dx = optional_floats(group, "dx")?;
    let dy = optional_floats(group, "dy")?;

    let mut signal = Signal::new(title_of(group), Vec::new(), Vec::new())?;
    signal.set_xydata(x, y, dx, dy)?;
    signal.xlabel = text(group, "xlabel");
    signal.ylabel = text(group, "ylabel");
    signal.xunit = text(group, "xunit");
    signal.yunit = text(group, "yunit");
    signal.rois = rois(group)?;
    Ok(signal.into())
}

fn decode_image(group: &Group) -> PackResult<DataObject> {
    let data = grid(group, "data")?;
    let mut image = Image::new(title_of(group), data);

    if let Some(ds) = group.dataset("mask") {
        let values = ds.as_bools().ok_or_else(|| invalid(group, "mask", "expected bool values"))?;
        let (rows, cols) = dims2(group, "mask", ds)?;
        image.set_mask(Some(Grid::new(rows, cols, values.to_vec())?))?;
    }

    image.x0 = group.attr_float("x0");
    image.y0 = group.attr_float("y0");
    image.dx = group.attr_float("dx");
    image.dy = group.attr_float("dy");
    image.xlabel = text(group, "xlabel");
    image.ylabel = text(group, "ylabel");
    image.zlabel = text(group, "zlabel");
    image.xunit = text(group, "xunit");
    image.yunit = text(group, "yunit");
    image.zunit = text(group, "zunit");
    image.rois = rois(group)?;
    Ok(image.into())
}

fn put_text(group: &mut Group, key: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        group.set_attr(key, v);
    }
}

fn text(group: &Group, key: &str) -> Option<String> {
    group.attr_text(key).map(str::to_string)
}

fn title_of(group: &Group) -> String {
    group
        .attr_text("title")
        .unwrap_or(group.name.as_str())
        .to_string()
}

fn rois(group: &Group) -> PackResult<Vec<Roi>> {
    match group.attr_text(ROIS_ATTR) {
        Some(json) => serde_json::from_str(json).map_err(|e| PackError::Serialization(e.to_string())),
        None => Ok(Vec::new()),
    }
}

fn floats(group: &Group, key: &str) -> PackResult<Vec<f64>> {
    optional_floats(group, key)?.ok_or_else(|| PackError::MissingDataset {
        group: group.name.clone(),
        dataset: key.to_string(),
    })
}

fn optional_floats(group: &Group, key: &str) -> PackResult<Option<Vec<f64>>> {
    match group.dataset(key) {
        Some(ds) => ds
            .as_floats()
            .map(|v| Some(v.to_vec()))
            .ok_or_else(|| invalid(group, key, "expected float values")),
        None => Ok(None),
    }
}

fn grid(group: &Group, key: &str) -> PackResult<Grid<f64>> {
    let ds = group.dataset(key).ok_or_else(|| PackError::MissingDataset {
        group: group.name.clone(),
        dataset: key.to_string(),
    })?;
    let values = ds.as_floats().ok_or_else(|| invalid(group, key, "expected float values"))?;
    let (rows, cols) = dims2(group, key, ds)?;
    Ok(Grid::new(rows, cols, values.to_vec())?)
}

fn dims2(group: &Group, key: &str, ds: &Dataset) -> PackResult<(usize, usize)> {
    match ds.shape.as_slice() {
        [rows, cols] => Ok((*rows, *cols)),
        other => Err(invalid(group, key, &format!("expected 2-D shape, got {other:?}"))),
    }
}

fn invalid(group: &Group, key: &str, reason: &str) -> PackError {
    PackError::InvalidDataset {
        group: group.name.clone(),
        dataset: key.to_string(),
        reason: reason.to_string(),
    }
}
