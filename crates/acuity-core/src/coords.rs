//! Bounding-box remapping from sent-image space to original-image space.
//!
//! The model reports boxes relative to the image it was sent, which may have
//! been cropped and resized. Remapping undoes both: scale back to crop
//! space, translate by the crop origin, then sort, round, and clamp into the
//! original image's 0-indexed pixel bounds.

use serde_json::{json, Value};
use tracing::trace;

/// Result fields whose items carry remappable bounding boxes.
const RECOGNIZED_FIELDS: [&str; 2] = ["elements", "text_blocks"];

/// Boxes whose largest value is at or below this are treated as normalized
/// fractions of the sent image. Values in (1.0, 1.5] are ambiguous and
/// resolve as normalized by convention.
const NORMALIZED_MAX: f64 = 1.5;

/// Rewrite every recognized bounding box in `result` into original-image
/// pixel coordinates, in place.
///
/// Tolerant by design: a missing field, a non-array item, a box of the wrong
/// arity, or non-numeric entries leave that box untouched while sibling
/// boxes are still mapped.
pub fn remap_boxes(
    result: &mut Value,
    crop_bbox: [u32; 4],
    sent_size: (u32, u32),
    orig_size: (u32, u32),
) {
    let Some(object) = result.as_object_mut() else {
        return;
    };

    let mapper = BoxMapper::new(crop_bbox, sent_size, orig_size);
    for field in RECOGNIZED_FIELDS {
        let Some(Value::Array(items)) = object.get_mut(field) else {
            continue;
        };
        for item in items {
            if let Some(bbox) = item.get_mut("bbox") {
                mapper.remap(bbox);
            }
        }
    }
}

struct BoxMapper {
    crop_x1: f64,
    crop_y1: f64,
    sent_w: f64,
    sent_h: f64,
    scale_x: f64,
    scale_y: f64,
    max_x: f64,
    max_y: f64,
}

impl BoxMapper {
    fn new(crop_bbox: [u32; 4], sent_size: (u32, u32), orig_size: (u32, u32)) -> Self {
        let [crop_x1, crop_y1, crop_x2, crop_y2] = crop_bbox;
        let crop_w = crop_x2.saturating_sub(crop_x1) as f64;
        let crop_h = crop_y2.saturating_sub(crop_y1) as f64;
        let sent_w = sent_size.0.max(1) as f64;
        let sent_h = sent_size.1.max(1) as f64;

        Self {
            crop_x1: crop_x1 as f64,
            crop_y1: crop_y1 as f64,
            sent_w: sent_size.0 as f64,
            sent_h: sent_size.1 as f64,
            scale_x: crop_w / sent_w,
            scale_y: crop_h / sent_h,
            // 0-indexed bounds so mapped corners are valid pixel positions.
            max_x: (orig_size.0 as f64 - 1.0).max(0.0),
            max_y: (orig_size.1 as f64 - 1.0).max(0.0),
        }
    }

    fn remap(&self, bbox: &mut Value) {
        let Some(mut coords) = coerce_box(bbox) else {
            trace!("leaving unmappable bbox untouched");
            return;
        };

        let largest = coords.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        if largest <= NORMALIZED_MAX {
            coords[0] *= self.sent_w;
            coords[1] *= self.sent_h;
            coords[2] *= self.sent_w;
            coords[3] *= self.sent_h;
        }

        let x1 = self.crop_x1 + coords[0] * self.scale_x;
        let y1 = self.crop_y1 + coords[1] * self.scale_y;
        let x2 = self.crop_x1 + coords[2] * self.scale_x;
        let y2 = self.crop_y1 + coords[3] * self.scale_y;

        let (x1, x2) = if x1 <= x2 { (x1, x2) } else { (x2, x1) };
        let (y1, y2) = if y1 <= y2 { (y1, y2) } else { (y2, y1) };

        *bbox = json!([
            finish(x1, self.max_x),
            finish(y1, self.max_y),
            finish(x2, self.max_x),
            finish(y2, self.max_y),
        ]);
    }
}

fn finish(value: f64, max: f64) -> i64 {
    value.min(max).max(0.0).round() as i64
}

/// Coerce a JSON value into a 4-element numeric box.
///
/// Numbers and numeric strings are accepted; anything else, or the wrong
/// arity, yields `None`.
fn coerce_box(value: &Value) -> Option<[f64; 4]> {
    let items = value.as_array()?;
    if items.len() != 4 {
        return None;
    }

    let mut coords = [0.0; 4];
    for (slot, item) in coords.iter_mut().zip(items) {
        *slot = match item {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
    }
    Some(coords)
}
