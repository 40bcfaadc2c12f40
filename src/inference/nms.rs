//! Greedy non-maximum suppression over pixel boxes.

/// Intersection over union of two `[x1, y1, x2, y2]` boxes.
pub fn box_iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);
    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;
    if union > 0.0 { inter / union } else { 0.0 }
}

/// Indices of the boxes kept by greedy NMS, highest score first.
///
/// A box is suppressed when its IoU with an already kept box exceeds
/// `iou_threshold`. Equal scores keep input order.
pub fn non_max_suppression(boxes: &[[f32; 4]], scores: &[f32], iou_threshold: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len().min(scores.len())).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

    let mut keep: Vec<usize> = Vec::with_capacity(order.len());
    for candidate in order {
        if keep
            .iter()
            .all(|&kept| box_iou(&boxes[kept], &boxes[candidate]) <= iou_threshold)
        {
            keep.push(candidate);
        }
    }
    keep
}
