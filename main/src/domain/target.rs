use pindeck_api::Detection;

/// Finds the first detection whose class label contains the target substring,
/// case-insensitively.
///
/// An empty target never matches; "show everything" is expressed by not
/// configuring a target at all.
pub fn find_target<'a>(detections: &'a [Detection], target: &str) -> Option<&'a Detection> {
    if target.is_empty() {
        return None;
    }
    let target = target.to_lowercase();
    detections
        .iter()
        .find(|d| d.class.to_lowercase().contains(&target))
}
