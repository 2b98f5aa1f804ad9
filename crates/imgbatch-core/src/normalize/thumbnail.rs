//! Thumbnail and size-variant suffix stripping.

use regex::Regex;
use std::sync::OnceLock;

/// `=w<digits>-h<digits>` with an optional `-no` flag, as appended by image CDNs.
fn size_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"=w\d+-h\d+(-no)?").expect("size suffix pattern is valid"))
}

/// Removes size suffixes, `-thumbnail` markers and `/thumbnail/` segments from a URL path.
///
/// Applied until nothing changes so that stripping one marker cannot leave
/// another one behind; this keeps normalization idempotent.
pub fn strip_thumbnail_markers(path: &str) -> String {
    let mut current = path.to_string();
    loop {
        let next = size_suffix()
            .replace_all(&current, "")
            .replace("-thumbnail", "")
            .replace("/thumbnail/", "/");
        if next == current {
            return current;
        }
        current = next;
    }
}
