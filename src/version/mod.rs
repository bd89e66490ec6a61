//! Version grouping and natural ordering
//!
//! Fix-versions recorded on issues are free-form strings ("1.21-M2",
//! "1.1.10", "1-win"). This module buckets them into release lines and
//! orders them the way a human reads versions, not the way strings sort.

use std::cmp::Ordering;

/// Truncate a version string to its release line.
///
/// Splits on '.'; with more than two segments the first two are kept
/// ("1.3.2" -> "1.3"), otherwise the version is its own group ("1.3",
/// "2" and "1-win" stay unchanged).
pub fn major_group(version: &str) -> String {
    let segments: Vec<&str> = version.split('.').collect();
    if segments.len() > 2 {
        format!("{}.{}", segments[0], segments[1])
    } else {
        version.to_string()
    }
}

/// Natural order over free-form version strings.
///
/// Versions are compared segment-by-segment on '.' boundaries. Each
/// segment is decomposed into a leading digit run and a trailing
/// qualifier, so "21" < "21-M1" < "21-M2" < "21-win". A version that is
/// a strict prefix of another sorts first ("1.1" before "1.1.1").
/// Segments with no digits at all compare as literal strings.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let a_segments: Vec<&str> = a.split('.').collect();
    let b_segments: Vec<&str> = b.split('.').collect();

    for (a_seg, b_seg) in a_segments.iter().zip(b_segments.iter()) {
        let ord = compare_segment(a_seg, b_seg);
        if ord != Ordering::Equal {
            return ord;
        }
    }

    // All shared segments equal; the shorter sequence sorts first.
    a_segments.len().cmp(&b_segments.len())
}

/// Compare one '.'-separated segment of each version.
fn compare_segment(a: &str, b: &str) -> Ordering {
    let (a_num, a_suffix) = split_segment(a);
    let (b_num, b_suffix) = split_segment(b);

    match (a_num, b_num) {
        (Some(a_n), Some(b_n)) => match a_n.cmp(&b_n) {
            // Equal numeric parts fall through to the qualifier; an empty
            // qualifier is a prefix of any other and sorts first.
            Ordering::Equal => a_suffix.cmp(b_suffix),
            ord => ord,
        },
        // A plain numeric segment sorts before a qualifier-only one.
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

/// Split a segment into its leading digit run and the remaining suffix.
///
/// "21-M2" -> (Some(21), "-M2"); "win" -> (None, "win"). A digit run too
/// large for u64 is treated as having no numeric part and compares as a
/// literal string.
fn split_segment(segment: &str) -> (Option<u64>, &str) {
    let digits_end = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    let (digits, suffix) = segment.split_at(digits_end);
    (digits.parse::<u64>().ok(), suffix)
}
