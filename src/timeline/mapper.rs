// Maps selected transcript text to an estimated time range.
//
// The transcript source carries no word-level timing, so the estimate
// assumes uniform per-character time density inside a segment. This is a
// linear approximation with no claim of phonetic accuracy; callers that need
// a safe fallback anchor at the segment boundary instead (see
// `ReviewError::allows_coarser_anchor`).

use crate::database::models::TranscriptSegment;
use crate::error::{ReviewError, ReviewResult};

/// An estimated time range inside a segment, seconds from session start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

/// Estimate the time range covered by `selection`, a contiguous substring of
/// `segment.text`.
///
/// Fails with `AnchorNotFound` when the selection does not occur in the
/// segment text and with `DegenerateSegment` when the segment has empty text
/// or a non-positive time span. The returned range is clamped to
/// `[segment.start_time, segment.end_time]` and satisfies `start <= end`.
pub fn estimate_range(segment: &TranscriptSegment, selection: &str) -> ReviewResult<TimeRange> {
    if segment.text.is_empty() || segment.duration() <= 0.0 {
        return Err(ReviewError::DegenerateSegment);
    }

    if selection.is_empty() {
        return Err(ReviewError::AnchorNotFound);
    }

    let byte_offset = segment
        .text
        .find(selection)
        .ok_or(ReviewError::AnchorNotFound)?;

    // Density is per Unicode scalar, not per byte; offsets are converted the
    // same way so multi-byte text maps consistently.
    let total_chars = segment.text.chars().count() as f64;
    let char_offset = segment.text[..byte_offset].chars().count() as f64;
    let selection_chars = selection.chars().count() as f64;

    let density = segment.duration() / total_chars;
    let start = segment.start_time + density * char_offset;
    let end = start + density * selection_chars;

    Ok(TimeRange {
        start: start.clamp(segment.start_time, segment.end_time),
        end: end.clamp(segment.start_time, segment.end_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            id: "seg".to_string(),
            transcript_id: "t".to_string(),
            segment_index: 0,
            start_time: start,
            end_time: end,
            text: text.to_string(),
            speaker: None,
        }
    }

    #[test]
    fn test_range_is_contained_and_ordered() {
        let seg = segment(
            36.0,
            55.3,
            "Well, whenever I have to present in meetings, I feel my heart racing \
             and I start to worry that I'll make a mistake or that people will \
             judge me negatively.",
        );

        let range = estimate_range(&seg, "I have to present").unwrap();
        assert!(range.start >= seg.start_time);
        assert!(range.end <= seg.end_time);
        assert!(range.start <= range.end);

        // Matches the density formula exactly
        let total = seg.text.chars().count() as f64;
        let offset = seg.text.find("I have to present").unwrap() as f64;
        let density = (55.3 - 36.0) / total;
        let expected_start = 36.0 + density * offset;
        assert!((range.start - expected_start).abs() < 1e-9);
        assert!((range.end - (expected_start + density * 17.0)).abs() < 1e-9);
    }

    #[test]
    fn test_later_selection_maps_later() {
        let seg = segment(0.0, 10.0, "alpha beta gamma");

        let early = estimate_range(&seg, "alpha").unwrap();
        let late = estimate_range(&seg, "gamma").unwrap();
        assert!(early.start < late.start);
        assert!(late.end <= 10.0);
    }

    #[test]
    fn test_full_text_selection_spans_whole_segment() {
        let seg = segment(2.0, 6.0, "hello");

        let range = estimate_range(&seg, "hello").unwrap();
        assert!((range.start - 2.0).abs() < 1e-9);
        assert!((range.end - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_selection_fails() {
        let seg = segment(0.0, 5.0, "some words");
        assert!(matches!(
            estimate_range(&seg, "absent"),
            Err(ReviewError::AnchorNotFound)
        ));
        assert!(matches!(
            estimate_range(&seg, ""),
            Err(ReviewError::AnchorNotFound)
        ));
    }

    #[test]
    fn test_degenerate_segments_fail() {
        let empty = segment(0.0, 5.0, "");
        assert!(matches!(
            estimate_range(&empty, "x"),
            Err(ReviewError::DegenerateSegment)
        ));

        let zero_span = segment(5.0, 5.0, "words");
        assert!(matches!(
            estimate_range(&zero_span, "words"),
            Err(ReviewError::DegenerateSegment)
        ));
    }

    #[test]
    fn test_multibyte_text_stays_in_bounds() {
        let seg = segment(0.0, 9.0, "así que cuéntame más");

        let range = estimate_range(&seg, "cuéntame").unwrap();
        assert!(range.start > 0.0);
        assert!(range.end <= 9.0);
        assert!(range.start <= range.end);
    }
}
