// Resolves the playback position to the segment the transcript cursor
// should highlight.

use crate::database::models::TranscriptSegment;

/// Find the segment containing `time`, or the nearest upcoming one.
///
/// `segments` must be non-overlapping and sorted by `start_time` ascending
/// (equivalently by `segment_index`). When `time` sits in a gap and is
/// positive, the segment with the smallest `start_time` greater than `time`
/// is returned so the cursor highlights what is coming next; ties break on
/// the lowest index. Returns `None` when nothing lies ahead, letting the
/// caller keep the previous highlight.
pub fn locate(segments: &[TranscriptSegment], time: f64) -> Option<&TranscriptSegment> {
    // Segment counts stay in the tens-to-hundreds range; a linear scan over
    // the ordered list is enough and keeps the tie-break trivial.
    if let Some(containing) = segments.iter().find(|s| s.contains(time)) {
        return Some(containing);
    }

    if time > 0.0 {
        return segments.iter().find(|s| s.start_time > time);
    }

    None
}
