//! Final constraint pass over the enriched pool.

use super::constraints::PlaylistConstraints;
use super::trace::{ReasoningLogger, ReasoningStepType};
use super::track::{exclude_artist, CandidateTrack, PlaylistTrack};

/// Expected tempo at `position` of `len` tracks spread evenly over `low..=high`.
pub fn expected_tempo(low: f64, high: f64, position: usize, len: usize) -> f64 {
    if len <= 1 {
        return low;
    }
    low + position as f64 * (high - low) / (len - 1) as f64
}

/// Exclude, backfill tempo, order and truncate the pool into the playlist.
///
/// Gradual ordering is a stable ascending sort, so equal tempos keep pool
/// order. A pool smaller than `target_count` yields a short playlist.
pub fn enforce(
    candidates: Vec<CandidateTrack>,
    constraints: &PlaylistConstraints,
    target_count: usize,
    trace: &mut ReasoningLogger,
) -> Vec<PlaylistTrack> {
    let candidates = exclude_artist(candidates, constraints.exclude_artist.as_deref());

    let midpoint = constraints.tempo_range.midpoint();
    let mut tracks: Vec<PlaylistTrack> = candidates
        .into_iter()
        .map(|candidate| {
            let tempo = candidate.tempo.filter(|t| t.is_finite()).unwrap_or(midpoint);
            PlaylistTrack::finalize(candidate, tempo)
        })
        .collect();

    if constraints.gradual_tempo {
        tracks.sort_by(|a, b| a.tempo.total_cmp(&b.tempo));
    }
    tracks.truncate(target_count);

    if trace.is_enabled() {
        log_validation(&tracks, constraints, target_count, trace);
    }
    tracks
}

fn log_validation(
    tracks: &[PlaylistTrack],
    constraints: &PlaylistConstraints,
    target_count: usize,
    trace: &mut ReasoningLogger,
) {
    trace.log(
        ReasoningStepType::Validation,
        format!(
            "Validation: {} of {} tracks; {}.",
            tracks.len(),
            target_count,
            constraints.summary()
        ),
    );

    let (low, high) = constraints.tempo_range.bounds();
    let show_expected = constraints.requires_tempo_check || constraints.gradual_tempo;
    for (i, track) in tracks.iter().enumerate() {
        let mut line = format!("{}. {} by {}: {} BPM", i + 1, track.title, track.artist, track.tempo);
        if show_expected {
            line.push_str(&format!(
                " (expected {:.1})",
                expected_tempo(low, high, i, tracks.len())
            ));
        }
        if !constraints.tempo_range.contains(track.tempo) {
            line.push_str(&format!(" [outside {}-{} BPM]", low, high));
        }
        line.push_str(&format!(", {}: {}", track.source, track.reason));
        trace.log(ReasoningStepType::Validation, line);
    }
}
