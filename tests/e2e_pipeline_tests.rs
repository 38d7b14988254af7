//! End-to-end tests for playlist generation
//!
//! Runs whole requests through the assembler with scripted collaborators and
//! checks each sourcing branch, the error shape and the explain trace.

mod common;

use common::{
    generated_tracks_json, normalized_artists, ScriptedLlm, StubCatalog, StubSimilarity,
    TestPipeline, CREDENTIAL,
};
use playlist_composer::playlist::{
    PipelineError, PipelineState, PlaylistBranch, PlaylistResponse, ReasoningStepType,
    RequestContext, TrackSource, DEFAULT_PLACEHOLDER_ARTWORK,
};
use playlist_composer::services::UserSnapshot;

const SIMILAR_TO_BLINDING_LIGHTS: &[(&str, &str)] = &[
    ("Take On Me", "a-ha"),
    ("Midnight City", "M83"),
    ("Levitating", "Dua Lipa"),
    ("Physical", "Dua Lipa"),
    ("Starboy", "The Weeknd"),
    ("Nightcall", "Kavinsky"),
];

fn titles(response: &PlaylistResponse) -> Vec<&str> {
    response.tracks().iter().map(|t| t.title.as_str()).collect()
}

// =============================================================================
// Personal-only branch
// =============================================================================

#[tokio::test]
async fn test_personal_only_filters_library_by_genre() {
    let pipeline = TestPipeline::new(ScriptedLlm::new());
    let run = pipeline
        .assembler()
        .run(
            "pop playlist with only my liked songs",
            &RequestContext::new(CREDENTIAL, false),
        )
        .await
        .unwrap();

    assert_eq!(run.branch, PlaylistBranch::PersonalOnly);
    assert_eq!(
        run.states,
        vec![
            PipelineState::Extracting,
            PipelineState::Sourcing,
            PipelineState::Enriching,
            PipelineState::Enforcing,
            PipelineState::Done,
        ]
    );
    assert_eq!(run.constraints.genres, vec!["pop"]);
    assert!(run.constraints.use_only_personal_library);

    // Kendrick Lamar is hip hop; "Levitating" appears once despite being in both lists
    let tracks = &run.result.tracks;
    let titles: Vec<&str> = tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(
        titles,
        vec!["Blinding Lights", "Levitating", "Save Your Tears", "Starboy"]
    );
    assert!(tracks.iter().all(|t| t.liked));
    assert!(tracks.iter().all(|t| t.source == TrackSource::Personal));
    assert_eq!(tracks[0].reason, "From your liked songs");
    assert_eq!(tracks[3].reason, "From your top tracks");

    // Unknown tempo takes the midpoint of the default 60-130 range
    assert!(tracks.iter().all(|t| t.tempo == 95.0));

    assert_eq!(tracks[0].artwork_url.as_deref(), Some("https://img.example/bl.jpg"));
    assert_eq!(tracks[0].playable_uri.as_deref(), Some("track:blinding-lights"));
    assert_eq!(tracks[1].artwork_url.as_deref(), Some(DEFAULT_PLACEHOLDER_ARTWORK));
    assert_eq!(tracks[1].playable_uri.as_deref(), Some("track:levitating"));

    // One genre lookup per distinct artist, one completion call for extraction only
    assert_eq!(pipeline.genres.calls(), 3);
    assert_eq!(pipeline.llm.calls(), 1);
    assert!(run.result.reasoning_trace.is_none());
}

#[tokio::test]
async fn test_personal_only_stops_at_target_count() {
    let pipeline = TestPipeline::new(ScriptedLlm::new());
    let response = pipeline
        .assembler()
        .generate_playlist("3 songs from only my library", CREDENTIAL, false)
        .await;

    assert_eq!(
        titles(&response),
        vec!["Blinding Lights", "Levitating", "Save Your Tears"]
    );
    // Genres are unconstrained, so no genre lookups happen
    assert_eq!(pipeline.genres.calls(), 0);
}

#[tokio::test]
async fn test_personal_only_with_reference_keeps_reference_artist() {
    let similarity = StubSimilarity::new().with_reference("Starboy", "Starboy", "The Weeknd");
    let pipeline = TestPipeline::new(ScriptedLlm::new()).with_similarity(similarity);

    let response = pipeline
        .assembler()
        .generate_playlist(
            "only my liked songs that sound like Starboy but slower",
            CREDENTIAL,
            false,
        )
        .await;

    assert_eq!(
        titles(&response),
        vec!["Blinding Lights", "Save Your Tears", "Starboy"]
    );
    // The personal branch never asks for similar tracks
    assert!(pipeline.similarity.similar_requests().is_empty());
}

#[tokio::test]
async fn test_personal_only_with_no_genre_match_is_an_error() {
    let pipeline = TestPipeline::new(ScriptedLlm::new());
    let assembler = pipeline.assembler();

    let err = assembler
        .run(
            "only my liked songs, jazz please",
            &RequestContext::new(CREDENTIAL, false),
        )
        .await
        .unwrap_err();
    assert_eq!(err, PipelineError::PersonalLibraryExhausted);

    let response = assembler
        .generate_playlist("only my liked songs, jazz please", CREDENTIAL, true)
        .await;
    assert!(response.is_error());
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({
            "error": "You requested only your songs, but no matching songs were found."
        })
    );

    // No generative fallback in the personal-only branch
    assert_eq!(pipeline.llm.calls(), 2);
}

#[tokio::test]
async fn test_personal_only_with_empty_library_is_an_error() {
    let pipeline = TestPipeline::new(ScriptedLlm::new()).with_snapshot(UserSnapshot::default());

    let response = pipeline
        .assembler()
        .generate_playlist("only my songs", CREDENTIAL, false)
        .await;

    assert!(response.is_error());
    assert!(response.tracks().is_empty());
}

// =============================================================================
// Reference-track and mixed branches
// =============================================================================

#[tokio::test]
async fn test_reference_track_uses_similar_tracks() {
    let llm = ScriptedLlm::new().reply(
        "```json\n{\"song_count\": 4, \"genres\": [\"synthpop\"], \"reference_track\": null}\n```",
    );
    let similarity = StubSimilarity::new()
        .with_reference("Blinding Lights", "Blinding Lights", "The Weeknd")
        .with_similar(SIMILAR_TO_BLINDING_LIGHTS);
    let catalog = StubCatalog::new().with_track(
        "Midnight City",
        "M83",
        "https://img.example/mc.jpg",
        "track:midnight-city",
    );
    let pipeline = TestPipeline::new(llm)
        .with_similarity(similarity)
        .with_catalog(catalog);

    let run = pipeline
        .assembler()
        .run(
            "a playlist that sounds like Blinding Lights but with more energy",
            &RequestContext::new(CREDENTIAL, false),
        )
        .await
        .unwrap();

    assert_eq!(run.branch, PlaylistBranch::ReferenceTrack);
    assert!(!run.states.contains(&PipelineState::GenerativeFallback));
    assert_eq!(run.constraints.target_count, 4);
    assert_eq!(run.constraints.genres, vec!["synthpop"]);
    assert_eq!(run.constraints.reference_track.as_deref(), Some("Blinding Lights"));
    assert_eq!(
        pipeline.similarity.similar_requests(),
        vec![("Blinding Lights".to_string(), "The Weeknd".to_string(), 4)]
    );

    let tracks = &run.result.tracks;
    let titles: Vec<&str> = tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Take On Me", "Midnight City", "Levitating", "Physical"]);
    assert!(tracks
        .iter()
        .all(|t| t.source == TrackSource::ExternalSimilarity
            && t.reason == "Similar to Blinding Lights by The Weeknd"));

    // Liked status comes from the snapshot, not the source
    let liked: Vec<bool> = tracks.iter().map(|t| t.liked).collect();
    assert_eq!(liked, vec![false, false, true, false]);
    assert_eq!(tracks[2].playable_uri.as_deref(), Some("track:levitating"));
    assert_eq!(tracks[1].artwork_url.as_deref(), Some("https://img.example/mc.jpg"));
    assert_eq!(tracks[1].playable_uri.as_deref(), Some("track:midnight-city"));
    assert_eq!(tracks[0].artwork_url.as_deref(), Some(DEFAULT_PLACEHOLDER_ARTWORK));

    // Extraction only; the pool was already full
    let prompts = pipeline.llm.prompts();
    assert_eq!(prompts.len(), 1);
    assert_eq!(prompts[0].temperature, 0.2);
    assert!(prompts[0].user.contains("sounds like Blinding Lights"));
}

#[tokio::test]
async fn test_mixed_branch_excludes_reference_artist_everywhere() {
    let fallback = generated_tracks_json(&[
        ("Heat Waves", "Glass Animals", Some(110.0)),
        ("Die For You", "The Weeknd", Some(130.0)),
        ("Take On Me", "a-ha", Some(169.0)),
    ]);
    let llm = ScriptedLlm::new()
        .reply("Sure! Here are your constraints.")
        .reply(fallback);
    let mut similar = SIMILAR_TO_BLINDING_LIGHTS.to_vec();
    similar.push(("Save Your Tears", " THE WEEKND "));
    let similarity = StubSimilarity::new()
        .with_reference("Blinding Lights", "Blinding Lights", "The Weeknd")
        .with_similar(&similar);
    let pipeline = TestPipeline::new(llm).with_similarity(similarity);

    let run = pipeline
        .assembler()
        .run(
            "songs that sound like Blinding Lights but not by the same artist",
            &RequestContext::new(CREDENTIAL, false),
        )
        .await
        .unwrap();

    assert_eq!(run.constraints.exclude_artist.as_deref(), Some("the weeknd"));
    assert_eq!(run.branch, PlaylistBranch::Mixed);
    assert!(run.states.contains(&PipelineState::GenerativeFallback));

    let tracks = &run.result.tracks;
    assert!(!normalized_artists(tracks).contains(&"the weeknd".to_string()));
    let titles: Vec<&str> = tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Take On Me",
            "Midnight City",
            "Levitating",
            "Physical",
            "Nightcall",
            "Heat Waves",
        ]
    );
    assert_eq!(tracks[5].source, TrackSource::Generative);
    assert_eq!(tracks[5].tempo, 110.0);
    assert_eq!(tracks[5].mood, "energetic");
    assert_eq!(tracks[5].release_year, Some(2021));
    // Short of the 15-track target, which is fine
    assert!(tracks.len() <= run.constraints.target_count);

    let prompts = pipeline.llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert_eq!(prompts[1].temperature, 0.7);
    assert!(prompts[1].user.contains("Suggest exactly 10 songs"));
    assert!(prompts[1].user.contains("Do not include any song by the weeknd"));
    assert!(prompts[1].user.contains("Midnight City by M83"));
}

#[tokio::test]
async fn test_unresolved_reference_searches_by_raw_title() {
    let llm = ScriptedLlm::new().fail("down").fail("down");
    let similarity = StubSimilarity::new().with_similar(&[("Nightcall", "Kavinsky")]);
    let pipeline = TestPipeline::new(llm).with_similarity(similarity);

    let run = pipeline
        .assembler()
        .run(
            "music that sounds like that one synth song but darker",
            &RequestContext::new(CREDENTIAL, false),
        )
        .await
        .unwrap();

    assert_eq!(
        pipeline.similarity.similar_requests(),
        vec![("that one synth song".to_string(), "unknown".to_string(), 15)]
    );
    assert_eq!(run.result.tracks.len(), 1);
    assert_eq!(
        run.result.tracks[0].reason,
        "Similar to that one synth song by unknown"
    );
    // Fallback was attempted and failed
    assert_eq!(run.branch, PlaylistBranch::ReferenceTrack);
    assert_eq!(pipeline.llm.calls(), 2);
}

// =============================================================================
// Pure generative branch
// =============================================================================

#[tokio::test]
async fn test_gradual_tempo_playlist_is_non_decreasing() {
    let fallback = generated_tracks_json(&[
        ("Track A", "Artist A", Some(140.0)),
        ("Track B", "Artist B", Some(110.0)),
        ("Track C", "Artist C", None),
        ("Track D", "Artist D", Some(125.0)),
        ("Track E", "Artist E", Some(110.0)),
    ]);
    let llm = ScriptedLlm::new().fail("timeout").reply(fallback);
    let pipeline = TestPipeline::new(llm);

    let run = pipeline
        .assembler()
        .run(
            "20 minute run with gradually increasing tempo from 100 to 150 bpm",
            &RequestContext::new(CREDENTIAL, true),
        )
        .await
        .unwrap();

    assert_eq!(run.branch, PlaylistBranch::PureGenerative);
    assert_eq!(
        run.states,
        vec![
            PipelineState::Extracting,
            PipelineState::Sourcing,
            PipelineState::GenerativeFallback,
            PipelineState::Enriching,
            PipelineState::Enforcing,
            PipelineState::Done,
        ]
    );
    assert!(run.constraints.gradual_tempo);
    assert_eq!(run.constraints.target_count, 5);

    let tracks = &run.result.tracks;
    assert!(tracks.windows(2).all(|w| w[0].tempo <= w[1].tempo));
    // Equal tempos keep pool order; the unknown tempo sits at the 125 midpoint
    let titles: Vec<&str> = tracks.iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, vec!["Track B", "Track E", "Track C", "Track D", "Track A"]);
    assert_eq!(tracks[2].tempo, 125.0);

    let reasoning = run.result.reasoning_trace.unwrap();
    assert!(reasoning[0].starts_with("Duration: the request asks for 20 minutes"));
    assert!(reasoning
        .iter()
        .any(|line| line.starts_with("Model extraction unavailable")));
    assert!(reasoning
        .iter()
        .any(|line| line.starts_with("Validation: 5 of 5 tracks")));
    assert!(reasoning.contains(
        &"1. Track B by Artist B: 110 BPM (expected 100.0), generative: Suggested by the model to fit the requested style"
            .to_string()
    ));
    assert!(reasoning
        .iter()
        .any(|line| line.starts_with("5. Track A by Artist A: 140 BPM (expected 150.0)")));
}

#[tokio::test]
async fn test_failed_fallback_ships_empty_playlist() {
    let pipeline = TestPipeline::new(ScriptedLlm::new());

    let response = pipeline
        .assembler()
        .generate_playlist("rock songs for a car ride", CREDENTIAL, false)
        .await;

    assert!(!response.is_error());
    assert!(response.tracks().is_empty());
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        serde_json::json!({ "tracks": [] })
    );
    // One attempt each for extraction and fallback, never retried
    assert_eq!(pipeline.llm.calls(), 2);
}

#[tokio::test]
async fn test_generated_library_track_is_marked_liked() {
    let fallback = generated_tracks_json(&[
        ("blinding lights", "the weeknd", Some(171.0)),
        ("Nightcall", "Kavinsky", None),
    ]);
    let catalog = StubCatalog::new().with_track(
        "Nightcall",
        "Kavinsky",
        "https://img.example/nc.jpg",
        "track:nightcall",
    );
    let pipeline = TestPipeline::new(ScriptedLlm::new().fail("down").reply(fallback))
        .with_catalog(catalog);

    let response = pipeline
        .assembler()
        .generate_playlist("upbeat pop for a workout", CREDENTIAL, false)
        .await;

    let tracks = response.tracks();
    assert_eq!(tracks.len(), 2);
    assert!(tracks[0].liked);
    assert_eq!(tracks[0].artwork_url.as_deref(), Some("https://img.example/bl.jpg"));
    assert_eq!(tracks[0].playable_uri.as_deref(), Some("track:blinding-lights"));
    assert!(!tracks[1].liked);
    assert_eq!(tracks[1].artwork_url.as_deref(), Some("https://img.example/nc.jpg"));
    assert_eq!(tracks[1].playable_uri.as_deref(), Some("track:nightcall"));

    // The library match filled both fields, so only Nightcall hit the catalog
    assert_eq!(pipeline.catalog.calls(), 1);
}

#[tokio::test]
async fn test_missing_snapshot_degrades_to_empty_library() {
    let fallback = generated_tracks_json(&[("Blinding Lights", "The Weeknd", Some(171.0))]);
    let pipeline = TestPipeline::new(ScriptedLlm::new().fail("down").reply(fallback));

    let run = pipeline
        .assembler()
        .run(
            "jazz for a study session",
            &RequestContext::new("stranger", true),
        )
        .await
        .unwrap();

    assert_eq!(run.constraints.target_count, 22);
    assert_eq!(run.result.tracks.len(), 1);
    assert!(!run.result.tracks[0].liked);
    let reasoning = run.result.reasoning_trace.unwrap();
    assert!(reasoning
        .iter()
        .any(|line| line.starts_with("Listening history unavailable")));
}

// =============================================================================
// Response shape
// =============================================================================

#[tokio::test]
async fn test_blank_request_falls_back_to_defaults() {
    let fallback = generated_tracks_json(&[
        ("Midnight City", "M83", Some(105.0)),
        ("Nightcall", "Kavinsky", Some(91.0)),
    ]);
    let llm = ScriptedLlm::new().reply("{}").reply(fallback);
    let pipeline = TestPipeline::new(llm);

    let run = pipeline
        .assembler()
        .run("   ", &RequestContext::new(CREDENTIAL, false))
        .await
        .unwrap();

    assert_eq!(run.constraints.target_count, 15);
    assert_eq!(run.constraints.genres, vec!["any"]);
    assert_eq!(run.branch, PlaylistBranch::PureGenerative);
    assert_eq!(run.states.last(), Some(&PipelineState::Done));
    assert_eq!(run.result.tracks.len(), 2);

    let prompts = pipeline.llm.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1].user.contains("Suggest exactly 15 songs"));

    let response = pipeline.assembler().generate_playlist("", CREDENTIAL, false).await;
    assert!(!response.is_error());
}

#[tokio::test]
async fn test_reasoning_only_in_explain_mode() {
    let pipeline = TestPipeline::new(ScriptedLlm::new());
    let assembler = pipeline.assembler();

    let quiet = assembler
        .generate_playlist("3 songs from only my library", CREDENTIAL, false)
        .await;
    let json = serde_json::to_value(&quiet).unwrap();
    assert!(json.get("reasoning").is_none());
    assert_eq!(json["tracks"].as_array().unwrap().len(), 3);
    assert_eq!(json["tracks"][0]["source"], "personal");

    let explained = assembler
        .generate_playlist("3 songs from only my library", CREDENTIAL, true)
        .await;
    let PlaylistResponse::Playlist { tracks, reasoning } = explained else {
        panic!("expected a playlist");
    };
    assert_eq!(tracks.len(), 3);
    let reasoning = reasoning.unwrap();
    assert!(reasoning
        .iter()
        .any(|line| line.starts_with("Song count: exactly 3 songs requested")));
    assert!(reasoning.last().unwrap().starts_with("3. Save Your Tears by The Weeknd"));
}

#[tokio::test]
async fn test_run_keeps_typed_steps_in_explain_mode() {
    let pipeline = TestPipeline::new(ScriptedLlm::new());
    let assembler = pipeline.assembler();
    let query = "3 songs from only my library";

    let run = assembler
        .run(query, &RequestContext::new(CREDENTIAL, true))
        .await
        .unwrap();

    let steps = &run.steps;
    assert!(steps
        .iter()
        .enumerate()
        .all(|(i, step)| step.step_number as usize == i));
    assert_eq!(steps[0].step_type, ReasoningStepType::Extraction);
    assert_eq!(steps.last().unwrap().step_type, ReasoningStepType::Validation);
    assert!(steps.iter().any(|s| s.step_type == ReasoningStepType::Sourcing));
    assert!(steps.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    let contents: Vec<String> = steps.iter().map(|s| s.content.clone()).collect();
    assert_eq!(run.result.reasoning_trace, Some(contents));

    let quiet = assembler
        .run(query, &RequestContext::new(CREDENTIAL, false))
        .await
        .unwrap();
    assert!(quiet.steps.is_empty());
    assert!(quiet.result.reasoning_trace.is_none());
}
