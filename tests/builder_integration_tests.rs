//! Integration tests for ModBuilder
//!
//! These tests verify that a build:
//! - Produces exactly the texture, material and descriptor of a single mod
//! - Leaves no mod directory behind when any step fails
//! - Replaces a previous mod of the same name wholesale

mod common;

use common::{BrokenTranscoder, CopyTranscoder, FIXED_IMAGE, Failure, FailingRestyler, FixedImageRestyler, GameDir, SlowRestyler};
use haydee_outfit_gen::services::game_files;
use haydee_outfit_gen::services::{BuildRequest, ModBuilder, Restyler, Transcoder};
use haydee_outfit_gen::{FailureKind, PipelineError, Resolution};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

fn builder(game: &GameDir, transcoder: Arc<dyn Transcoder>, restyler: Arc<dyn Restyler>) -> ModBuilder {
    ModBuilder::new(game.outfits.clone(), transcoder, restyler)
}

fn neon_request(game: &GameDir) -> BuildRequest {
    BuildRequest {
        mod_name: "NeonSurge".to_string(),
        author: Some("Alice".to_string()),
        resolution: Resolution::FourK,
        base_texture: game.base_texture(),
        style: "chrome and neon".to_string(),
    }
}

#[tokio::test]
async fn test_build_neon_surge() {
    let game = GameDir::new();
    let transcoder = Arc::new(CopyTranscoder::default());
    let restyler = Arc::new(FixedImageRestyler::new());

    let descriptor = builder(&game, transcoder.clone(), restyler.clone())
        .build(&neon_request(&game))
        .await
        .unwrap();

    let dir = game.outfits.join("NeonSurge");
    assert_eq!(descriptor.directory, dir);
    assert_eq!(
        common::sorted_entries(&dir),
        vec!["NeonSurge.mtl", "NeonSurge.outfit", "Suit_D.dds"]
    );
    assert_eq!(game.outfit_entries(), vec!["NeonSurge"]);

    // The restyled image made it into the native texture
    assert_eq!(fs::read(dir.join("Suit_D.dds")).unwrap(), FIXED_IMAGE);

    let outfit = fs::read_to_string(dir.join("NeonSurge.outfit")).unwrap();
    assert!(outfit.contains("Outfits/NeonSurge/NeonSurge.mtl"));
    assert!(outfit.contains("Outfits/NeonSurge/Suit_D.dds"));
    assert_eq!(game_files::read_field(&outfit, "author").as_deref(), Some("Alice"));
    assert_eq!(game_files::read_resolution(&outfit), Some(Resolution::FourK));

    let material = fs::read_to_string(dir.join("NeonSurge.mtl")).unwrap();
    assert!(material.contains("Outfits/NeonSurge/Suit_D.dds"));

    assert_eq!(transcoder.to_png.load(Ordering::SeqCst), 1);
    assert_eq!(transcoder.to_dds.load(Ordering::SeqCst), 1);
    assert_eq!(*restyler.prompts.lock().unwrap(), vec!["chrome and neon"]);
}

#[tokio::test]
async fn test_missing_base_texture_creates_nothing() {
    let game = GameDir::new();
    let restyler = Arc::new(FixedImageRestyler::new());
    let mut request = neon_request(&game);
    request.base_texture = game.game.join("Textures/Suit/Missing_D.dds");

    let err = builder(&game, Arc::new(CopyTranscoder::default()), restyler.clone())
        .build(&request)
        .await
        .unwrap_err();

    match err {
        PipelineError::MissingAsset { ref path } => assert_eq!(path, &request.base_texture),
        other => panic!("expected MissingAsset, got {other:?}"),
    }
    assert!(err.to_string().contains("Missing_D.dds"));
    assert!(game.outfit_entries().is_empty());
    assert!(restyler.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_rebuild_replaces_previous_mod() {
    let game = GameDir::new();
    let transcoder: Arc<dyn Transcoder> = Arc::new(CopyTranscoder::default());

    builder(&game, transcoder.clone(), Arc::new(FixedImageRestyler::with_image(b"first")))
        .build(&neon_request(&game))
        .await
        .unwrap();
    let dir = game.outfits.join("NeonSurge");
    fs::write(dir.join("stale.txt"), b"left over").unwrap();

    builder(&game, transcoder, Arc::new(FixedImageRestyler::with_image(b"second")))
        .build(&neon_request(&game))
        .await
        .unwrap();

    assert_eq!(fs::read(dir.join("Suit_D.dds")).unwrap(), b"second");
    assert!(!dir.join("stale.txt").exists());
    assert_eq!(game.outfit_entries(), vec!["NeonSurge"]);
}

#[tokio::test]
async fn test_failed_rebuild_keeps_previous_mod() {
    let game = GameDir::new();

    builder(&game, Arc::new(CopyTranscoder::default()), Arc::new(FixedImageRestyler::with_image(b"first")))
        .build(&neon_request(&game))
        .await
        .unwrap();

    let err = builder(&game, Arc::new(CopyTranscoder::default()), Arc::new(FailingRestyler(Failure::Rejected)))
        .build(&neon_request(&game))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Generation);
    assert_eq!(
        fs::read(game.outfits.join("NeonSurge/Suit_D.dds")).unwrap(),
        b"first"
    );
    assert_eq!(game.outfit_entries(), vec!["NeonSurge"]);
}

#[tokio::test]
async fn test_quota_error_is_retryable_and_leaves_nothing() {
    let game = GameDir::new();

    let err = builder(&game, Arc::new(CopyTranscoder::default()), Arc::new(FailingRestyler(Failure::Quota)))
        .build(&neon_request(&game))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Quota);
    assert!(err.is_retryable());
    assert!(game.outfit_entries().is_empty());
}

#[tokio::test]
async fn test_conversion_failure_leaves_nothing() {
    let game = GameDir::new();

    let err = builder(&game, Arc::new(BrokenTranscoder), Arc::new(FixedImageRestyler::new()))
        .build(&neon_request(&game))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Conversion);
    assert!(err.to_string().contains("unsupported DDS variant"));
    assert!(game.outfit_entries().is_empty());
}

#[tokio::test]
async fn test_restyle_timeout() {
    let game = GameDir::new();
    let restyler = Arc::new(SlowRestyler {
        delay: Duration::from_secs(5),
    });

    let err = builder(&game, Arc::new(CopyTranscoder::default()), restyler)
        .with_restyle_timeout(Duration::from_millis(50))
        .build(&neon_request(&game))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Timeout(after) if after == Duration::from_millis(50)));
    assert!(err.is_retryable());
    assert!(game.outfit_entries().is_empty());
}

#[tokio::test]
async fn test_invalid_names_are_rejected() {
    let game = GameDir::new();
    let b = builder(&game, Arc::new(CopyTranscoder::default()), Arc::new(FixedImageRestyler::new()));

    for name in ["", "   ", "../escape", "a/b", "CON", "bad:name"] {
        let mut request = neon_request(&game);
        request.mod_name = name.to_string();
        let err = b.build(&request).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::InvalidName, "name {name:?}");
    }
    assert!(game.outfit_entries().is_empty());
}

#[tokio::test]
async fn test_builds_into_missing_outfits_folder() {
    let game = GameDir::new();
    fs::remove_dir_all(&game.outfits).unwrap();

    builder(&game, Arc::new(CopyTranscoder::default()), Arc::new(FixedImageRestyler::new()))
        .build(&neon_request(&game))
        .await
        .unwrap();

    assert!(game.outfits.join("NeonSurge/NeonSurge.outfit").is_file());
}
