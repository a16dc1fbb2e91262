//! Media upload integration tests
//!
//! Capture a local image, upload it through the composed application and
//! check the owning entity's image field.

mod common;

use std::io::Write;
use std::sync::Arc;

use league_media::{CaptureSource, CaptureState, MockImageSource, UploadError};
use league_roster::{NewPlayer, NewTeam};
use tokio_test::{assert_err, assert_ok};

use crate::common::TestApp;

fn jpeg_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"\xFF\xD8\xFF\xE0fake-jpeg").unwrap();
    file
}

#[test_log::test(tokio::test)]
async fn test_shield_upload_success() {
    let t = TestApp::new().await;
    let team = assert_ok!(t.app.teams.create(NewTeam::named("Tigers")).await);
    let image = jpeg_file();
    let source = Arc::new(MockImageSource::new());
    source.push_image(format!("file://{}", image.path().display()));

    let flow = t.app.shield_flow(source.clone());
    let url = assert_ok!(flow.capture_and_upload(team.id, CaptureSource::Camera).await)
        .expect("image captured");

    assert!(!url.is_empty());
    assert_eq!(flow.state(team.id), CaptureState::Idle);
    assert_eq!(source.requests(), vec![CaptureSource::Camera]);

    let teams = t.app.teams.list();
    assert_eq!(teams[0].shield_url.as_deref(), Some(url.as_str()));

    let filename = url.rsplit('/').next().unwrap();
    assert!(filename.ends_with(".jpg"));
    let stored = t.mock.object("team-shields", filename).expect("object stored");
    assert_eq!(stored.content_type, "image/jpeg");
}

#[test_log::test(tokio::test)]
async fn test_network_failure_leaves_photo_unchanged() {
    let t = TestApp::new().await;
    let player = assert_ok!(
        t.app
            .players
            .create(NewPlayer {
                name: "Edinson".to_string(),
                surname: "Cavani".to_string(),
                jersey_number: 10,
                position: "Delantero".to_string(),
                age: 37,
                photo_url: Some("mock://storage/player-photos/old.jpg".to_string()),
                team_id: None,
                user_id: None,
            })
            .await
    );
    let image = jpeg_file();
    let source = Arc::new(MockImageSource::new());
    source.push_image(image.path().display().to_string());
    t.mock.behavior().fail_uploads("network request failed");

    let flow = t.app.photo_flow(source);
    let err = assert_err!(flow.capture_and_upload(player.id, CaptureSource::Library).await);
    assert!(matches!(err, UploadError::Storage(_)));
    assert_eq!(flow.state(player.id), CaptureState::Idle);

    let players = assert_ok!(t.app.players.fetch().await);
    assert_eq!(
        players[0].photo_url.as_deref(),
        Some("mock://storage/player-photos/old.jpg")
    );

    let alert = league_common::Error::from(err).alert().unwrap();
    assert_eq!(alert.title, "Upload failed");
}

#[test_log::test(tokio::test)]
async fn test_unmounted_screen_reports_attach_cancelled() {
    let t = TestApp::new().await;
    let team = assert_ok!(t.app.teams.create(NewTeam::named("Tigers")).await);
    let image = jpeg_file();
    let source = Arc::new(MockImageSource::new());
    source.push_image(image.path().display().to_string());

    let flow = t.app.shield_flow(source);
    t.app.teams.unmount();

    let err = assert_err!(flow.capture_and_upload(team.id, CaptureSource::Camera).await);
    assert!(matches!(err, UploadError::Attach { .. }));
    assert!(league_common::Error::from(err).alert().is_none());
    assert_eq!(flow.state(team.id), CaptureState::Idle);
}
