//! Roster workflow integration tests
//!
//! Admin CRUD through the resource hooks, account provisioning and the
//! derived league views.

mod common;

use chrono::{Duration, Utc};
use league_auth::{Role, PROFILES};
use league_roster::{
    describe_match, partition_matches, standings, top_scorers, AccountError, AccountRecord,
    MatchPatch, NewAccountRequest, NewMatch, NewPlayer, NewTeam, PlayerAccount, PlayerPatch,
    ResourceError, TeamAccount, PLAYERS, STATS,
};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

use crate::common::TestApp;

#[test_log::test(tokio::test)]
async fn test_tigers_scenario() {
    let t = TestApp::new().await;
    let teams = &t.app.teams;

    let tigers = assert_ok!(teams.create(NewTeam::named("Tigers")).await);
    assert_eq!(tigers.id, 1);
    assert_eq!(tigers.name, "Tigers");

    let listed = assert_ok!(teams.fetch().await);
    assert_eq!(listed, vec![tigers]);

    assert_ok!(teams.delete(1).await);
    assert!(assert_ok!(teams.fetch().await).is_empty());
    assert!(teams.list().is_empty());
}

#[test_log::test(tokio::test)]
async fn test_player_update_then_fetch() {
    let t = TestApp::new().await;
    let river = assert_ok!(t.app.teams.create(NewTeam::named("River")).await);
    let player = assert_ok!(
        t.app
            .players
            .create(NewPlayer {
                name: "Miguel".to_string(),
                surname: "Borja".to_string(),
                jersey_number: 9,
                position: "Delantero".to_string(),
                age: 31,
                photo_url: None,
                team_id: Some(river.id),
                user_id: None,
            })
            .await
    );

    let patch = PlayerPatch {
        jersey_number: Some(19),
        ..PlayerPatch::default()
    };
    assert_ok!(t.app.players.update(player.id, patch).await);

    let players = assert_ok!(t.app.players.fetch_where("team_id", river.id).await);
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].jersey_number, 19);

    let err = assert_err!(t.app.players.delete(999).await);
    assert!(matches!(err, ResourceError::NotFound { .. }));
}

#[test_log::test(tokio::test)]
async fn test_admin_creates_accounts_without_losing_session() {
    let t = TestApp::new().await;
    let admin = t.sign_in_admin().await;

    let player = assert_ok!(
        t.app
            .accounts
            .create_account(NewAccountRequest::Player(PlayerAccount {
                email: "borja@river.com".to_string(),
                password: "secret".to_string(),
                name: "Miguel".to_string(),
                surname: "Borja".to_string(),
                jersey_number: 9,
                age: 31,
                position: "Delantero".to_string(),
                team_id: None,
            }))
            .await
    );
    assert_eq!(player.role, Role::Player);
    assert!(matches!(player.record, AccountRecord::Player(ref p) if p.user_id == Some(player.user.id)));

    let team = assert_ok!(
        t.app
            .accounts
            .create_account(NewAccountRequest::Team(TeamAccount {
                email: "prensa@atlanta.com".to_string(),
                password: "secret".to_string(),
                name: "Atlanta".to_string(),
                shield_url: None,
            }))
            .await
    );
    assert_eq!(team.role, Role::Follower);

    // Admin plus the two new accounts
    let users = assert_ok!(t.app.users.fetch().await);
    assert_eq!(users.len(), 3);
    assert_eq!(
        users.iter().filter(|u| u.role == Role::Admin).count(),
        1
    );

    // The admin is still the signed-in user
    let snapshot = t.app.session.snapshot();
    assert_eq!(snapshot.user.map(|u| u.id), admin.user.map(|u| u.id));
    assert!(snapshot.role.is_some_and(|r| r.is_admin()));
}

#[test_log::test(tokio::test)]
async fn test_duplicate_account_email_rejected() {
    let t = TestApp::new().await;
    let request = NewAccountRequest::Team(TeamAccount {
        email: "prensa@atlanta.com".to_string(),
        password: "secret".to_string(),
        name: "Atlanta".to_string(),
        shield_url: None,
    });

    assert_ok!(t.app.accounts.create_account(request.clone()).await);
    let err = assert_err!(t.app.accounts.create_account(request).await);
    assert!(matches!(err, AccountError::Identity(_)));
    assert_eq!(t.mock.rows(PROFILES).len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_fixtures_and_standings() {
    let t = TestApp::new().await;
    let river = assert_ok!(t.app.teams.create(NewTeam::named("River")).await);
    let boca = assert_ok!(t.app.teams.create(NewTeam::named("Boca")).await);
    let now = Utc::now();

    let played = assert_ok!(
        t.app
            .matches
            .create(NewMatch {
                home_team_id: river.id,
                away_team_id: boca.id,
                date: now - Duration::days(3),
                stadium: "Monumental".to_string(),
                home_goals: None,
                away_goals: None,
            })
            .await
    );
    assert_ok!(
        t.app
            .matches
            .create(NewMatch {
                home_team_id: boca.id,
                away_team_id: river.id,
                date: now + Duration::days(4),
                stadium: "Bombonera".to_string(),
                home_goals: None,
                away_goals: None,
            })
            .await
    );
    assert_ok!(t.app.matches.update(played.id, MatchPatch::score(2, 1)).await);

    let teams = assert_ok!(t.app.teams.fetch().await);
    let matches = assert_ok!(t.app.matches.fetch().await);

    let partition = partition_matches(&matches, now);
    assert_eq!(partition.upcoming.len(), 1);
    assert_eq!(describe_match(&partition.upcoming[0], &teams), "Boca vs River");
    assert_eq!(describe_match(&partition.recent[0], &teams), "River 2 - 1 Boca");

    let table = standings(&teams, &matches);
    assert_eq!(table[0].team_name, "River");
    assert_eq!(table[0].points, 3);
    assert_eq!(table[1].points, 0);
}

#[test_log::test(tokio::test)]
async fn test_top_scorers_from_stats() {
    let t = TestApp::new().await;
    let river = assert_ok!(t.app.teams.create(NewTeam::named("River")).await);
    t.mock.seed_rows(
        PLAYERS,
        vec![
            json!({ "name": "Miguel", "surname": "Borja", "jersey_number": 9, "position": "Delantero", "age": 31, "team_id": river.id }),
            json!({ "name": "Facundo", "surname": "Colidio", "jersey_number": 11, "position": "Delantero", "age": 24, "team_id": river.id }),
        ],
    );
    t.mock.seed_rows(
        STATS,
        vec![
            json!({ "player_id": 1, "match_id": 1, "goals": 2 }),
            json!({ "player_id": 2, "match_id": 1, "goals": 1 }),
            json!({ "player_id": 1, "match_id": 2, "goals": 1, "yellow_cards": 1 }),
        ],
    );

    let teams = assert_ok!(t.app.teams.fetch().await);
    let players = assert_ok!(t.app.players.fetch().await);
    let stats = assert_ok!(t.app.stats.fetch().await);

    let scorers = top_scorers(&stats, &players, &teams, 5);
    assert_eq!(scorers.len(), 2);
    assert_eq!(scorers[0].player_name, "Miguel Borja");
    assert_eq!(scorers[0].goals, 3);
    assert_eq!(scorers[0].team_name.as_deref(), Some("River"));
}
