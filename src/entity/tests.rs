use super::*;
use serde_json::json;

#[test]
fn test_from_value_numeric_id() {
    let entity = TrackedEntity::from_value(json!({
        "id": 1035045,
        "homeScore": 2,
        "awayScore": 1,
        "status": "2H",
        "league": "Premier League"
    }))
    .unwrap();

    assert_eq!(entity.id, "1035045");
    assert_eq!(entity.home_score, 2);
    assert_eq!(entity.away_score, 1);
    assert_eq!(entity.status, "2H");
    assert_eq!(entity.raw["league"], json!("Premier League"));
}

#[test]
fn test_from_value_string_id_and_null_scores() {
    let entity = TrackedEntity::from_value(json!({
        "id": "fx-9",
        "homeScore": null,
        "status": "NS"
    }))
    .unwrap();

    assert_eq!(entity.id, "fx-9");
    assert_eq!(entity.home_score, 0);
    assert_eq!(entity.away_score, 0);
    assert!(!entity.is_live());
}

#[test]
fn test_from_value_string_scores() {
    let entity = TrackedEntity::from_value(json!({
        "id": 7,
        "homeScore": "3",
        "awayScore": " 0 ",
        "status": "HT"
    }))
    .unwrap();

    assert_eq!(entity.home_score, 3);
    assert_eq!(entity.away_score, 0);
}

#[test]
fn test_from_value_rejects_missing_fields() {
    assert!(TrackedEntity::from_value(json!({"homeScore": 1, "status": "1H"})).is_err());
    assert!(TrackedEntity::from_value(json!({"id": 1, "homeScore": 1})).is_err());
    assert!(TrackedEntity::from_value(json!({"id": "", "status": "1H"})).is_err());
    assert!(TrackedEntity::from_value(json!([1, 2, 3])).is_err());
}

#[test]
fn test_from_value_rejects_negative_score() {
    let result = TrackedEntity::from_value(json!({
        "id": 1,
        "homeScore": -1,
        "awayScore": 0,
        "status": "1H"
    }));
    assert!(result.is_err());
}

#[test]
fn test_fingerprint_tracks_score_and_status() {
    let a = TrackedEntity::from_value(json!({"id": 1, "homeScore": 0, "awayScore": 0, "status": "1H"})).unwrap();
    let b = TrackedEntity::from_value(json!({"id": 1, "homeScore": 1, "awayScore": 0, "status": "1H"})).unwrap();
    let c = TrackedEntity::from_value(json!({"id": 1, "homeScore": 0, "awayScore": 0, "status": "HT"})).unwrap();

    assert_ne!(a.fingerprint(), b.fingerprint());
    assert_ne!(a.fingerprint(), c.fingerprint());

    // Fields outside the fingerprint do not matter
    let d = TrackedEntity::from_value(json!({"id": 1, "homeScore": 0, "awayScore": 0, "status": "1H", "minute": 12})).unwrap();
    assert_eq!(a.fingerprint(), d.fingerprint());
}

#[test]
fn test_live_statuses() {
    for status in ["1H", "HT", "2H", "ET", "BT", "P", "LIVE", "INT", "SUSP"] {
        assert!(is_live_status(status), "{} should be live", status);
    }
    for status in ["NS", "FT", "AET", "PEN", "PST", "CANC"] {
        assert!(!is_live_status(status), "{} should not be live", status);
    }
}

#[test]
fn test_match_update_from_entity() {
    let entity = TrackedEntity::from_value(json!({"id": 1, "homeScore": 1, "awayScore": 0, "status": "1H"})).unwrap();
    let update = MatchUpdate::from(&entity);

    assert_eq!(update.entity_id, "1");
    assert_eq!(update.home_score, 1);
    assert!(update.live);
    assert!(update.timestamp_ms > 0);

    let serialized = serde_json::to_value(&update).unwrap();
    assert_eq!(serialized["entityId"], json!("1"));
    assert_eq!(serialized["homeScore"], json!(1));
    assert_eq!(serialized["timestampMs"], json!(update.timestamp_ms));
}
