//! Integration tests for PocketDB

use std::rc::Rc;

use pocketdb::codec::Value;
use pocketdb::{delete_store, list_stores, Pocket, PocketError};
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Profile {
    user: String,
    level: u32,
    friends: Vec<String>,
}

fn sample_profile() -> Profile {
    Profile {
        user: "shahrukh".to_string(),
        level: 42,
        friends: vec!["amir".to_string(), "salman".to_string()],
    }
}

fn open_pocket(name: &str, dir: &TempDir) -> Pocket {
    let mut pocket = Pocket::new();
    pocket.open(name, dir.path()).unwrap();
    pocket
}

// =============================================================================
// Set / Get
// =============================================================================

#[test]
fn set_then_get_returns_the_value() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);

    let profile = sample_profile();
    pocket.set("profile", &profile).unwrap();
    assert_eq!(pocket.get::<Profile>("profile").unwrap(), Some(profile));

    pocket.set("greeting", &"hello world").unwrap();
    assert_eq!(
        pocket.get::<String>("greeting").unwrap().as_deref(),
        Some("hello world")
    );
}

#[test]
fn absent_key_yields_none_or_the_supplied_default() {
    let dir = TempDir::new().unwrap();
    let pocket = open_pocket("data", &dir);

    assert_eq!(pocket.get::<u32>("missing").unwrap(), None);
    assert_eq!(pocket.get_or("missing", 7u32).unwrap(), 7);
    assert_eq!(pocket.get_or("missing", String::new()).unwrap(), "");
}

#[test]
fn overwriting_a_key_keeps_the_last_value() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);

    pocket.set("counter", &1u32).unwrap();
    pocket.set("counter", &2u32).unwrap();
    assert_eq!(pocket.get::<u32>("counter").unwrap(), Some(2));
}

#[test]
fn stored_shape_must_match_the_requested_type() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);

    pocket.set("text", &"definitely not a profile").unwrap();
    assert!(matches!(
        pocket.get::<Profile>("text"),
        Err(PocketError::Codec(_))
    ));
}

#[test]
fn empty_keys_are_rejected() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);

    let err = pocket.set("", &1u32).unwrap_err();
    assert!(matches!(err, PocketError::EmptyKey));
    assert!(err.is_usage());
}

// =============================================================================
// Delete / HasKey / ListKeys
// =============================================================================

#[test]
fn deleting_an_absent_key_is_a_silent_no_op() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);

    pocket.set("kept", &true).unwrap();
    pocket.delete("never-existed").unwrap();

    assert_eq!(pocket.list_keys().unwrap(), vec!["kept"]);
}

#[test]
fn has_key_tracks_set_and_delete() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);

    assert!(!pocket.has_key("k").unwrap());
    pocket.set("k", &0u8).unwrap();
    assert!(pocket.has_key("k").unwrap());
    pocket.delete("k").unwrap();
    assert!(!pocket.has_key("k").unwrap());
}

#[test]
fn list_keys_reflects_any_set_delete_sequence() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);

    for key in ["cherry", "apple", "banana", "date"] {
        pocket.set(key, &0u8).unwrap();
    }
    pocket.delete("banana").unwrap();
    pocket.set("elderberry", &0u8).unwrap();
    pocket.delete("apple").unwrap();

    assert_eq!(
        pocket.list_keys().unwrap(),
        vec!["cherry", "date", "elderberry"]
    );
}

// =============================================================================
// Shared-Reference Values
// =============================================================================

#[test]
fn shared_sub_objects_keep_their_identity_through_the_store() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);

    let shared = Value::shared(Value::Text("the one address".to_string()));
    let shared_node = shared.as_shared().unwrap().clone();
    let value = Value::Map(
        [
            ("home".to_string(), Value::Shared(Rc::clone(&shared_node))),
            ("work".to_string(), Value::Shared(shared_node)),
        ]
        .into_iter()
        .collect(),
    );

    pocket.set("addresses", &value).unwrap();
    let back = pocket.get::<Value>("addresses").unwrap().unwrap();
    assert_eq!(back, value);

    let entries = match &back {
        Value::Map(m) => m,
        other => panic!("expected map, got {other:?}"),
    };
    let home = entries["home"].as_shared().unwrap();
    let work = entries["work"].as_shared().unwrap();
    assert!(Rc::ptr_eq(home, work));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn close_then_reopen_preserves_committed_entries() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);

    pocket.set("persisted", &sample_profile()).unwrap();
    pocket.close().unwrap();
    assert!(!pocket.is_open());

    pocket.reopen().unwrap();
    assert!(pocket.is_open());
    assert_eq!(
        pocket.get::<Profile>("persisted").unwrap(),
        Some(sample_profile())
    );
}

#[test]
fn a_fresh_session_can_reopen_an_existing_store() {
    let dir = TempDir::new().unwrap();
    {
        let mut pocket = open_pocket("data", &dir);
        pocket.set("k", &"v").unwrap();
        pocket.close().unwrap();
    }

    let pocket = open_pocket("data", &dir);
    assert_eq!(pocket.get::<String>("k").unwrap().as_deref(), Some("v"));
}

#[test]
fn opening_into_a_missing_directory_fails_without_panicking() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does").join("not").join("exist");

    let mut pocket = Pocket::new();
    let err = pocket.open("data", &missing).unwrap_err();
    assert!(!err.is_usage());
    assert!(!pocket.is_open());
    assert_eq!(pocket.name(), None);

    // The session is still usable once the environment is fixed.
    std::fs::create_dir_all(&missing).unwrap();
    pocket.open("data", &missing).unwrap();
    assert!(pocket.is_open());
}

#[test]
fn opening_an_open_pocket_is_a_soft_no_op() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);
    pocket.set("k", &1u8).unwrap();

    let err = pocket.open("other", dir.path()).unwrap_err();
    assert!(matches!(err, PocketError::AlreadyOpen { .. }));
    assert!(err.is_usage());

    // Existing session untouched.
    assert_eq!(pocket.name(), Some("data"));
    assert_eq!(pocket.get::<u8>("k").unwrap(), Some(1));
}

#[test]
fn operations_on_a_closed_pocket_are_soft_errors() {
    let dir = TempDir::new().unwrap();
    let mut pocket = open_pocket("data", &dir);
    pocket.set("k", &1u8).unwrap();
    pocket.close().unwrap();

    assert!(matches!(
        pocket.get::<u8>("k"),
        Err(PocketError::NotOpen { .. })
    ));
    assert!(matches!(
        pocket.set("k", &2u8),
        Err(PocketError::NotOpen { .. })
    ));
    assert!(matches!(
        pocket.delete("k"),
        Err(PocketError::NotOpen { .. })
    ));
    assert!(matches!(
        pocket.has_key("k"),
        Err(PocketError::NotOpen { .. })
    ));
    assert!(matches!(
        pocket.list_keys(),
        Err(PocketError::NotOpen { .. })
    ));
    assert!(matches!(
        pocket.close(),
        Err(PocketError::NotOpen { .. })
    ));
    assert!(pocket.get::<u8>("k").unwrap_err().is_usage());
}

#[test]
fn not_open_takes_precedence_over_key_validation() {
    let mut pocket = Pocket::new();
    assert!(matches!(
        pocket.set("", &1u8),
        Err(PocketError::NotOpen { .. })
    ));
}

#[test]
fn reopen_without_a_recorded_identity_fails() {
    let mut pocket = Pocket::new();
    assert!(matches!(
        pocket.reopen(),
        Err(PocketError::OpenFailed { .. })
    ));
}

#[test]
fn a_second_session_cannot_open_a_held_store() {
    let dir = TempDir::new().unwrap();
    let _held = open_pocket("data", &dir);

    let mut second = Pocket::new();
    let err = second.open("data", dir.path()).unwrap_err();
    assert!(matches!(err, PocketError::StoreLocked { .. }));
    assert!(!second.is_open());
}

// =============================================================================
// Registry
// =============================================================================

#[test]
fn deleted_stores_disappear_from_the_listing() {
    let dir = TempDir::new().unwrap();
    {
        let mut a = open_pocket("alpha", &dir);
        a.set("k", &1u8).unwrap();
        a.close().unwrap();
        open_pocket("beta", &dir).close().unwrap();
    }

    assert_eq!(list_stores(dir.path()), vec!["alpha", "beta"]);

    let removed = delete_store("alpha", dir.path());
    assert!(removed.complete());
    assert_eq!(list_stores(dir.path()), vec!["beta"]);
}
