use std::sync::Arc;

use rostra::{
    Identity, InMemoryStores, Profile, ProfilePatch, Role, RostraEngine, RostraError, UserId,
    Court,
};

fn engine() -> RostraEngine {
    let stores = InMemoryStores::default();
    RostraEngine::new(
        Arc::new(stores.profiles),
        Arc::new(stores.testimonies),
        Court::new(193),
    )
}

fn expect_permission_denied(result: Result<impl std::fmt::Debug, RostraError>) {
    match result {
        Err(err) if err.is_permission_denied() => {}
        Err(err) => panic!("expected permission denied, got {err:?}"),
        Ok(value) => panic!("expected permission denied, got {value:?}"),
    }
}

#[test]
fn sets_the_full_name_for_new_users() {
    let engine = engine();
    let user = Identity::new("new-user");

    let err = engine.get_profile(Some(&user), &user.uid).unwrap_err();
    assert!(err.is_not_found());

    engine
        .create_profile(
            Some(&user),
            &user.uid,
            Profile::new().with_full_name("Conan O'Brien"),
        )
        .unwrap();

    let profile = engine.get_profile(Some(&user), &user.uid).unwrap();
    assert_eq!(profile.full_name.as_deref(), Some("Conan O'Brien"));
    assert_eq!(profile.role, None);
}

#[test]
fn profile_is_created_exactly_once() {
    let engine = engine();
    let user = Identity::new("u1");

    engine
        .create_profile(Some(&user), &user.uid, Profile::new())
        .unwrap();

    let err = engine
        .create_profile(Some(&user), &user.uid, Profile::new())
        .unwrap_err();
    assert!(err.is_conflicting_state(), "second create must conflict, got {err:?}");
}

#[test]
fn cannot_create_profile_at_someone_elses_key() {
    let engine = engine();
    let user1 = Identity::new("u1");
    let user2_key = UserId::new("u2");

    expect_permission_denied(engine.create_profile(Some(&user1), &user2_key, Profile::new()));
}

#[test]
fn unauthenticated_create_is_denied() {
    let engine = engine();
    expect_permission_denied(engine.create_profile(None, &UserId::new("u1"), Profile::new()));
}

#[test]
fn is_publicly_readable_when_public() {
    let engine = engine();
    let user1 = Identity::new("u1");
    let user2 = Identity::new("u2");

    engine
        .create_profile(Some(&user1), &user1.uid, Profile::new())
        .unwrap();
    engine
        .update_profile(Some(&user1), &user1.uid, &ProfilePatch::new().public(true))
        .unwrap();

    assert!(engine.get_profile(Some(&user1), &user1.uid).is_ok());
    assert!(engine.get_profile(Some(&user2), &user1.uid).is_ok());
    // Even unauthenticated readers see public profiles.
    assert!(engine.get_profile(None, &user1.uid).is_ok());
}

#[test]
fn is_not_publicly_readable_when_not_public() {
    let engine = engine();
    let user1 = Identity::new("u1");
    let user2 = Identity::new("u2");

    engine
        .create_profile(Some(&user1), &user1.uid, Profile::new())
        .unwrap();
    engine
        .update_profile(Some(&user1), &user1.uid, &ProfilePatch::new().public(false))
        .unwrap();

    expect_permission_denied(engine.get_profile(Some(&user2), &user1.uid));
    expect_permission_denied(engine.get_profile(None, &user1.uid));
}

#[test]
fn is_readable_when_not_public_by_own_user() {
    let engine = engine();
    let user1 = Identity::new("u1");

    engine
        .create_profile(Some(&user1), &user1.uid, Profile::new())
        .unwrap();

    let profile = engine.get_profile(Some(&user1), &user1.uid).unwrap();
    assert!(!profile.public);
}

#[test]
fn public_toggle_round_trip() {
    let engine = engine();
    let a = Identity::new("user-a");
    let b = Identity::new("user-b");

    // A creates a profile with default visibility.
    engine
        .create_profile(Some(&a), &a.uid, Profile::new().with_full_name("X"))
        .unwrap();

    // B cannot read it.
    expect_permission_denied(engine.get_profile(Some(&b), &a.uid));

    // A makes it public; B can now read it and sees the document.
    engine
        .update_profile(Some(&a), &a.uid, &ProfilePatch::new().public(true))
        .unwrap();
    let visible = engine.get_profile(Some(&b), &a.uid).unwrap();
    assert_eq!(visible.full_name.as_deref(), Some("X"));

    // A makes it private again; B is shut out again.
    engine
        .update_profile(Some(&a), &a.uid, &ProfilePatch::new().public(false))
        .unwrap();
    expect_permission_denied(engine.get_profile(Some(&b), &a.uid));
}

#[test]
fn can_only_be_modified_by_the_logged_in_user() {
    let engine = engine();
    let owner = Identity::new("owner");
    let other = Identity::new("other");

    engine
        .create_profile(Some(&owner), &owner.uid, Profile::new())
        .unwrap();

    expect_permission_denied(engine.update_profile(
        Some(&other),
        &owner.uid,
        &ProfilePatch::new().full_name("test"),
    ));
    expect_permission_denied(engine.update_profile(
        None,
        &owner.uid,
        &ProfilePatch::new().full_name("test"),
    ));

    let updated = engine
        .update_profile(Some(&owner), &owner.uid, &ProfilePatch::new().full_name("test"))
        .unwrap();
    assert_eq!(updated.full_name.as_deref(), Some("test"));
}

#[test]
fn does_not_allow_deleting_the_profile_or_changing_the_role() {
    let engine = engine();
    let owner = Identity::new("owner");

    engine
        .create_profile(Some(&owner), &owner.uid, Profile::new())
        .unwrap();

    expect_permission_denied(engine.update_profile(
        Some(&owner),
        &owner.uid,
        &ProfilePatch::new().role(Role::Admin),
    ));
    expect_permission_denied(engine.delete_profile(Some(&owner), &owner.uid));
}

#[test]
fn role_change_is_denied_even_alongside_other_edits() {
    let engine = engine();
    let owner = Identity::new("owner");

    engine
        .create_profile(Some(&owner), &owner.uid, Profile::new())
        .unwrap();

    expect_permission_denied(engine.update_profile(
        Some(&owner),
        &owner.uid,
        &ProfilePatch::new()
            .full_name("still me")
            .public(true)
            .role(Role::Legislator),
    ));

    // The failed write must not have partially applied.
    let profile = engine.get_profile(Some(&owner), &owner.uid).unwrap();
    assert_eq!(profile.full_name, None);
    assert!(!profile.public);
    assert_eq!(profile.role, None);
}

#[test]
fn create_cannot_smuggle_a_role() {
    let engine = engine();
    let user = Identity::new("u1");

    expect_permission_denied(engine.create_profile(
        Some(&user),
        &user.uid,
        Profile {
            role: Some(Role::Admin),
            ..Profile::new()
        },
    ));
}

#[test]
fn admin_assigns_role_and_owner_keeps_it() {
    let engine = engine();
    let owner = Identity::new("owner");
    let admin = Identity::new("admin").with_role(Role::Admin);

    engine
        .create_profile(Some(&owner), &owner.uid, Profile::new())
        .unwrap();

    let assigned = engine
        .assign_role(&admin, &owner.uid, Role::Organization)
        .unwrap();
    assert_eq!(assigned.role, Some(Role::Organization));

    // Owner updates keep flowing, and the role sticks.
    let updated = engine
        .update_profile(Some(&owner), &owner.uid, &ProfilePatch::new().email("o@example.com"))
        .unwrap();
    assert_eq!(updated.role, Some(Role::Organization));

    // A non-admin cannot use the assignment path.
    expect_permission_denied(engine.assign_role(&owner, &owner.uid, Role::Admin));
}

#[test]
fn absence_and_denial_stay_distinct() {
    let engine = engine();
    let owner = Identity::new("owner");
    let other = Identity::new("other");

    // Absent profile: not found for everyone, including third parties.
    let err = engine.get_profile(Some(&other), &owner.uid).unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_permission_denied());

    // Existing private profile: denial, never downgraded to not-found.
    engine
        .create_profile(Some(&owner), &owner.uid, Profile::new())
        .unwrap();
    let err = engine.get_profile(Some(&other), &owner.uid).unwrap_err();
    assert!(err.is_permission_denied());
    assert!(!err.is_not_found());
}
