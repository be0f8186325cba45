use chrono::{DateTime, Duration, Timelike, Utc};
use todonote_core::{
    open_db_in_memory, share, validate, CancelToken, FilterParams, FindParams, FixedClock,
    InMemoryNoteRepository, InMemoryUserRepository, NewNote, NewUser, NoteFilter, NotePatch,
    NoteRepository, NoteService, ServiceError, SqliteNoteRepository, SqliteUserRepository,
    TimeZone, UserService,
};

fn pinned_now() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-11-05T22:15:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn sqlite_service() -> NoteService<SqliteNoteRepository, FixedClock> {
    let conn = share(open_db_in_memory().unwrap());
    NoteService::with_clock(
        SqliteNoteRepository::try_new(conn).unwrap(),
        FixedClock(pinned_now()),
    )
}

fn titled(title: &str) -> NewNote {
    NewNote {
        title: title.to_string(),
        ..NewNote::default()
    }
}

#[test]
fn created_note_is_stored_in_utc_and_shown_in_caller_zone() {
    let service = sqlite_service();
    let cancel = CancelToken::new();
    let id = service.create_note(&cancel, 1, titled("title")).unwrap();

    let stored = service.repository().get_by_id(&cancel, id).unwrap();
    assert_eq!(stored.date, pinned_now());
    assert_eq!(stored.date.offset().local_minus_utc(), 0);

    let shown = service
        .find_note(&cancel, id, 1, validate("UTC+3").unwrap())
        .unwrap();
    assert_eq!(shown.date, stored.date);
    assert_eq!(shown.date.hour(), 1);
    assert_eq!(
        shown.date.naive_local(),
        stored.date.naive_utc() + Duration::hours(3)
    );
}

#[test]
fn listing_filters_by_owner_and_uses_params() {
    let service = sqlite_service();
    let cancel = CancelToken::new();
    for n in 0..5 {
        service
            .create_note(&cancel, 1, titled(&format!("a{n}")))
            .unwrap();
    }
    for n in 0..2 {
        service
            .create_note(&cancel, 2, titled(&format!("b{n}")))
            .unwrap();
    }
    service
        .update_note(
            &cancel,
            7,
            2,
            &NotePatch {
                is_finished: true,
                ..NotePatch::default()
            },
        )
        .unwrap();

    let filter = NoteFilter::from_params(
        2,
        FilterParams {
            take_from: Some("2024-11-05T00:00:00-05:00"),
            ..FilterParams::default()
        },
    )
    .unwrap();
    let zone = validate("UTC-5").unwrap();
    let notes = service
        .find_all(&cancel, FindParams { filter, zone })
        .unwrap();
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|note| note.user_id == 2));
    assert!(notes
        .iter()
        .all(|note| note.date.offset().local_minus_utc() == -5 * 3600));

    let finished = service
        .find_all(
            &cancel,
            FindParams {
                filter: NoteFilter::for_user(2).with_is_finished(true),
                zone: TimeZone::utc(),
            },
        )
        .unwrap();
    assert_eq!(finished.len(), 1);
    assert_eq!(finished[0].id, 7);
}

#[test]
fn later_take_from_excludes_everything() {
    let service = sqlite_service();
    let cancel = CancelToken::new();
    service.create_note(&cancel, 1, titled("t")).unwrap();

    let filter = NoteFilter::for_user(1).with_take_from(
        (pinned_now() + Duration::seconds(1)).fixed_offset(),
    );
    let notes = service
        .find_all(
            &cancel,
            FindParams {
                filter,
                zone: TimeZone::utc(),
            },
        )
        .unwrap();
    assert!(notes.is_empty());
}

#[test]
fn non_owner_gets_not_found_with_full_context() {
    let service = sqlite_service();
    let cancel = CancelToken::new();
    let id = service.create_note(&cancel, 1, titled("mine")).unwrap();

    let err = service
        .find_note(&cancel, id, 2, TimeZone::utc())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("no such note found (id: {id}) for user (id: 2)")
    );

    let err = service
        .update_note(
            &cancel,
            id,
            2,
            &NotePatch {
                title: "stolen".to_string(),
                ..NotePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));
    assert_eq!(
        service.repository().get_by_id(&cancel, id).unwrap().title,
        "mine"
    );

    let err = service.find_note(&cancel, 999, 1, TimeZone::utc()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn update_merges_fields_and_never_unfinishes() {
    let service = sqlite_service();
    let cancel = CancelToken::new();
    let id = service.create_note(&cancel, 1, titled("draft")).unwrap();
    let moved = DateTime::parse_from_rfc3339("2024-12-01T10:00:00+02:00").unwrap();

    service
        .update_note(
            &cancel,
            id,
            1,
            &NotePatch {
                title: String::new(),
                text: "body".to_string(),
                date: Some(moved),
                is_finished: true,
            },
        )
        .unwrap();
    service
        .update_note(&cancel, id, 1, &NotePatch::default())
        .unwrap();

    let note = service.repository().get_by_id(&cancel, id).unwrap();
    assert_eq!(note.title, "draft");
    assert_eq!(note.text, "body");
    assert_eq!(note.date, moved);
    assert_eq!(note.date.hour(), 8);
    assert!(note.is_finished);
    assert_eq!(note.user_id, 1);
}

#[test]
fn remove_deletes_only_owned_notes() {
    let service = NoteService::with_clock(InMemoryNoteRepository::new(), FixedClock(pinned_now()));
    let cancel = CancelToken::new();
    let id = service.create_note(&cancel, 1, titled("t")).unwrap();

    assert!(service.remove_note(&cancel, id, 2).unwrap_err().is_not_found());
    service.remove_note(&cancel, id, 1).unwrap();
    assert!(service.remove_note(&cancel, id, 1).unwrap_err().is_not_found());
}

#[test]
fn user_zone_drives_display_when_request_has_none() {
    let conn = share(open_db_in_memory().unwrap());
    let users = UserService::new(SqliteUserRepository::try_new(conn.clone()).unwrap());
    let notes = NoteService::with_clock(
        SqliteNoteRepository::try_new(conn).unwrap(),
        FixedClock(pinned_now()),
    );
    let cancel = CancelToken::new();

    let user_id = users
        .create(
            &cancel,
            NewUser {
                name: "user".to_string(),
                password_hash: b"hash".to_vec(),
                time_zone: "UTC-4".to_string(),
            },
        )
        .unwrap();
    let note_id = notes.create_note(&cancel, user_id, titled("t")).unwrap();

    let zone = users.resolve_zone(&cancel, user_id, None).unwrap();
    let note = notes.find_note(&cancel, note_id, user_id, zone).unwrap();
    assert_eq!(note.date.offset().local_minus_utc(), -4 * 3600);
    assert_eq!(note.date.hour(), 18);

    let err = users.resolve_zone(&cancel, 404, None).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn seeded_memory_stores_serve_demo_account() {
    let now = pinned_now().fixed_offset();
    let notes = NoteService::new(InMemoryNoteRepository::with_seed_data(now).unwrap());
    let users = UserService::new(InMemoryUserRepository::with_seed_data(b"hash".to_vec()).unwrap());
    let cancel = CancelToken::new();

    let user = users.find_by_name(&cancel, "user").unwrap();
    let zone = users.resolve_zone(&cancel, user.id, None).unwrap();
    let listed = notes
        .find_all(
            &cancel,
            FindParams {
                filter: NoteFilter::for_user(user.id),
                zone,
            },
        )
        .unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|note| note.date == now));
}
