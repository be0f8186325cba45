//! CLI smoke entry point.
//!
//! # Responsibility
//! - Wire configuration, logging and the configured store backend.
//! - Run a short create/list/convert probe and print the outcome.

use log::info;
use std::process::ExitCode;
use std::sync::Arc;
use todonote_core::{
    core_version, init_logging, open_db_with_retry, share, validate, Backend, CancelToken,
    CoreConfig, FindParams, InMemoryNoteRepository, NewNote, NoteFilter, NoteRepository,
    NoteService, SqliteNoteRepository, TimeZone,
};

const PROBE_USER_ID: i64 = 1;
const PROBE_ZONE: &str = "UTC+3";

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("todonote: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = CoreConfig::from_env().map_err(|err| err.to_string())?;
    if let Some(log_dir) = config.log_dir.as_ref() {
        init_logging(&config.log_level, log_dir).map_err(|err| err.to_string())?;
    }
    println!("todonote_core version={}", core_version());
    println!("backend={}", config.backend);

    let cancel = CancelToken::new();
    let repo: Arc<dyn NoteRepository + Send + Sync> = match config.backend {
        Backend::Memory => Arc::new(InMemoryNoteRepository::new()),
        Backend::Sqlite => {
            let path = config
                .db_path
                .as_ref()
                .ok_or_else(|| "sqlite backend requires a database path".to_string())?;
            let conn = open_db_with_retry(path, &cancel).map_err(|err| err.to_string())?;
            Arc::new(SqliteNoteRepository::try_new(share(conn)).map_err(|err| err.to_string())?)
        }
    };

    probe(&NoteService::new(repo), &cancel).map_err(|err| err.to_string())
}

fn probe<R: NoteRepository>(
    service: &NoteService<R>,
    cancel: &CancelToken,
) -> Result<(), todonote_core::ServiceError> {
    let id = service.create_note(
        cancel,
        PROBE_USER_ID,
        NewNote {
            title: "probe".to_string(),
            text: "smoke check".to_string(),
            date: None,
        },
    )?;

    let zone = validate(PROBE_ZONE).unwrap_or_else(TimeZone::utc);
    let notes = service.find_all(
        cancel,
        FindParams {
            filter: NoteFilter::for_user(PROBE_USER_ID),
            zone,
        },
    )?;
    let created = service.find_note(cancel, id, PROBE_USER_ID, zone)?;

    info!(
        "event=cli_probe module=cli status=ok note_id={} listed={}",
        id,
        notes.len()
    );
    println!("created note id={id}");
    println!("listed {} note(s) for user {PROBE_USER_ID}", notes.len());
    println!("note date in {zone}: {}", created.date.to_rfc3339());
    Ok(())
}
