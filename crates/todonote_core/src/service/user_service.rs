//! User use-case service.
//!
//! # Responsibility
//! - Register, look up, update and remove users.
//! - Validate time-zone labels before they reach the store.
//! - Resolve the display zone for a request.
//!
//! # Invariants
//! - A stored user's `time_zone` is always a registry label.
//! - Updates only ever change the time zone.
//! - Removing a user leaves that user's notes in place.

use crate::cancel::CancelToken;
use crate::model::time_zone::{validate, TimeZone, UnknownTimeZone};
use crate::model::user::{NewUser, User, UserUpdate};
use crate::model::Id;
use crate::repo::{EntityKind, UserRepository};
use crate::service::{map_repo_error, ServiceResult};
use log::{info, warn};

/// User service facade over repository implementations.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Registers a user and returns the assigned id.
    ///
    /// # Errors
    /// - `InvalidTimeZone` for a non-empty label outside the registry.
    /// - `AlreadyExists` when the name is taken.
    pub fn create(&self, cancel: &CancelToken, new_user: NewUser) -> ServiceResult<Id> {
        let zone = parse_zone(&new_user.time_zone)?.unwrap_or_default();
        let user = User::new(0, new_user.name, new_user.password_hash, zone.label());

        let id = self
            .repo
            .insert(cancel, &user)
            .map_err(|err| map_repo_error(err, EntityKind::User, 0, 0, "user_create"))?;
        info!("event=user_create module=service status=ok user_id={id} zone={zone}");
        Ok(id)
    }

    pub fn find_by_id(&self, cancel: &CancelToken, id: Id) -> ServiceResult<User> {
        self.repo
            .get_by_id(cancel, id)
            .map_err(|err| map_repo_error(err, EntityKind::User, id, id, "user_find"))
    }

    pub fn find_by_name(&self, cancel: &CancelToken, name: &str) -> ServiceResult<User> {
        self.repo
            .get_by_name(cancel, name)
            .map_err(|err| map_repo_error(err, EntityKind::User, 0, 0, "user_find_by_name"))
    }

    /// Applies a partial update. An absent or empty zone keeps the stored one.
    pub fn update(&self, cancel: &CancelToken, update: UserUpdate) -> ServiceResult<()> {
        let zone = match update.time_zone.as_deref() {
            Some(label) => parse_zone(label)?,
            None => None,
        };

        let mut user = self.find_by_id(cancel, update.id)?;
        let Some(zone) = zone else {
            return Ok(());
        };
        if user.time_zone == zone.label() {
            return Ok(());
        }
        user.time_zone = zone.label().to_string();

        self.repo
            .update(cancel, &user)
            .map_err(|err| map_repo_error(err, EntityKind::User, user.id, user.id, "user_update"))?;
        info!(
            "event=user_update module=service status=ok user_id={} zone={}",
            user.id, zone
        );
        Ok(())
    }

    /// Removes a user record. Notes owned by the user are not touched.
    pub fn remove(&self, cancel: &CancelToken, id: Id) -> ServiceResult<()> {
        self.repo
            .delete(cancel, id)
            .map_err(|err| map_repo_error(err, EntityKind::User, id, id, "user_delete"))?;
        info!("event=user_delete module=service status=ok user_id={id}");
        Ok(())
    }

    /// Picks the display zone for one request.
    ///
    /// A valid `requested` label wins. Otherwise the user's stored zone is
    /// used, and `UTC` when that is unreadable too.
    pub fn resolve_zone(
        &self,
        cancel: &CancelToken,
        user_id: Id,
        requested: Option<&str>,
    ) -> ServiceResult<TimeZone> {
        if let Some(zone) = requested.and_then(validate) {
            return Ok(zone);
        }

        let user = self.find_by_id(cancel, user_id)?;
        match validate(&user.time_zone) {
            Some(zone) => Ok(zone),
            None => {
                warn!(
                    "event=zone_fallback module=service status=degraded user_id={user_id} fallback=UTC"
                );
                Ok(TimeZone::utc())
            }
        }
    }
}

/// `Ok(None)` for a blank label, the registry entry otherwise.
fn parse_zone(label: &str) -> Result<Option<TimeZone>, UnknownTimeZone> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed.parse().map(Some)
}
