use crate::entities::sea_orm_active_enums::UserRole;
use crate::entities::{prelude::*, *};
use crate::services::error::UploadError;
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

/// The authenticated caller of a core operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl Principal {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Owners and admins may act on a trip and everything under it.
    pub fn can_access(&self, trip: &trips::Model) -> bool {
        trip.user_id == self.user_id || self.is_admin()
    }
}

impl From<&users::Model> for Principal {
    fn from(user: &users::Model) -> Self {
        Self::new(user.id, user.role)
    }
}

/// Loads a trip and one of its segments on behalf of `principal`.
///
/// A missing trip, a missing segment, or a segment of another trip is NotFound.
/// A trip owned by someone else is Forbidden unless the principal is an admin.
pub async fn load_trip_segment<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    trip_id: Uuid,
    segment_id: Uuid,
) -> Result<(trips::Model, segments::Model), UploadError> {
    let trip = Trips::find_by_id(trip_id)
        .one(db)
        .await?
        .ok_or(UploadError::NotFound("Trip or segment"))?;
    let segment = Segments::find_by_id(segment_id)
        .one(db)
        .await?
        .filter(|segment| segment.trip_id == trip.id)
        .ok_or(UploadError::NotFound("Trip or segment"))?;

    if !principal.can_access(&trip) {
        tracing::warn!(
            "User {} denied access to trip {} owned by {}",
            principal.user_id,
            trip.id,
            trip.user_id
        );
        return Err(UploadError::Forbidden);
    }

    Ok((trip, segment))
}

/// Loads a segment and its trip on behalf of `principal`.
pub async fn load_segment<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    segment_id: Uuid,
) -> Result<(segments::Model, trips::Model), UploadError> {
    let segment = Segments::find_by_id(segment_id)
        .one(db)
        .await?
        .ok_or(UploadError::NotFound("Segment"))?;
    let trip = Trips::find_by_id(segment.trip_id)
        .one(db)
        .await?
        .ok_or(UploadError::NotFound("Trip"))?;

    if !principal.can_access(&trip) {
        return Err(UploadError::Forbidden);
    }

    Ok((segment, trip))
}

/// Checks that `principal` may read or write an upload session.
pub async fn authorize_session<C: ConnectionTrait>(
    db: &C,
    principal: &Principal,
    session: &upload_sessions::Model,
) -> Result<(), UploadError> {
    let trip = Trips::find_by_id(session.trip_id)
        .one(db)
        .await?
        .ok_or(UploadError::NotFound("Upload"))?;

    if !principal.can_access(&trip) {
        return Err(UploadError::Forbidden);
    }
    Ok(())
}
