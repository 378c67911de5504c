use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::bookings::{BookingDetailsEntity, BookingEntity},
    value_objects::enums::booking_statuses::BookingStatus,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingModel {
    pub id: Uuid,
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_price: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BookingEntity> for BookingModel {
    type Error = anyhow::Error;

    fn try_from(value: BookingEntity) -> Result<Self, Self::Error> {
        let status = BookingStatus::parse(&value.status).ok_or_else(|| {
            anyhow!(
                "booking {} has unknown stored status {:?}",
                value.id,
                value.status
            )
        })?;

        Ok(Self {
            id: value.id,
            place_id: value.place_id,
            user_id: value.user_id,
            start_time: value.start_time,
            end_time: value.end_time,
            total_price: value.total_price,
            status,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

/// Who is asking. Owners act on their own bookings, admins on any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingRequester {
    pub user_id: Uuid,
    pub is_admin: bool,
}

impl BookingRequester {
    pub fn owner(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: false,
        }
    }

    pub fn admin(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_admin: true,
        }
    }

    pub fn may_act_for(&self, owner_id: Uuid) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

/// Request body for a new booking. Times use the `YYYY-MM-DD HH` wire format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateBookingModel {
    pub place_id: Uuid,
    pub start_time: String,
    pub end_time: String,
}

/// Partial update. `user_id` is the administrative reassignment path.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateBookingModel {
    pub user_id: Option<Uuid>,
    pub place_id: Option<Uuid>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl UpdateBookingModel {
    pub fn is_empty(&self) -> bool {
        self.user_id.is_none()
            && self.place_id.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
    }

    pub fn moves_slot(&self) -> bool {
        self.place_id.is_some() || self.start_time.is_some() || self.end_time.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransitionStatusModel {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceSummaryModel {
    pub id: Uuid,
    pub name: String,
    pub hourly_rate: i64,
    pub active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserSummaryModel {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDetailsModel {
    #[serde(flatten)]
    pub booking: BookingModel,
    pub place: PlaceSummaryModel,
    pub user: UserSummaryModel,
}

impl TryFrom<BookingDetailsEntity> for BookingDetailsModel {
    type Error = anyhow::Error;

    fn try_from(value: BookingDetailsEntity) -> Result<Self, Self::Error> {
        Ok(Self {
            booking: BookingModel::try_from(value.booking)?,
            place: PlaceSummaryModel {
                id: value.place.id,
                name: value.place.name,
                hourly_rate: value.place.price_per_hour,
                active: value.place.is_active,
            },
            user: UserSummaryModel {
                id: value.user.id,
                first_name: value.user.first_name,
                last_name: value.user.last_name,
                balance: value.user.balance,
            },
        })
    }
}
