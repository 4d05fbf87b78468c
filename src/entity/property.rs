//! Derived entity properties.
//!
//! The first-class event fields that show up as table cells are enumerated
//! here, each with its column identifier and accessor.

use crate::data::{CellValue, HazardEvent};
use crate::store::LockStatus;

/// What a property accessor can look at.
#[derive(Debug, Clone, Copy)]
pub struct PropertySource<'a> {
    /// Event version being displayed.
    pub event: &'a HazardEvent,
    /// Lock held on the event.
    pub lock_status: &'a LockStatus,
}

/// A derived cell placed into every entity's attribute map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityProperty {
    /// Identifier shown to users.
    DisplayId,
    /// Lock description.
    LockStatus,
    /// Phenomenon code.
    Phenomenon,
    /// Significance code.
    Significance,
    /// Subtype.
    Subtype,
    /// Full hazard type.
    Type,
    /// Headline text.
    Headline,
    /// Status name.
    Status,
    /// Start time.
    StartTime,
    /// End time.
    EndTime,
    /// Creation time.
    CreationTime,
    /// Workstation that last touched the event.
    Workstation,
    /// User that last touched the event.
    UserName,
    /// Issuing site.
    SiteId,
}

impl EntityProperty {
    /// Every property, in column order.
    pub const ALL: [Self; 14] = [
        Self::DisplayId,
        Self::LockStatus,
        Self::Phenomenon,
        Self::Significance,
        Self::Subtype,
        Self::Type,
        Self::Headline,
        Self::Status,
        Self::StartTime,
        Self::EndTime,
        Self::CreationTime,
        Self::Workstation,
        Self::UserName,
        Self::SiteId,
    ];

    /// Column identifier under which the value is stored.
    pub fn identifier(self) -> &'static str {
        match self {
            Self::DisplayId => "eventId",
            Self::LockStatus => "lockStatus",
            Self::Phenomenon => "phen",
            Self::Significance => "sig",
            Self::Subtype => "subType",
            Self::Type => "hazardType",
            Self::Headline => "headline",
            Self::Status => "status",
            Self::StartTime => "startTime",
            Self::EndTime => "endTime",
            Self::CreationTime => "creationTime",
            Self::Workstation => "workstation",
            Self::UserName => "userName",
            Self::SiteId => "siteID",
        }
    }

    /// Whether the property only applies to the current version of an event.
    pub fn is_current_only(self) -> bool {
        matches!(self, Self::LockStatus | Self::Workstation | Self::UserName)
    }

    /// Value of the property for an event version; `None` means absent.
    pub fn fetch(self, source: &PropertySource<'_>) -> Option<CellValue> {
        let event = source.event;
        match self {
            Self::DisplayId => Some(CellValue::Text(event.display_id().to_string())),
            Self::LockStatus => source.lock_status.description().map(CellValue::Text),
            Self::Phenomenon => event.phenomenon.clone().map(CellValue::Text),
            Self::Significance => event.significance.clone().map(CellValue::Text),
            Self::Subtype => event.subtype.clone().map(CellValue::Text),
            Self::Type => event.hazard_type().map(CellValue::Text),
            Self::Headline => event.headline().map(CellValue::from),
            Self::Status => Some(CellValue::from(event.status.name())),
            Self::StartTime => Some(CellValue::Date(event.start_time)),
            Self::EndTime => Some(CellValue::Date(event.end_time)),
            Self::CreationTime => Some(CellValue::Date(event.creation_time)),
            Self::Workstation => event.workstation.clone().map(CellValue::Text),
            Self::UserName => event.user_name.clone().map(CellValue::Text),
            Self::SiteId => event.site_id.clone().map(CellValue::Text),
        }
    }
}
