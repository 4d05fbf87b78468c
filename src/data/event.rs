//! Hazard event records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::CellValue;

/// Attribute holding the until-further-notice flag.
pub const UNTIL_FURTHER_NOTICE_ATTRIBUTE: &str = "untilFurtherNotice";

/// Attribute holding the headline text.
pub const HEADLINE_ATTRIBUTE: &str = "headline";

/// End time used while an event runs until further notice.
pub const UNTIL_FURTHER_NOTICE_TIME: i64 = i64::MAX;

/// Lifecycle status of a hazard event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    /// Recommended but not yet taken up.
    Potential,
    /// Being worked on.
    #[default]
    Pending,
    /// Proposed for issuance.
    Proposed,
    /// Issued to the public.
    Issued,
    /// Issued and about to expire.
    Elapsing,
    /// An ending has been requested but not issued.
    Ending,
    /// Ended by a forecaster.
    Ended,
    /// Expired on its own.
    Elapsed,
}

impl EventStatus {
    /// Status name as shown in the console.
    pub fn name(self) -> &'static str {
        match self {
            Self::Potential => "potential",
            Self::Pending => "pending",
            Self::Proposed => "proposed",
            Self::Issued => "issued",
            Self::Elapsing => "elapsing",
            Self::Ending => "ending",
            Self::Ended => "ended",
            Self::Elapsed => "elapsed",
        }
    }

    /// Whether the event is finished and can no longer change.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Ended | Self::Elapsed)
    }

    /// Whether the event is on its way out (ending or finished).
    pub fn is_ending_or_finished(self) -> bool {
        matches!(self, Self::Ending | Self::Ended | Self::Elapsed)
    }
}

/// Closed time interval `[start, end]` in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    /// Lower bound.
    pub start: i64,
    /// Upper bound.
    pub end: i64,
}

impl TimeRange {
    /// Create a range.
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Degenerate range holding a single instant.
    pub fn point(at: i64) -> Self {
        Self { start: at, end: at }
    }

    /// Whether `at` lies within the range, bounds included.
    pub fn contains(&self, at: i64) -> bool {
        self.start <= at && at <= self.end
    }

    /// Whether the range is well formed.
    pub fn is_ordered(&self) -> bool {
        self.start <= self.end
    }

    /// Length of the interval.
    pub fn duration(&self) -> i64 {
        self.end.saturating_sub(self.start)
    }
}

/// Granularity of time edits for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeResolution {
    /// Whole minutes.
    #[default]
    Minutes,
    /// Whole seconds.
    Seconds,
}

impl TimeResolution {
    /// Size of one step in milliseconds.
    pub fn step_millis(self) -> i64 {
        match self {
            Self::Minutes => 60_000,
            Self::Seconds => 1_000,
        }
    }
}

/// RGB display color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Color {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Color {
    /// Create a color from its channels.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// One version of a hazard event as held by the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HazardEvent {
    /// Stable identifier shared by every version.
    pub event_id: String,
    /// Identifier shown to users, when it differs from `event_id`.
    #[serde(default)]
    pub display_event_id: Option<String>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: EventStatus,
    /// Start of the valid period.
    pub start_time: i64,
    /// End of the valid period.
    pub end_time: i64,
    /// Phenomenon code, e.g. `FF`.
    #[serde(default)]
    pub phenomenon: Option<String>,
    /// Significance code, e.g. `W`.
    #[serde(default)]
    pub significance: Option<String>,
    /// Optional subtype, e.g. `Convective`.
    #[serde(default)]
    pub subtype: Option<String>,
    /// Creation instant.
    #[serde(default)]
    pub creation_time: i64,
    /// Instant this version was persisted; only set on historical versions.
    #[serde(default)]
    pub insert_time: Option<i64>,
    /// Issuing site.
    #[serde(default)]
    pub site_id: Option<String>,
    /// Workstation that last touched the event.
    #[serde(default)]
    pub workstation: Option<String>,
    /// User that last touched the event.
    #[serde(default)]
    pub user_name: Option<String>,
    /// Whether there are local modifications not yet persisted.
    #[serde(default)]
    pub modified: bool,
    /// Free-form hazard attributes.
    #[serde(default)]
    pub attributes: BTreeMap<String, CellValue>,
}

impl HazardEvent {
    /// Create a pending event with the given valid period.
    pub fn new(event_id: impl Into<String>, start_time: i64, end_time: i64) -> Self {
        Self {
            event_id: event_id.into(),
            display_event_id: None,
            status: EventStatus::Pending,
            start_time,
            end_time,
            phenomenon: None,
            significance: None,
            subtype: None,
            creation_time: 0,
            insert_time: None,
            site_id: None,
            workstation: None,
            user_name: None,
            modified: false,
            attributes: BTreeMap::new(),
        }
    }

    /// Identifier shown to users.
    pub fn display_id(&self) -> &str {
        self.display_event_id.as_deref().unwrap_or(&self.event_id)
    }

    /// Hazard type in `PHEN.SIG[.SUBTYPE]` form, if the event has one.
    pub fn hazard_type(&self) -> Option<String> {
        let phenomenon = self.phenomenon.as_deref()?;
        let mut hazard_type = match self.significance.as_deref() {
            Some(significance) => format!("{}.{}", phenomenon, significance),
            None => phenomenon.to_string(),
        };
        if let Some(subtype) = self.subtype.as_deref() {
            hazard_type.push('.');
            hazard_type.push_str(subtype);
        }
        Some(hazard_type)
    }

    /// Valid period.
    pub fn time_range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    /// Whether the end time is currently "until further notice".
    pub fn is_until_further_notice(&self) -> bool {
        self.attributes
            .get(UNTIL_FURTHER_NOTICE_ATTRIBUTE)
            .and_then(CellValue::as_boolean)
            .unwrap_or(false)
    }

    /// Headline text, if any.
    pub fn headline(&self) -> Option<&str> {
        self.attributes
            .get(HEADLINE_ATTRIBUTE)
            .and_then(CellValue::as_text)
    }

    /// Builder-style helper setting the hazard type codes.
    pub fn with_type(
        mut self,
        phenomenon: impl Into<String>,
        significance: Option<&str>,
        subtype: Option<&str>,
    ) -> Self {
        self.phenomenon = Some(phenomenon.into());
        self.significance = significance.map(str::to_string);
        self.subtype = subtype.map(str::to_string);
        self
    }

    /// Builder-style helper setting the status.
    pub fn with_status(mut self, status: EventStatus) -> Self {
        self.status = status;
        self
    }

    /// Builder-style helper setting one attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}
