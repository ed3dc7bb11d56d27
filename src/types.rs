use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::Serialize;
use std::fmt;

/// A day on the calendar, without time component.
pub type CalendarDate = NaiveDate;

/// Month currently shown by the calendar. `month` is zero based (0 = January).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarCursor {
    pub year: i32,
    pub month: u32,
}

impl CalendarCursor {
    pub fn containing(date: CalendarDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    pub fn previous(self) -> Self {
        match self.month {
            0 => Self {
                year: self.year - 1,
                month: 11,
            },
            month => Self {
                year: self.year,
                month: month - 1,
            },
        }
    }

    pub fn next(self) -> Self {
        match self.month {
            11 => Self {
                year: self.year + 1,
                month: 0,
            },
            month => Self {
                year: self.year,
                month: month + 1,
            },
        }
    }

    pub fn date(self, day: u32) -> Option<CalendarDate> {
        NaiveDate::from_ymd_opt(self.year, self.month + 1, day)
    }
}

/// Recurring non-working day, identical every year. `month` is zero based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Holiday {
    pub month: u32,
    pub day: u32,
}

impl Holiday {
    pub const fn new(month: u32, day: u32) -> Self {
        Self { month, day }
    }

    pub fn matches(&self, date: CalendarDate) -> bool {
        self.month == date.month0() && self.day == date.day()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TimeSlot(pub String);

impl TimeSlot {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TimeSlot {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub enum WizardStep {
    GarageInfo = 1,
    Schedule = 2,
    Confirmation = 3,
}

impl WizardStep {
    pub fn next(self) -> Option<Self> {
        match self {
            WizardStep::GarageInfo => Some(WizardStep::Schedule),
            WizardStep::Schedule => Some(WizardStep::Confirmation),
            WizardStep::Confirmation => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            WizardStep::GarageInfo => None,
            WizardStep::Schedule => Some(WizardStep::GarageInfo),
            WizardStep::Confirmation => Some(WizardStep::Schedule),
        }
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step as u8
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

/// Garage details captured when leaving the first step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GarageInfo {
    pub name: String,
    pub manager_name: String,
    pub address: String,
    pub postal_code: String,
    pub city: String,
    pub phone: String,
    pub siret: String,
    pub email: String,
    pub email_verified: bool,
}

/// Values shown on the confirmation step, computed when leaving the schedule step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmationDetails {
    pub garage_name: String,
    pub manager_name: String,
    pub dates: Vec<String>,
    pub time: TimeSlot,
    pub service: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookingSummary {
    pub reference: String,
    pub garage_info: GarageInfo,
    pub dates: Vec<CalendarDate>,
    pub time: TimeSlot,
    pub confirmed_at: DateTime<Local>,
    pub payment_link: String,
    pub payment_due: CalendarDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayKind {
    Today,
    Disabled,
    Selected,
    Normal,
}

/// Every classification that applies to a single day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DayStatus {
    pub today: bool,
    pub past: bool,
    pub holiday: bool,
    pub weekend: bool,
    pub selected: bool,
}

impl DayStatus {
    pub fn is_disabled(&self) -> bool {
        self.past || self.weekend || self.holiday
    }

    /// Single visual state, `today` first, then disabled, then selected.
    pub fn kind(&self) -> DayKind {
        if self.today {
            DayKind::Today
        } else if self.is_disabled() {
            DayKind::Disabled
        } else if self.selected {
            DayKind::Selected
        } else {
            DayKind::Normal
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: CalendarDate,
    pub day: u32,
    pub status: DayStatus,
    pub kind: DayKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub title: String,
    pub cursor: CalendarCursor,
    pub weekday_header: Vec<&'static str>,
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cursor_wraps_year_on_both_ends() {
        let january = CalendarCursor {
            year: 2024,
            month: 0,
        };
        assert_eq!(
            january.previous(),
            CalendarCursor {
                year: 2023,
                month: 11
            }
        );
        assert_eq!(january.previous().next(), january);

        let december = CalendarCursor {
            year: 2024,
            month: 11,
        };
        assert_eq!(
            december.next(),
            CalendarCursor {
                year: 2025,
                month: 0
            }
        );
    }

    #[test]
    fn step_transitions_do_not_skip() {
        assert_eq!(WizardStep::GarageInfo.next(), Some(WizardStep::Schedule));
        assert_eq!(WizardStep::Confirmation.next(), None);
        assert_eq!(WizardStep::GarageInfo.previous(), None);
        assert_eq!(
            serde_json::to_string(&WizardStep::Confirmation).unwrap(),
            "3"
        );
    }

    #[test]
    fn today_wins_over_disabled() {
        let status = DayStatus {
            today: true,
            weekend: true,
            ..Default::default()
        };
        assert!(status.is_disabled());
        assert_eq!(status.kind(), DayKind::Today);

        let status = DayStatus {
            holiday: true,
            selected: true,
            ..Default::default()
        };
        assert_eq!(status.kind(), DayKind::Disabled);
    }
}
