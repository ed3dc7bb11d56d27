use crate::{
    date_utils::{self, WEEKDAY_HEADER},
    types::{CalendarCursor, CalendarDate, CalendarDay, DayStatus, Holiday, MonthGrid, TimeSlot},
};
use chrono::Datelike;
use std::collections::BTreeSet;
use tracing::debug;

/// Visible month, selected dates and selected time slot of the scheduling step.
#[derive(Debug, Clone)]
pub struct CalendarEngine {
    cursor: CalendarCursor,
    holidays: Vec<Holiday>,
    selected_dates: BTreeSet<CalendarDate>,
    selected_time: Option<TimeSlot>,
}

impl CalendarEngine {
    /// Starts on the month containing `today`.
    pub fn new(today: CalendarDate, holidays: Vec<Holiday>) -> Self {
        Self {
            cursor: CalendarCursor::containing(today),
            holidays,
            selected_dates: BTreeSet::new(),
            selected_time: None,
        }
    }

    pub fn cursor(&self) -> CalendarCursor {
        self.cursor
    }

    pub fn go_to_previous_month(&mut self) {
        self.cursor = self.cursor.previous();
        debug!(year = self.cursor.year, month = self.cursor.month, "Calendar moved back");
    }

    pub fn go_to_next_month(&mut self) {
        self.cursor = self.cursor.next();
        debug!(year = self.cursor.year, month = self.cursor.month, "Calendar moved forward");
    }

    /// Adds `date` to the selection, or removes it when already present.
    ///
    /// Disabled dates are not rejected here; callers check [`CalendarEngine::classify_day`]
    /// first.
    pub fn toggle_date(&mut self, date: CalendarDate) {
        if !self.selected_dates.remove(&date) {
            self.selected_dates.insert(date);
        }
    }

    pub fn is_selected(&self, date: CalendarDate) -> bool {
        self.selected_dates.contains(&date)
    }

    pub fn classify_day(&self, date: CalendarDate, today: CalendarDate) -> DayStatus {
        let mut status = DayStatus {
            today: date_utils::is_same_date(date, today),
            past: date < today,
            holiday: date_utils::is_holiday(date, &self.holidays),
            weekend: date_utils::is_weekend(date),
            selected: false,
        };
        status.selected = self.is_selected(date) && !status.is_disabled();
        status
    }

    /// Replaces any previously selected slot.
    pub fn select_time_slot(&mut self, slot: TimeSlot) {
        self.selected_time = Some(slot);
    }

    pub fn selected_dates(&self) -> Vec<CalendarDate> {
        self.selected_dates.iter().copied().collect()
    }

    pub fn selected_time(&self) -> Option<TimeSlot> {
        self.selected_time.clone()
    }

    pub fn has_selection(&self) -> bool {
        !self.selected_dates.is_empty() && self.selected_time.is_some()
    }

    pub fn month_grid(&self, today: CalendarDate) -> MonthGrid {
        let days = (1..=date_utils::days_in_month(self.cursor))
            .filter_map(|day| self.cursor.date(day))
            .map(|date| {
                let status = self.classify_day(date, today);
                CalendarDay {
                    date,
                    day: date.day(),
                    status,
                    kind: status.kind(),
                }
            })
            .collect();

        MonthGrid {
            title: date_utils::format_month_title(self.cursor),
            cursor: self.cursor,
            weekday_header: WEEKDAY_HEADER.to_vec(),
            leading_blanks: date_utils::leading_blank_cells(self.cursor),
            days,
        }
    }
}
