use crate::types::{CalendarCursor, CalendarDate, Holiday};
use chrono::{Datelike, Duration, Weekday};

const MONTH_NAMES: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

const WEEKDAY_NAMES: [&str; 7] = [
    "lundi", "mardi", "mercredi", "jeudi", "vendredi", "samedi", "dimanche",
];

/// Calendar header, Monday first.
pub const WEEKDAY_HEADER: [&str; 7] = ["Lun", "Mar", "Mer", "Jeu", "Ven", "Sam", "Dim"];

pub fn is_same_date(first: CalendarDate, second: CalendarDate) -> bool {
    first.year() == second.year() && first.month() == second.month() && first.day() == second.day()
}

pub fn is_holiday(date: CalendarDate, holidays: &[Holiday]) -> bool {
    holidays.iter().any(|holiday| holiday.matches(date))
}

pub fn is_weekend(date: CalendarDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

pub fn add_days(date: CalendarDate, days: i64) -> CalendarDate {
    date.checked_add_signed(Duration::days(days)).unwrap_or(date)
}

/// Day before the first of the following month.
pub fn days_in_month(cursor: CalendarCursor) -> u32 {
    cursor
        .next()
        .date(1)
        .and_then(|first| first.pred_opt())
        .map_or(31, |last| last.day())
}

/// Empty cells before the first day in a Monday-first grid.
pub fn leading_blank_cells(cursor: CalendarCursor) -> u32 {
    match cursor.date(1) {
        // 0 = Sunday .. 6 = Saturday
        Some(first) => match first.weekday().num_days_from_sunday() {
            0 => 6,
            weekday => weekday - 1,
        },
        None => 0,
    }
}

/// Long French form without year, e.g. `lundi 15 janvier`.
pub fn format_date(date: CalendarDate) -> String {
    let weekday = WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize];
    let month = MONTH_NAMES[date.month0() as usize].to_lowercase();
    format!("{weekday} {} {month}", date.day())
}

pub fn format_month_title(cursor: CalendarCursor) -> String {
    let month = MONTH_NAMES.get(cursor.month as usize).unwrap_or(&"");
    format!("{month} {}", cursor.year)
}

pub fn format_duration(minutes: u32) -> String {
    format!("{}h{:02}", minutes / 60, minutes % 60)
}
