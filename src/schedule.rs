use chrono::{Datelike, NaiveDate, NaiveTime, Timelike, Weekday};
use rand::Rng;

use crate::catalog::SchoolSession;
use crate::error::{AppError, AppResult};

pub const DAY_START: (u32, u32) = (8, 30);
pub const DAY_END: (u32, u32) = (15, 0);

/// Display order for day-of-week rows.
pub const WEEK_ORDER: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

pub fn session_from_time(time: NaiveTime) -> SchoolSession {
    if (hm(8, 30)..=hm(11, 0)).contains(&time) {
        SchoolSession::Morning
    } else if (hm(11, 1)..=hm(13, 0)).contains(&time) {
        SchoolSession::Middle
    } else if (hm(13, 1)..=hm(15, 0)).contains(&time) {
        SchoolSession::Afternoon
    } else {
        SchoolSession::OutsideHours
    }
}

/// Half-hour bucket for the day/time heatmap: 10:47 falls in "10:30".
pub fn time_slot(time: NaiveTime) -> String {
    let minute = if time.minute() < 30 { 0 } else { 30 };
    format!("{:02}:{:02}", time.hour(), minute)
}

pub fn parse_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::InvalidTime(value.to_string()))
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Truncates to the minute; incidents are recorded at minute precision.
pub fn to_minute(time: NaiveTime) -> NaiveTime {
    hm(time.hour(), time.minute())
}

pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

pub fn weekday_of(date: NaiveDate) -> Weekday {
    date.weekday()
}

/// Uniform random minute within the school day window.
pub fn random_school_time<R: Rng + ?Sized>(rng: &mut R) -> NaiveTime {
    let start = hm(DAY_START.0, DAY_START.1);
    let end = hm(DAY_END.0, DAY_END.1);
    let span = (end - start).num_seconds();
    let offset = rng.random_range(0..=span);
    to_minute(start + chrono::Duration::seconds(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sessions_follow_school_day_boundaries() {
        assert_eq!(session_from_time(hm(8, 30)), SchoolSession::Morning);
        assert_eq!(session_from_time(hm(11, 0)), SchoolSession::Morning);
        assert_eq!(session_from_time(hm(11, 1)), SchoolSession::Middle);
        assert_eq!(session_from_time(hm(13, 0)), SchoolSession::Middle);
        assert_eq!(session_from_time(hm(13, 1)), SchoolSession::Afternoon);
        assert_eq!(session_from_time(hm(15, 0)), SchoolSession::Afternoon);
        assert_eq!(session_from_time(hm(8, 29)), SchoolSession::OutsideHours);
        assert_eq!(session_from_time(hm(15, 1)), SchoolSession::OutsideHours);
    }

    #[test]
    fn time_slot_is_total_over_the_day() {
        for hour in 0..24 {
            for minute in 0..60 {
                let slot = time_slot(hm(hour, minute));
                let expected = if minute >= 30 {
                    format!("{hour:02}:30")
                } else {
                    format!("{hour:02}:00")
                };
                assert_eq!(slot, expected);
                let again = time_slot(parse_time(&slot).unwrap());
                assert_eq!(again, slot);
            }
        }
    }

    #[test]
    fn parse_time_rejects_garbage() {
        assert_eq!(parse_time("10:47").unwrap(), hm(10, 47));
        assert!(matches!(parse_time("quarter past"), Err(AppError::InvalidTime(_))));
    }

    #[test]
    fn random_times_stay_in_window() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let time = random_school_time(&mut rng);
            assert!(time >= hm(8, 30) && time <= hm(15, 0));
            assert_eq!(time.second(), 0);
        }
    }
}
