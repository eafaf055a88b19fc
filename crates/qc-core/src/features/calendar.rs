//! Assigning origin times to calendar days.
//!
//! Three conventions are supported and none is privileged:
//! - `Utc`: the UTC calendar day
//! - `LocalSolar`: the day in local mean solar time, UTC shifted by
//!   `longitude / 15` hours
//! - `LocalSunrise`: the local-solar day, but an event before that day's
//!   sunrise at the epicenter belongs to the previous day
//!
//! Sunrise uses a low-precision solar model (declination and equation of
//! time from the day of year) that is good to a few minutes away from the
//! poles. Where the sun does not rise or set, the local-solar day is used.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use qc_common::Event;
use qc_config::DayConvention;

/// Calendar day of `time` at an epicenter under `convention`.
pub fn assign_day(
    time: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
    convention: DayConvention,
) -> NaiveDate {
    match convention {
        DayConvention::Utc => time.date_naive(),
        DayConvention::LocalSolar => local_solar_day(time, longitude),
        DayConvention::LocalSunrise => {
            let day = local_solar_day(time, longitude);
            match sunrise_utc(day, latitude, longitude) {
                Some(sunrise) if time < sunrise => day.pred_opt().unwrap_or(day),
                _ => day,
            }
        }
    }
}

/// Day of an event under `convention`.
pub fn event_day(event: &Event, convention: DayConvention) -> NaiveDate {
    assign_day(event.time, event.latitude, event.longitude, convention)
}

fn local_solar_day(time: DateTime<Utc>, longitude: f64) -> NaiveDate {
    let offset_secs = (longitude / 15.0 * 3600.0).round() as i64;
    (time + Duration::seconds(offset_secs)).date_naive()
}

/// Approximate sunrise instant for the local day `date` at an epicenter.
///
/// Returns `None` during polar day or polar night.
pub fn sunrise_utc(date: NaiveDate, latitude: f64, longitude: f64) -> Option<DateTime<Utc>> {
    let doy = date.ordinal() as f64;
    let declination = 23.45 * (360.0 * (284.0 + doy) / 365.0).to_radians().sin();
    let equation_of_time_min = 4.0 * (360.0 * (doy - 81.0) / 365.0).to_radians().sin();
    // solar noon in UTC hours for this longitude
    let solar_noon = 12.0 - longitude / 15.0 - equation_of_time_min / 60.0;

    let cos_h = -latitude.to_radians().tan() * declination.to_radians().tan();
    if !(-1.0..=1.0).contains(&cos_h) {
        return None;
    }
    let hour_angle_deg = cos_h.acos().to_degrees();
    let sunrise_hours = solar_noon - hour_angle_deg / 15.0;

    let midnight = date.and_hms_opt(0, 0, 0)?.and_utc();
    Some(midnight + Duration::seconds((sunrise_hours * 3600.0).round() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn utc_day_ignores_location() {
        let t = at(2020, 6, 1, 23, 30);
        assert_eq!(assign_day(t, 35.0, 139.0, DayConvention::Utc), day(2020, 6, 1));
    }

    #[test]
    fn local_solar_shifts_by_longitude() {
        // 139E is +9h16m: 20:00 UTC is already the next local day
        let t = at(2020, 6, 1, 20, 0);
        assert_eq!(assign_day(t, 35.0, 139.0, DayConvention::LocalSolar), day(2020, 6, 2));
        // 120W is -8h: 03:00 UTC is still the previous local day
        let t = at(2020, 6, 1, 3, 0);
        assert_eq!(assign_day(t, 35.0, -120.0, DayConvention::LocalSolar), day(2020, 5, 31));
    }

    #[test]
    fn equator_equinox_sunrise_is_near_six_local() {
        let sunrise = sunrise_utc(day(2021, 3, 21), 0.0, 0.0).unwrap();
        let minutes = sunrise.hour() * 60 + sunrise.minute();
        assert!((350..=370).contains(&minutes), "{sunrise}");
    }

    #[test]
    fn before_sunrise_belongs_to_previous_day() {
        let t = at(2021, 3, 21, 4, 0);
        assert_eq!(assign_day(t, 0.0, 0.0, DayConvention::LocalSunrise), day(2021, 3, 20));
        let t = at(2021, 3, 21, 8, 0);
        assert_eq!(assign_day(t, 0.0, 0.0, DayConvention::LocalSunrise), day(2021, 3, 21));
    }

    #[test]
    fn polar_night_falls_back_to_local_solar() {
        assert!(sunrise_utc(day(2021, 12, 21), 80.0, 0.0).is_none());
        let t = at(2021, 12, 21, 2, 0);
        assert_eq!(
            assign_day(t, 80.0, 0.0, DayConvention::LocalSunrise),
            assign_day(t, 80.0, 0.0, DayConvention::LocalSolar)
        );
    }
}
