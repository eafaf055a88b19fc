//! Date digit-sum codes.
//!
//! The cyclic code of a date is the digital root of all digits of its day,
//! month and year. Since every calendar date has a non-zero digit, the root
//! is always in `1..=9`.

use chrono::{Datelike, NaiveDate};

/// Master numbers that a reduction may pass through.
pub const MASTER_NUMBERS: [u32; 3] = [11, 22, 33];

/// Sum of the decimal digits of `n`.
pub fn digit_sum(mut n: u32) -> u32 {
    let mut sum = 0;
    while n > 0 {
        sum += n % 10;
        n /= 10;
    }
    sum
}

/// Repeated digit sum down to a single digit. Zero stays zero.
pub fn reduce(mut n: u32) -> u32 {
    while n > 9 {
        n = digit_sum(n);
    }
    n
}

fn date_digit_total(date: NaiveDate) -> u32 {
    // years before 1 CE never occur in catalogs; clamp for a total function
    let year = date.year().max(0) as u32;
    digit_sum(date.day()) + digit_sum(date.month()) + digit_sum(year)
}

/// Cyclic code of a calendar date, in `1..=9`.
pub fn cyclic_code(date: NaiveDate) -> u8 {
    let code = reduce(date_digit_total(date));
    // year 0 with no other digits is impossible since day and month >= 1
    code.max(1) as u8
}

/// The first master number (11, 22 or 33) met while reducing the date's
/// digit total, if any.
pub fn master_number(date: NaiveDate) -> Option<u8> {
    let mut n = date_digit_total(date);
    while n > 9 {
        if MASTER_NUMBERS.contains(&n) {
            return Some(n as u8);
        }
        n = digit_sum(n);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn known_codes() {
        // 2+0+2+4 + 0+3 + 1+5 = 17 -> 8
        assert_eq!(cyclic_code(d(2024, 3, 15)), 8);
        // 1+9+9+9 + 1+2 + 3+1 = 35 -> 8
        assert_eq!(cyclic_code(d(1999, 12, 31)), 8);
        // 2+0+0+0 + 1 + 1 = 4
        assert_eq!(cyclic_code(d(2000, 1, 1)), 4);
    }

    #[test]
    fn master_numbers_are_detected() {
        // 2+0+0+9 + 0+9 + 0+2 = 22
        assert_eq!(master_number(d(2009, 9, 2)), Some(22));
        // 2+0+2+0 + 1 + 2 = 7
        assert_eq!(master_number(d(2020, 1, 2)), None);
        // 1+9+9+0 + 2 + 2+8 = 31 -> 4
        assert_eq!(master_number(d(1990, 2, 28)), None);
        // 1+9+9+9 + 1+1 + 2+1 = 33
        assert_eq!(master_number(d(1999, 11, 21)), Some(33));
    }

    #[test]
    fn reduce_and_digit_sum() {
        assert_eq!(digit_sum(1987), 25);
        assert_eq!(reduce(1987), 7);
        assert_eq!(reduce(9), 9);
        assert_eq!(reduce(0), 0);
    }
}
