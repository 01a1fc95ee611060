//! Display strings for amounts and dates (Indonesian locale).

use chrono::{Datelike, NaiveDate};

const NAMA_BULAN: [&str; 12] = [
    "Januari", "Februari", "Maret", "April", "Mei", "Juni",
    "Juli", "Agustus", "September", "Oktober", "November", "Desember",
];

/// `1500000` → `"Rp 1.500.000"`
pub fn rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-Rp {grouped}")
    } else {
        format!("Rp {grouped}")
    }
}

/// `2026-10-14` → `"14 Oktober 2026"`
pub fn tanggal(date: NaiveDate) -> String {
    format!("{} {} {}", date.day(), NAMA_BULAN[date.month0() as usize], date.year())
}

/// `(2026, 5)` → `"Mei 2026"`
pub fn bulan(year: i32, month: u32) -> String {
    let idx = (month.clamp(1, 12) - 1) as usize;
    format!("{} {}", NAMA_BULAN[idx], year)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rupiah_groups_thousands() {
        assert_eq!(rupiah(0), "Rp 0");
        assert_eq!(rupiah(950), "Rp 950");
        assert_eq!(rupiah(1_000), "Rp 1.000");
        assert_eq!(rupiah(1_500_000), "Rp 1.500.000");
        assert_eq!(rupiah(12_345_678), "Rp 12.345.678");
        assert_eq!(rupiah(-250_000), "-Rp 250.000");
    }

    #[test]
    fn tanggal_uses_indonesian_month_names() {
        let d = NaiveDate::from_ymd_opt(2026, 10, 14).unwrap();
        assert_eq!(tanggal(d), "14 Oktober 2026");
        let d = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(tanggal(d), "1 Januari 2025");
    }

    #[test]
    fn bulan_label() {
        assert_eq!(bulan(2026, 5), "Mei 2026");
        assert_eq!(bulan(2026, 12), "Desember 2026");
    }
}
