// Review export fixtures shared by the integration suites

#![allow(dead_code)]

use chrono::{Days, NaiveDate};

pub const HEADER: &str = "review_uid,product_name,product_price,product_type,username_1,username_2,rating,review_content,review_date";

pub fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

/// One export row; `text` is quoted so it may contain commas
pub fn row(uid: &str, rating: f64, text: &str, date: &str) -> String {
    format!(
        "{},widget,12900,kitchen,buyer_{},,{},\"{}\",{}",
        uid,
        uid,
        rating,
        text.replace('"', "\"\""),
        date
    )
}

/// Ten days with counts [2,3,2,50,3,2,2,3,2,2]; day 4 reviews rate 1, all others 4
pub fn spike_csv() -> String {
    let counts = [2, 3, 2, 50, 3, 2, 2, 3, 2, 2];
    let mut lines = vec![HEADER.to_string()];
    for (day, &count) in counts.iter().enumerate() {
        let date = start_date() + Days::new(day as u64);
        let rating = if day == 3 { 1.0 } else { 4.0 };
        for i in 0..count {
            let uid = format!("{}-{}", day, i);
            lines.push(row(
                &uid,
                rating,
                &format!("note {} {}", day, i),
                &format!("{} 09:30:00", date.format("%Y-%m-%d")),
            ));
        }
    }
    lines.join("\n") + "\n"
}

/// Ten reviews over five days, two sharing the text "great product fast shipping"
pub fn duplicates_csv() -> String {
    let texts = [
        ("Great product, fast shipping!", 5.0),
        ("great product fast shipping", 5.0),
        ("blade broke after a week", 1.0),
        ("decent for the price", 3.0),
        ("loud but powerful", 4.0),
        ("smoothies come out fine", 4.0),
        ("lid does not seal well", 2.0),
        ("arrived scratched", 2.0),
        ("works as described", 4.0),
        ("too heavy for me", 3.0),
    ];
    // Header-less on purpose: column order is fixed
    let lines: Vec<String> = texts
        .iter()
        .enumerate()
        .map(|(i, &(text, rating))| {
            let date = start_date() + Days::new((i / 2) as u64);
            row(&format!("d{}", i), rating, text, &date.format("%Y-%m-%d").to_string())
        })
        .collect();
    lines.join("\n") + "\n"
}

/// A file whose reviews all fall on one day
pub fn single_day_csv() -> String {
    [
        HEADER.to_string(),
        row("s1", 5.0, "nice", "2024-03-01"),
        row("s2", 4.0, "fine", "2024-03-01"),
    ]
    .join("\n")
}
