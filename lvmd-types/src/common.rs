// SPDX-License-Identifier: GPL-3.0-only

//! Common helpers shared across models

use num_format::{Locale, ToFormattedString};

/// Render a byte count for humans, e.g. `16.00 GB (17,179,869,184 bytes)`
pub fn bytes_to_pretty(bytes: u64, add_bytes: bool) -> String {
    let mut steps = 0;
    let mut val = bytes as f64;

    while val >= 1024. && steps < 8 {
        val /= 1024.;
        steps += 1;
    }

    let unit = match steps {
        0 => "B",
        1 => "KB",
        2 => "MB",
        3 => "GB",
        4 => "TB",
        5 => "PB",
        6 => "EB",
        7 => "ZB",
        _ => "YB",
    };

    if add_bytes {
        format!(
            "{:.2} {} ({} bytes)",
            val,
            unit,
            bytes.to_formatted_string(&Locale::en)
        )
    } else {
        format!("{:.2} {}", val, unit)
    }
}
