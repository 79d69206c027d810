use crate::{
    adjuster::{AdjustDirection, AdjustStep},
    band::Band,
    types::Direction,
};

pub const COLUMNS: usize = 20;

pub const LINE_TEMPERATURE: u8 = 0;
pub const LINE_BAND: u8 = 1;
pub const LINE_ADJUST: u8 = 2;
pub const LINE_STATUS: u8 = 3;

/// `1h 2m 3s`, or `2m 3s` when under an hour.
pub fn format_duration(total_s: u32) -> String {
    let hours = total_s / 3_600;
    let minutes = (total_s % 3_600) / 60;
    let seconds = total_s % 60;
    if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else {
        format!("{minutes}m {seconds}s")
    }
}

pub fn fit(text: &str) -> String {
    let truncated: String = text.chars().take(COLUMNS).collect();
    format!("{truncated:<width$}", width = COLUMNS)
}

pub fn temperature_line(temp_c: f32) -> String {
    fit(&format!("Temp {temp_c:>6.1}C"))
}

pub fn band_line(band: &Band) -> String {
    fit(&format!("Band {:.1}-{:.1}C", band.min_c, band.max_c))
}

pub fn adjust_line(step: Option<&AdjustStep>) -> String {
    match step {
        Some(step) => {
            let arrow = match step.direction {
                AdjustDirection::Increase => "Up",
                AdjustDirection::Decrease => "Down",
            };
            fit(&format!("{arrow} {:.1}C/step", step.rate_c))
        }
        None => fit(""),
    }
}

pub fn countdown_line(label: &str, remaining_s: u32) -> String {
    fit(&format!("{label} {}", format_duration(remaining_s)))
}

pub fn relay_line(direction: Direction, duration_ms: u64) -> String {
    fit(&format!("Relay {} {}ms", direction.as_str(), duration_ms))
}

pub fn hold_line() -> String {
    fit("Relay HOLD")
}
