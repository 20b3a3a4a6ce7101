//! Human-readable figures for the console banners.

use std::time::Duration;

pub fn format_frequency(hz: u32) -> String {
    let hz = f64::from(hz);
    if hz >= 1e6 {
        format!("{:.3} MHz", hz / 1e6)
    } else if hz >= 1e3 {
        format!("{:.3} kHz", hz / 1e3)
    } else {
        format!("{hz:.3} Hz")
    }
}

pub fn format_throughput(bytes: u32, elapsed: Duration) -> String {
    let bps = f64::from(bytes) / elapsed.as_secs_f64();
    if bps >= 1e6 {
        format!("{:.3} MB/s", bps / 1e6)
    } else if bps >= 1e3 {
        format!("{:.3} KB/s", bps / 1e3)
    } else {
        format!("{bps:.3} B/s")
    }
}

pub fn format_time(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs_f64();
    if seconds >= 60.0 {
        format!("{:.3} mins", seconds / 60.0)
    } else if seconds >= 1.0 {
        format!("{seconds:.3} secs")
    } else if seconds >= 1e-3 {
        format!("{:.3} ms", seconds * 1e3)
    } else {
        format!("{:.3} µs", seconds * 1e6)
    }
}
