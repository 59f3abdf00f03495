//! Terminal progress bar for archive builds.
//!
//! All state lives in a [`Progress`] value owned by the build: the running
//! byte count across every entry, the total to reach, and the width of the
//! last line drawn so the next one can blank it out.

use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

pub const DEFAULT_WIDTH: usize = 50;
pub const DEFAULT_INTERVAL_MS: u64 = 100;

/// Minimum columns blanked after each entry finishes
const ENTRY_CLEAR_WIDTH: usize = 80;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Scale `bytes` to the largest decimal (1000-based) unit that keeps the value
/// at or above one, up to terabytes.
pub fn format_size(bytes: u64) -> (f64, &'static str) {
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1000.0 && unit < UNITS.len() - 1 {
        size /= 1000.0;
        unit += 1;
    }
    (size, UNITS[unit])
}

#[derive(Debug)]
pub struct Progress<W: Write> {
    out: W,
    width: usize,
    interval: Duration,
    processed: u64,
    total: u64,
    last_update: Instant,
    last_width: usize,
}

impl<W: Write> Progress<W> {
    pub fn new(out: W, total: u64) -> Progress<W> {
        Progress {
            out,
            width: DEFAULT_WIDTH,
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            processed: 0,
            total,
            last_update: Instant::now(),
            last_width: 0,
        }
    }

    pub fn width(mut self, width: usize) -> Progress<W> {
        self.width = width;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Progress<W> {
        self.interval = interval;
        self
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn begin(&mut self, output: &Path) -> io::Result<()> {
        writeln!(self.out, "Building NSP: {}", output.display())
    }

    /// Announce entry `index` (zero based) of `count` and restart the update
    /// timer.
    pub fn entry(&mut self, index: usize, count: usize, name: &str) -> io::Result<()> {
        self.last_update = Instant::now();
        writeln!(self.out, "Processing ({}/{}): {}", index + 1, count, name)
    }

    /// Count `bytes` as copied, redrawing the bar if the update interval has
    /// passed since the last redraw.
    pub fn advance(&mut self, bytes: u64) -> io::Result<()> {
        self.processed += bytes;
        if self.last_update.elapsed() >= self.interval {
            self.render()?;
            self.last_update = Instant::now();
        }
        Ok(())
    }

    /// Number of filled cells in the bar
    pub fn filled(&self) -> usize {
        let percent = self.processed as f64 / self.total.max(1) as f64;
        ((percent * self.width as f64) as usize).min(self.width)
    }

    /// The bar line, starting with a carriage return
    pub fn line(&self) -> String {
        let percent = self.processed as f64 / self.total.max(1) as f64;
        let filled = self.filled();
        let (current, current_unit) = format_size(self.processed);
        let (total, total_unit) = format_size(self.total);
        format!(
            "\r[{}{}] {:5.1}% ({:3.2} {}/{:3.2} {})",
            "=".repeat(filled),
            " ".repeat(self.width - filled),
            percent * 100.0,
            current,
            current_unit,
            total,
            total_unit,
        )
    }

    pub fn render(&mut self) -> io::Result<()> {
        let line = self.line();
        self.clear(self.last_width)?;
        self.out.write_all(line.as_bytes())?;
        self.out.flush()?;
        self.last_width = line.len();
        Ok(())
    }

    pub fn finish_entry(&mut self) -> io::Result<()> {
        self.clear(self.last_width.max(ENTRY_CLEAR_WIDTH))?;
        self.last_width = 0;
        self.out.flush()
    }

    fn clear(&mut self, width: usize) -> io::Result<()> {
        write!(self.out, "\r{:width$}\r", "", width = width)
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::{format_size, Progress};

    #[test]
    fn quarter_bar() {
        let mut progress = Progress::new(Vec::new(), 200);
        progress.processed = 50;

        assert_eq!(progress.filled(), 12);
        assert_eq!(
            progress.line(),
            format!("\r[{}{}]  25.0% (50.00 B/200.00 B)", "=".repeat(12), " ".repeat(38))
        );
    }

    #[test]
    fn empty_total() {
        let progress = Progress::new(Vec::new(), 0).width(10);
        assert_eq!(progress.filled(), 0);
        assert!(progress.line().contains("   0.0%"));
    }

    #[test]
    fn bar_never_overflows() {
        // Source files that grew since they were added
        let mut progress = Progress::new(Vec::new(), 10).width(20);
        progress.processed = 15;
        assert_eq!(progress.filled(), 20);
    }

    #[test]
    fn sizes() {
        assert_eq!(format_size(0), (0.0, "B"));
        assert_eq!(format_size(999), (999.0, "B"));
        assert_eq!(format_size(1000), (1.0, "KB"));
        assert_eq!(format_size(1_500_000), (1.5, "MB"));
        assert_eq!(format_size(2_000_000_000_000), (2.0, "TB"));
        assert_eq!(format_size(5_000_000_000_000_000), (5000.0, "TB"));
    }

    #[test]
    fn render_blanks_previous_line() {
        let mut progress = Progress::new(Vec::new(), 1000)
            .width(4)
            .interval(Duration::ZERO);
        progress.advance(500).unwrap();
        let first = progress.line();
        progress.advance(500).unwrap();
        let second = progress.line();

        let out = String::from_utf8(progress.into_inner()).unwrap();
        let expected = format!(
            "\r\r{}\r{}\r{}",
            first,
            " ".repeat(first.len()),
            second
        );
        assert_eq!(out, expected);
        assert_eq!(second, "\r[====] 100.0% (1.00 KB/1.00 KB)");
    }

    #[test]
    fn interval_limits_redraws() {
        let mut progress = Progress::new(Vec::new(), 100).interval(Duration::from_secs(3600));
        progress.advance(10).unwrap();
        progress.advance(10).unwrap();
        assert_eq!(progress.processed(), 20);
        assert!(progress.into_inner().is_empty());
    }

    #[test]
    fn entry_lines() {
        let mut progress = Progress::new(Vec::new(), 100);
        progress.begin(Path::new("out.nsp")).unwrap();
        progress.entry(0, 2, "a.nca").unwrap();
        progress.finish_entry().unwrap();

        let out = String::from_utf8(progress.into_inner()).unwrap();
        assert_eq!(
            out,
            format!(
                "Building NSP: out.nsp\nProcessing (1/2): a.nca\n\r{}\r",
                " ".repeat(80)
            )
        );
    }

    #[test]
    fn finish_entry_clears_wide_bar() {
        let mut progress = Progress::new(Vec::new(), 1000)
            .width(100)
            .interval(Duration::ZERO);
        progress.advance(1000).unwrap();
        let line = progress.line();
        assert!(line.len() > 80);
        progress.finish_entry().unwrap();
        // The next entry starts from a clean line again
        progress.finish_entry().unwrap();

        let out = String::from_utf8(progress.into_inner()).unwrap();
        let expected = format!(
            "\r\r{}\r{}\r\r{}\r",
            line,
            " ".repeat(line.len()),
            " ".repeat(80)
        );
        assert_eq!(out, expected);
    }
}
