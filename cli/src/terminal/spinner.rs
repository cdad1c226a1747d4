use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use proxmap_common::proxy::target::Target;

use crate::terminal::colors;

static SPINNER: Mutex<Option<ProgressBar>> = Mutex::new(None);

fn current() -> Option<ProgressBar> {
    SPINNER.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

pub fn start(msg: &str) {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&[
            "▁▁▁▁▁",
            "▁▂▂▂▁",
            "▁▄▂▄▁",
            "▂▄▆▄▂",
            "▄▆█▆▄",
            "▂▄▆▄▂",
            "▁▄▂▄▁",
            "▁▂▂▂▁",
        ]);

    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(msg.to_string());

    *SPINNER.lock().unwrap_or_else(|e| e.into_inner()) = Some(pb);
}

pub fn finish() {
    let pb = SPINNER.lock().unwrap_or_else(|e| e.into_inner()).take();
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
}

pub fn report_resolution_progress(target: &Target, depth: usize) {
    let Some(pb) = current() else { return };
    let hop = match depth {
        0 => String::new(),
        n => format!(" (hop {n})"),
    };
    pb.set_message(format!(
        "Resolving {}{}...",
        target.to_string().color(colors::TARGET).bold(),
        hop
    ));
}

/// Log sink that keeps stderr output from tearing the spinner line.
pub struct SpinnerWriter;

impl Write for SpinnerWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match current() {
            Some(pb) => pb.suspend(|| io::stderr().write_all(buf))?,
            None => io::stderr().write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()
    }
}
