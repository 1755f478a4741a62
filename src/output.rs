use std::io::{self, Write};

use crate::prefetch::{ProgressEvent, ProgressSink, RunSummary};

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

/// Prints progress lines as they happen; the human-facing mode.
pub struct ConsoleOutput;

impl ProgressSink for ConsoleOutput {
    fn event(&self, event: ProgressEvent) {
        println!("{}", event.message);
    }
}

/// Silent during the run, emits the summary as JSON at the end.
pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        let json = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
