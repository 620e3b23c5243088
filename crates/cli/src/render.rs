//! Terminal output for batch events.

use std::io::{self, Write};

use vidbatch_core::{BatchEvent, ConversionResult, ConversionStatus};

/// Renders batch events as human readable lines or as JSON lines.
pub struct Renderer {
    json: bool,
    total: usize,
    /// Last whole percentage printed for the running file.
    last_percent: Option<u32>,
}

impl Renderer {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            total: 0,
            last_percent: None,
        }
    }

    /// Writes one event to stdout.
    pub fn render(&mut self, event: &BatchEvent) -> io::Result<()> {
        let mut stdout = io::stdout().lock();

        if self.json {
            let line = serde_json::to_string(event).map_err(io::Error::other)?;
            return writeln!(stdout, "{}", line);
        }

        match event {
            BatchEvent::BatchStarted { total } => {
                self.total = *total;
                writeln!(stdout, "Converting {} file(s)", total)
            }
            BatchEvent::FileStarted {
                index,
                input,
                output,
            } => {
                self.last_percent = None;
                writeln!(
                    stdout,
                    "[{}/{}] {} -> {}",
                    index + 1,
                    self.total,
                    input.display(),
                    output.display()
                )
            }
            BatchEvent::FileProgress { percent, .. } => {
                let whole = percent.floor() as u32;
                if self.last_percent.is_some_and(|last| whole < last + 5) && whole < 100 {
                    return Ok(());
                }
                self.last_percent = Some(whole);
                write!(stdout, "\r  {:>3}%", whole)?;
                stdout.flush()
            }
            BatchEvent::FileFinished { index, result } => {
                if self.last_percent.take().is_some() {
                    writeln!(stdout)?;
                }
                writeln!(stdout, "{}", finished_line(*index, self.total, result))
            }
            BatchEvent::BatchFinished {
                succeeded,
                failed,
                cancelled,
            } => writeln!(
                stdout,
                "Done: {} succeeded, {} failed, {} cancelled",
                succeeded, failed, cancelled
            ),
        }
    }
}

/// One line describing a finished file.
pub fn finished_line(index: usize, total: usize, result: &ConversionResult) -> String {
    let label = match result.status {
        ConversionStatus::Succeeded => "OK",
        ConversionStatus::Failed => "FAILED",
        ConversionStatus::Cancelled => "CANCELLED",
    };
    format!(
        "[{}/{}] {} {}: {}",
        index + 1,
        total,
        label,
        result.input_path.display(),
        result.message
    )
}
