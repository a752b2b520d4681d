use std::io::{BufRead, Write};

use crate::notice::Notice;
use crate::ports::{Confirmer, TimerView};
use crate::timers::StepRow;

/// Renders step rows and notices as plain text lines.
pub struct TerminalView<W> {
    out: W,
}

impl TerminalView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TimerView for TerminalView<W> {
    fn render(&mut self, rows: &[StepRow]) {
        let width = rows.iter().map(|row| row.label.len()).max().unwrap_or(0);
        let mut text = String::new();
        for row in rows {
            text.push_str(&format!(
                "{:<width$}  {:<10}  {}\n",
                row.label,
                row.step_id,
                row.status_text()
            ));
        }
        text.push('\n');
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    fn notice(&mut self, notice: &Notice) {
        let mut text = format!("[{}] {}\n", notice.level.label(), notice.message);
        for step in &notice.guidance {
            text.push_str(&format!("  - {step}\n"));
        }
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }
}

/// Asks on stdout and reads a yes/no answer from stdin.
#[derive(Debug, Default)]
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        let _ = std::io::stdout().flush();
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
