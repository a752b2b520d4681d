use crate::notice::Notice;
use crate::timers::StepRow;

/// Asks the user to approve a destructive action.
pub trait Confirmer {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirmer for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

pub trait TimerView {
    fn render(&mut self, rows: &[StepRow]);
    fn notice(&mut self, notice: &Notice);
}
