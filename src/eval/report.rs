use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::eval::models::{EvalError, RunStatistics};

/// Receives running accuracy while a question set is evaluated
pub trait ProgressReporter: Send {
    fn question_completed(&mut self, processed: usize, accuracy: f64);
}

/// No-op reporter
impl ProgressReporter for () {
    fn question_completed(&mut self, _processed: usize, _accuracy: f64) {}
}

/// Terminal progress bar showing `Acc: xx.xx%` after each question
pub struct ConsoleReporter {
    bar: ProgressBar,
}

impl ConsoleReporter {
    pub fn new(total: usize, enabled: bool) -> Result<Self> {
        let bar = if enabled {
            ProgressBar::new(total as u64)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(ProgressStyle::with_template(
            "Evaluating {wide_bar} {pos}/{len} [{elapsed_precise}<{eta_precise}] {msg}",
        )?);
        Ok(Self { bar })
    }

    /// Closes the bar and prints the final report
    pub fn finish(&self, stats: &RunStatistics) -> Result<(), EvalError> {
        self.bar.finish();
        println!("{}", format_report(stats)?);
        Ok(())
    }
}

impl ProgressReporter for ConsoleReporter {
    fn question_completed(&mut self, _processed: usize, accuracy: f64) {
        self.bar.set_message(format!("Acc: {:.2}%", accuracy));
        self.bar.inc(1);
    }
}

/// Final accuracy followed by every question answered wrongly
pub fn format_report(stats: &RunStatistics) -> Result<String, EvalError> {
    let mut report = format!("\nFinal Accuracy: {:.2}%", stats.accuracy()?);

    if !stats.mismatches().is_empty() {
        report.push_str("\n\nIncorrect answers:");
        for record in stats.mismatches() {
            let obtained = record
                .obtained
                .map(|label| label.to_string())
                .unwrap_or_else(|| "None".to_string());
            report.push_str(&format!(
                "\nQ: {}\n → Expected {}, got {}\n",
                record.question, record.expected, obtained
            ));
        }
    }

    Ok(report)
}
