pub mod app;
pub mod driver;
pub mod extract;
pub mod models;
pub mod report;

pub use app::main;
pub use driver::{Evaluator, EvaluatorConfig};
pub use extract::extract_answer;
pub use models::{EvaluationRecord, Label, Question, RunStatistics};
