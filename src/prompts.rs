pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a security expert who answers questions.";

pub const ANSWER_FORMAT_INSTRUCTION: &str =
    "Choose the correct answer only in this format: ANSWER: X";
