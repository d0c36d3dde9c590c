use inquire::{required, Confirm, Text};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PromptError {
    #[error("unable to read input")]
    #[diagnostic(
        code(packager::prompt::inquire),
        help("Pass every argument on the command line when running without a terminal")
    )]
    Inquire(#[from] inquire::InquireError),
}

/// Returns `value` when given, otherwise asks for it.
pub fn get_or_ask(value: Option<&str>, question: &str, help: &str) -> Result<String, PromptError> {
    if let Some(value) = value {
        return Ok(value.to_string());
    }

    let answer = Text::new(question)
        .with_help_message(help)
        .with_validator(required!(format!("{} is required", question)))
        .prompt()?;

    Ok(answer.trim().to_string())
}

pub fn confirm(question: &str) -> Result<bool, PromptError> {
    let answer = Confirm::new(question).with_default(false).prompt()?;

    Ok(answer)
}

pub fn apply_changes() -> Result<bool, PromptError> {
    let answer = Confirm::new("Generate package?")
        .with_default(true)
        .prompt()?;

    Ok(answer)
}
