//! Interactive scalar prompts for the bounce calculator.
//!
//! Every prompt goes through [`prompt_until_valid`]: ask, parse + validate,
//! print the validation message and ask again until a value is accepted.
//! Reader and writer are generic so the loop is testable with in-memory
//! buffers.

use std::io::{BufRead, Write};

use thiserror::Error;

use crate::domain::BounceInputs;
use crate::error::{AppError, EXIT_OUTPUT};

pub const INITIAL_HEIGHT_QUESTION: &str = "At what height, in metres, do you drop the ball from? ";
pub const MINIMUM_HEIGHT_QUESTION: &str = "What is the minimum height that the ball must reach in metres? ";
pub const EFFICIENCY_QUESTION: &str = "What is the efficiency of the bounce? ";
pub const HEIGHTS_QUESTION: &str =
    "Would you like to know the height of each bounce? Please enter \"yes\" or \"no\": ";
pub const PLOT_QUESTION: &str =
    "Would you like to see a graph of the decay in maximum bounce heights? Please enter \"yes\" or \"no\": ";

/// Why a typed scalar was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("The {0} must be a number.")]
    NotANumber(&'static str),

    #[error("The {0} must be greater than 0.")]
    NotPositive(&'static str),

    #[error("The minimum height must be less than the drop height.")]
    MinimumAboveInitial,

    #[error("The bounce efficiency must be between 0 and 1.")]
    EfficiencyOutOfRange,
}

/// Bounce inputs already supplied on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct GivenBounceInputs {
    pub initial_height: Option<f64>,
    pub minimum_height: Option<f64>,
    pub efficiency: Option<f64>,
}

/// Parse one finite number, ignoring surrounding whitespace.
pub fn parse_scalar(input: &str, quantity: &'static str) -> Result<f64, InputError> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(InputError::NotANumber(quantity))
}

pub fn validate_initial_height(value: f64) -> Result<f64, InputError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(InputError::NotPositive("initial height"))
    }
}

/// Must be positive and must not exceed the drop height.
pub fn validate_minimum_height(value: f64, initial_height: f64) -> Result<f64, InputError> {
    if value > initial_height {
        Err(InputError::MinimumAboveInitial)
    } else if value <= 0.0 {
        Err(InputError::NotPositive("minimum height"))
    } else {
        Ok(value)
    }
}

/// Strictly inside `(0, 1)`.
pub fn validate_efficiency(value: f64) -> Result<f64, InputError> {
    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(InputError::EfficiencyOutOfRange)
    }
}

/// Ask `question` until `validate` accepts the answer.
///
/// Closed input is an error: there is no answer left to wait for.
pub fn prompt_until_valid<R, W, T, F>(
    reader: &mut R,
    writer: &mut W,
    question: &str,
    validate: F,
) -> Result<T, AppError>
where
    R: BufRead,
    W: Write,
    F: Fn(&str) -> Result<T, InputError>,
{
    loop {
        let answer = ask(reader, writer, question)?;
        match validate(&answer) {
            Ok(value) => return Ok(value),
            Err(e) => writeln!(writer, "{e}").map_err(write_error)?,
        }
    }
}

/// Single yes/no question; only the exact answer `yes` counts as yes.
pub fn ask_yes_no<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, question: &str) -> Result<bool, AppError> {
    Ok(ask(reader, writer, question)? == "yes")
}

/// Fill in every bounce input, prompting only for the ones not given.
///
/// Given values pass through the same validators; a rejected flag is an
/// input error rather than a re-prompt.
pub fn collect_bounce_inputs<R: BufRead, W: Write>(
    given: GivenBounceInputs,
    reader: &mut R,
    writer: &mut W,
) -> Result<BounceInputs, AppError> {
    let initial_height = match given.initial_height {
        Some(v) => validate_initial_height(v).map_err(flag_error)?,
        None => prompt_until_valid(reader, writer, INITIAL_HEIGHT_QUESTION, |s| {
            parse_scalar(s, "initial height").and_then(validate_initial_height)
        })?,
    };

    let minimum_height = match given.minimum_height {
        Some(v) => validate_minimum_height(v, initial_height).map_err(flag_error)?,
        None => prompt_until_valid(reader, writer, MINIMUM_HEIGHT_QUESTION, |s| {
            parse_scalar(s, "minimum height").and_then(|v| validate_minimum_height(v, initial_height))
        })?,
    };

    let efficiency = match given.efficiency {
        Some(v) => validate_efficiency(v).map_err(flag_error)?,
        None => prompt_until_valid(reader, writer, EFFICIENCY_QUESTION, |s| {
            parse_scalar(s, "bounce efficiency").and_then(validate_efficiency)
        })?,
    };

    Ok(BounceInputs {
        initial_height,
        minimum_height,
        efficiency,
    })
}

fn ask<R: BufRead, W: Write>(reader: &mut R, writer: &mut W, question: &str) -> Result<String, AppError> {
    write!(writer, "{question}").map_err(write_error)?;
    writer.flush().map_err(write_error)?;

    let mut line = String::new();
    let read = reader
        .read_line(&mut line)
        .map_err(|e| AppError::input(format!("Failed to read answer: {e}")))?;
    if read == 0 {
        return Err(AppError::input("Input closed before an answer was given."));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn write_error(e: std::io::Error) -> AppError {
    AppError::new(EXIT_OUTPUT, format!("Failed to write prompt: {e}"))
}

fn flag_error(e: InputError) -> AppError {
    AppError::input(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EXIT_INPUT;
    use std::io::Cursor;

    #[test]
    fn parse_scalar_accepts_numbers_only() {
        assert_eq!(parse_scalar(" 2.5 ", "x"), Ok(2.5));
        assert_eq!(parse_scalar("1e-3", "x"), Ok(1e-3));
        assert_eq!(parse_scalar("ten", "initial height"), Err(InputError::NotANumber("initial height")));
        assert_eq!(parse_scalar("", "x"), Err(InputError::NotANumber("x")));
        assert_eq!(parse_scalar("nan", "x"), Err(InputError::NotANumber("x")));
    }

    #[test]
    fn validators_follow_bounce_rules() {
        assert!(validate_initial_height(0.0).is_err());
        assert_eq!(validate_initial_height(10.0), Ok(10.0));

        assert_eq!(validate_minimum_height(11.0, 10.0), Err(InputError::MinimumAboveInitial));
        assert_eq!(validate_minimum_height(0.0, 10.0), Err(InputError::NotPositive("minimum height")));
        assert_eq!(validate_minimum_height(10.0, 10.0), Ok(10.0));

        assert!(validate_efficiency(0.0).is_err());
        assert!(validate_efficiency(1.0).is_err());
        assert_eq!(validate_efficiency(0.5), Ok(0.5));
    }

    #[test]
    fn messages_read_as_sentences() {
        assert_eq!(
            InputError::NotANumber("initial height").to_string(),
            "The initial height must be a number."
        );
        assert_eq!(
            InputError::EfficiencyOutOfRange.to_string(),
            "The bounce efficiency must be between 0 and 1."
        );
    }

    #[test]
    fn reprompts_until_valid() {
        let mut input = Cursor::new("abc\n-1\n10\n");
        let mut output = Vec::new();
        let v = prompt_until_valid(&mut input, &mut output, "h? ", |s| {
            parse_scalar(s, "initial height").and_then(validate_initial_height)
        })
        .unwrap();
        assert_eq!(v, 10.0);

        let text = String::from_utf8(output).unwrap();
        assert_eq!(text.matches("h? ").count(), 3);
        assert!(text.contains("The initial height must be a number.\n"));
        assert!(text.contains("The initial height must be greater than 0.\n"));
    }

    #[test]
    fn closed_input_is_an_input_error() {
        let mut input = Cursor::new("abc\n");
        let mut output = Vec::new();
        let err = prompt_until_valid(&mut input, &mut output, "h? ", |s| parse_scalar(s, "x")).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
    }

    #[test]
    fn only_exact_yes_is_yes() {
        for (answer, expected) in [("yes\n", true), ("Yes\n", false), ("y\n", false), ("no\n", false), ("yes\r\n", true)] {
            let mut input = Cursor::new(answer);
            let mut output = Vec::new();
            assert_eq!(ask_yes_no(&mut input, &mut output, "? ").unwrap(), expected, "{answer:?}");
        }
    }

    #[test]
    fn prompts_only_for_missing_inputs() {
        let given = GivenBounceInputs {
            initial_height: Some(10.0),
            minimum_height: None,
            efficiency: Some(0.5),
        };
        let mut input = Cursor::new("20\n0.1\n");
        let mut output = Vec::new();
        let inputs = collect_bounce_inputs(given, &mut input, &mut output).unwrap();
        assert_eq!(
            inputs,
            BounceInputs {
                initial_height: 10.0,
                minimum_height: 0.1,
                efficiency: 0.5,
            }
        );

        let text = String::from_utf8(output).unwrap();
        assert!(!text.contains(INITIAL_HEIGHT_QUESTION));
        assert!(!text.contains(EFFICIENCY_QUESTION));
        assert!(text.contains("The minimum height must be less than the drop height."));
    }

    #[test]
    fn invalid_flag_is_not_reprompted() {
        let given = GivenBounceInputs {
            initial_height: Some(10.0),
            minimum_height: Some(1.0),
            efficiency: Some(1.5),
        };
        let mut input = Cursor::new("");
        let mut output = Vec::new();
        let err = collect_bounce_inputs(given, &mut input, &mut output).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_INPUT);
        assert!(output.is_empty());
    }
}
