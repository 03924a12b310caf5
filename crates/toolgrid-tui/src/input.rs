//! Parsing of the line typed at the prompt.

/// A valid prompt answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Quit,
    /// 1-based item index.
    Run(usize),
    NextPage,
    PrevPage,
}

/// Why a prompt answer was rejected. Shown inline, then re-prompted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    Blank,
    NotANumber,
    OutOfRange { max: usize },
}

impl std::fmt::Display for InputError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputError::Blank => write!(f, "Invalid selection! Please enter a number."),
            InputError::NotANumber => write!(f, "Invalid input. Please enter a number."),
            InputError::OutOfRange { max } => write!(f, "Invalid selection! Choose 0-{max}."),
        }
    }
}

impl std::error::Error for InputError {}

/// Interprets `input` against a list of `item_count` items.
///
/// # Errors
/// Returns an [`InputError`] for blank, non-numeric or out-of-range input.
pub fn parse_choice(input: &str, item_count: usize) -> Result<Choice, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(InputError::Blank);
    }
    if input.eq_ignore_ascii_case("n") {
        return Ok(Choice::NextPage);
    }
    if input.eq_ignore_ascii_case("p") {
        return Ok(Choice::PrevPage);
    }

    let digits = input.strip_prefix(['+', '-']).unwrap_or(input);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(InputError::NotANumber);
    }
    let out_of_range = InputError::OutOfRange { max: item_count };
    let value: i64 = input.parse().ok().ok_or(out_of_range.clone())?;
    match usize::try_from(value) {
        Ok(0) => Ok(Choice::Quit),
        Ok(index) if index <= item_count => Ok(Choice::Run(index)),
        _ => Err(out_of_range),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers() {
        assert_eq!(parse_choice("0", 3), Ok(Choice::Quit));
        assert_eq!(parse_choice("2", 3), Ok(Choice::Run(2)));
        assert_eq!(parse_choice(" 3 \n", 3), Ok(Choice::Run(3)));
    }

    #[test]
    fn test_blank_and_non_numeric_are_distinct() {
        assert_eq!(parse_choice("", 3), Err(InputError::Blank));
        assert_eq!(parse_choice("   ", 3), Err(InputError::Blank));
        assert_eq!(parse_choice("abc", 3), Err(InputError::NotANumber));
        assert_eq!(parse_choice("2.5", 3), Err(InputError::NotANumber));
        assert_ne!(
            InputError::Blank.to_string(),
            InputError::NotANumber.to_string()
        );
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(parse_choice("4", 3), Err(InputError::OutOfRange { max: 3 }));
        assert_eq!(parse_choice("-1", 3), Err(InputError::OutOfRange { max: 3 }));
        assert_eq!(
            parse_choice("4", 3).unwrap_err().to_string(),
            "Invalid selection! Choose 0-3."
        );
        assert_eq!(parse_choice("1", 0), Err(InputError::OutOfRange { max: 0 }));
    }

    #[test]
    fn test_huge_number_is_out_of_range_not_invalid() {
        let huge = "99999999999999999999";
        assert_eq!(parse_choice(huge, 3), Err(InputError::OutOfRange { max: 3 }));
        assert_eq!(
            parse_choice(&format!("-{huge}"), 3),
            Err(InputError::OutOfRange { max: 3 })
        );
        assert_eq!(parse_choice("-", 3), Err(InputError::NotANumber));
        assert_eq!(parse_choice("12a", 3), Err(InputError::NotANumber));
    }

    #[test]
    fn test_paging_keys() {
        assert_eq!(parse_choice("n", 3), Ok(Choice::NextPage));
        assert_eq!(parse_choice("P", 3), Ok(Choice::PrevPage));
    }
}
