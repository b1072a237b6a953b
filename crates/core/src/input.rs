use std::{
    io::{BufRead, Write},
    num::IntErrorKind,
};

use crate::error::InputError;

pub const PACKETS_PROMPT: &str = "Number of packets per user : ";

pub fn parse_packets_per_user(raw: &str) -> Result<u32, InputError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(InputError::Empty);
    }
    value.parse::<u32>().map_err(|err| match err.kind() {
        IntErrorKind::PosOverflow => InputError::TooLarge(value.to_owned()),
        _ if value.starts_with('-') && value[1..].parse::<u64>().is_ok() => {
            InputError::Negative(value.to_owned())
        }
        _ => InputError::NotANumber(value.to_owned()),
    })
}

/// Writes the prompt to `output` and parses one line read from `input`.
pub fn read_packets_per_user<R: BufRead, W: Write>(
    mut input: R,
    mut output: W,
) -> Result<u32, InputError> {
    output.write_all(PACKETS_PROMPT.as_bytes())?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    parse_packets_per_user(&line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_whole_numbers() {
        assert_eq!(parse_packets_per_user("5").unwrap(), 5);
        assert_eq!(parse_packets_per_user("  12\n").unwrap(), 12);
        assert_eq!(parse_packets_per_user("0").unwrap(), 0);
    }

    #[test]
    fn test_rejects_bad_answers() {
        assert!(matches!(parse_packets_per_user(""), Err(InputError::Empty)));
        assert!(matches!(parse_packets_per_user(" \n"), Err(InputError::Empty)));
        assert!(matches!(
            parse_packets_per_user("five"),
            Err(InputError::NotANumber(_))
        ));
        assert!(matches!(
            parse_packets_per_user("2.5"),
            Err(InputError::NotANumber(_))
        ));
        assert!(matches!(
            parse_packets_per_user("-3"),
            Err(InputError::Negative(_))
        ));
        assert!(matches!(
            parse_packets_per_user("99999999999"),
            Err(InputError::TooLarge(_))
        ));
    }

    #[test]
    fn test_prompt_then_read() {
        let mut out = Vec::new();
        let n = read_packets_per_user(&b"7\n"[..], &mut out).unwrap();
        assert_eq!(n, 7);
        assert_eq!(out, PACKETS_PROMPT.as_bytes());
    }

    #[test]
    fn test_closed_stdin_is_empty() {
        let err = read_packets_per_user(&b""[..], Vec::new()).unwrap_err();
        assert!(matches!(err, InputError::Empty));
    }
}
