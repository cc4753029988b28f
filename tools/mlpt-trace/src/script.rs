//! Trace script parsing.
//!
//! One command per line; `#` starts a comment and blank lines are skipped.
//!
//! ```text
//! allocate   0x400
//! translate  0x4ff
//! deallocate 0x400
//! root
//! stats
//! ```

use crate::error::TraceError;
use mlpt_vmem::VirtualAddress;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Command {
    Allocate(VirtualAddress),
    Translate(VirtualAddress),
    Deallocate(VirtualAddress),
    Root,
    Stats,
}

/// Parse a whole script.
pub fn parse(source: &str) -> Result<Vec<Command>, TraceError> {
    let mut commands = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let line = i + 1;
        let text = raw.split('#').next().unwrap_or_default();
        let mut words = text.split_whitespace();
        let Some(verb) = words.next() else {
            continue;
        };
        let args: Vec<&str> = words.collect();

        let command = match verb.to_ascii_lowercase().as_str() {
            "allocate" | "alloc" => Command::Allocate(address(line, "allocate", &args)?),
            "translate" | "tr" => Command::Translate(address(line, "translate", &args)?),
            "deallocate" | "dealloc" => Command::Deallocate(address(line, "deallocate", &args)?),
            "root" => no_args(line, "root", &args, Command::Root)?,
            "stats" => no_args(line, "stats", &args, Command::Stats)?,
            _ => {
                return Err(TraceError::UnknownCommand {
                    line,
                    command: verb.to_owned(),
                });
            }
        };
        commands.push(command);
    }
    Ok(commands)
}

fn address(
    line: usize,
    command: &'static str,
    args: &[&str],
) -> Result<VirtualAddress, TraceError> {
    let [text] = args else {
        return Err(TraceError::Arity {
            line,
            command,
            expected: 1,
        });
    };
    parse_number(text)
        .map(VirtualAddress::new)
        .ok_or_else(|| TraceError::InvalidAddress {
            line,
            text: (*text).to_owned(),
        })
}

fn no_args(
    line: usize,
    command: &'static str,
    args: &[&str],
    value: Command,
) -> Result<Command, TraceError> {
    if args.is_empty() {
        Ok(value)
    } else {
        Err(TraceError::Arity {
            line,
            command,
            expected: 0,
        })
    }
}

/// Parse `0x`-prefixed hexadecimal or decimal; `_` separators are allowed.
pub fn parse_number(text: &str) -> Option<u64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    match cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => cleaned.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_and_comments() {
        let script = "\
            # scenario from the docs\n\
            allocate 0x400\n\
            \n\
            translate 0x4FF   # same page\n\
            dealloc 1024\n\
            root\n\
            STATS\n";
        let commands = parse(script).unwrap();
        assert_eq!(
            commands,
            vec![
                Command::Allocate(VirtualAddress::new(0x400)),
                Command::Translate(VirtualAddress::new(0x4FF)),
                Command::Deallocate(VirtualAddress::new(1024)),
                Command::Root,
                Command::Stats,
            ]
        );
    }

    #[test]
    fn numbers() {
        assert_eq!(parse_number("0x7fff_f000"), Some(0x7FFF_F000));
        assert_eq!(parse_number("0XFF"), Some(0xFF));
        assert_eq!(parse_number("4096"), Some(4096));
        assert_eq!(parse_number("0xZZ"), None);
        assert_eq!(parse_number("-1"), None);
        assert_eq!(parse_number(""), None);
    }

    #[test]
    fn reports_line_numbers() {
        let err = parse("allocate 0x400\nfrobnicate 1\n").unwrap_err();
        assert!(matches!(err, TraceError::UnknownCommand { line: 2, .. }));

        let err = parse("\n\ntranslate\n").unwrap_err();
        assert!(matches!(
            err,
            TraceError::Arity {
                line: 3,
                command: "translate",
                expected: 1
            }
        ));

        let err = parse("stats now\n").unwrap_err();
        assert!(matches!(err, TraceError::Arity { line: 1, expected: 0, .. }));

        let err = parse("deallocate 0xG\n").unwrap_err();
        assert_eq!(err.to_string(), "line 1: invalid address \"0xG\"");
    }
}
