//! Replays a page table script against a fresh address space.
//!
//! ```text
//! mlpt-trace [--levels N] [--pobits N] [SCRIPT]
//! ```
//!
//! Reads the script from stdin when no path is given. The geometry defaults
//! to the build-time configuration; `MLPT_LOG` selects the log level
//! (`error`, `warn`, `info`, `debug`, `trace`; default `warn`).

mod error;
mod logger;
mod script;

use crate::error::TraceError;
use crate::logger::StderrLogger;
use crate::script::{Command, parse_number};
use log::LevelFilter;
use mlpt_vmem::{AddressSpace, CountingStore, Geometry, HostStore, TableStore};
use std::io::{self, Write};
use std::process::ExitCode;
use std::{env, fs};

const USAGE: &str = "usage: mlpt-trace [--levels N] [--pobits N] [SCRIPT]";

fn main() -> ExitCode {
    let max_level = env::var("MLPT_LOG")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(LevelFilter::Warn);
    if let Err(e) = StderrLogger::new(max_level).init() {
        eprintln!("mlpt-trace: logging unavailable: {e}");
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mlpt-trace: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), TraceError> {
    let options = Options::parse(env::args().skip(1))?;
    let source = match &options.script {
        Some(path) => fs::read_to_string(path)?,
        None => io::read_to_string(io::stdin())?,
    };
    let commands = script::parse(&source)?;

    let mut space = AddressSpace::new(options.geometry, CountingStore::new(HostStore));
    let mut out = io::stdout().lock();
    for command in &commands {
        writeln!(out, "{}", execute(&mut space, *command))?;
    }

    let stats = space.store().stats();
    writeln!(
        out,
        "store: allocated={} freed={} failed={} live={}",
        stats.allocated,
        stats.freed,
        stats.failed,
        stats.live()
    )?;
    Ok(())
}

/// Command-line options.
#[derive(Debug, PartialEq, Eq)]
struct Options {
    geometry: Geometry,
    script: Option<String>,
}

impl Options {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, TraceError> {
        let mut levels = Geometry::CONFIGURED.levels();
        let mut pobits = Geometry::CONFIGURED.pobits();
        let mut script = None;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--levels" => levels = numeric_flag(&arg, args.next().as_deref())?,
                "--pobits" => pobits = numeric_flag(&arg, args.next().as_deref())?,
                "-h" | "--help" => return Err(TraceError::Usage(USAGE.to_owned())),
                flag if flag.starts_with("--") => {
                    return Err(TraceError::Usage(format!("unknown option {flag}\n{USAGE}")));
                }
                _ if script.is_none() => script = Some(arg),
                _ => return Err(TraceError::Usage(USAGE.to_owned())),
            }
        }

        Ok(Self {
            geometry: Geometry::new(levels, pobits)?,
            script,
        })
    }
}

fn numeric_flag<T: TryFrom<u64>>(flag: &str, value: Option<&str>) -> Result<T, TraceError> {
    value
        .and_then(parse_number)
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| TraceError::Usage(format!("{flag} expects a number\n{USAGE}")))
}

/// Run one command and describe its outcome.
fn execute<S: TableStore>(space: &mut AddressSpace<S>, command: Command) -> String {
    match command {
        Command::Allocate(va) => match space.try_page_allocate(va) {
            Ok(page) => format!("allocate {va} -> page {page}"),
            Err(e) => format!("allocate {va} -> failed: {e}"),
        },
        Command::Translate(va) => match space.query(va) {
            Some(pa) => format!("translate {va} -> {pa}"),
            None => format!("translate {va} -> unmapped"),
        },
        Command::Deallocate(va) => {
            format!("deallocate {va} -> {}", u8::from(space.page_deallocate(va)))
        }
        Command::Root => format!("root -> {:#x}", space.root_register().as_u64()),
        Command::Stats => {
            let stats = space.stats();
            format!("stats -> tables={} pages={}", stats.tables, stats.pages)
        }
    }
}
