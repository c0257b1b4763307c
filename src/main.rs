use std::env::args;
use std::str::FromStr;
use std::string::ToString;

use condvar_locks::{
    config::{ConfigError, WorkloadOptions, USAGE},
    logging,
    workloads::{self, barber, binary_semaphore, readers_writers, swap},
};
use log::{error, info};
use strum::IntoEnumIterator;
use strum_macros::{self, Display, EnumIter, EnumString};

fn main() -> Result<(), String> {
    let mut args = args().skip(1);
    let workload = args
        .next()
        .ok_or(format!(
            "no workload supplied, use one of {} or see unit tests",
            Workload::iter()
                .map(|w| w.to_string())
                .collect::<Vec<String>>()
                .join(",")
        ))
        .and_then(|selector| {
            Workload::from_str(&selector).map_err(|e| format!("{e}: `{selector}'"))
        })?;

    let Some(options) = options(args)? else {
        return Ok(());
    };
    logging::init(options.log_level).map_err(|e| e.to_string())?;

    run(workload, &options).map_err(|e| {
        error!("{workload} failed: {e}");
        e.to_string()
    })
}

/// None when only the help was asked for. The usage goes to the terminal as is,
/// the error is kept to a single line.
fn options<I>(args: I) -> Result<Option<WorkloadOptions>, String>
where
    I: IntoIterator<Item = String>,
{
    match WorkloadOptions::parse(args) {
        Ok(options) => Ok(Some(options)),
        Err(ConfigError::HelpRequested) => {
            println!("Usage: condvar-locks <workload> [OPTION]...\n{USAGE}");
            Ok(None)
        }
        Err(e) => {
            eprintln!("Usage: condvar-locks <workload> [OPTION]...\n{USAGE}");
            Err(e.to_string())
        }
    }
}

fn run(workload: Workload, options: &WorkloadOptions) -> workloads::Result<()> {
    match workload {
        Workload::Swap => {
            let report = swap::run(options)?;
            info!(
                "{} swaps, {} snapshots, buffer {:?}",
                report.operations, report.snapshots, report.sorted
            );
        }
        Workload::ReadersWriters => {
            let report = readers_writers::run(options)?;
            info!(
                "counter {} after {} reads, up to {} readers at once",
                report.counter, report.reads, report.max_concurrent_readers
            );
        }
        Workload::Barber => {
            let report = barber::run(options)?;
            info!(
                "{} served, {} turned away, {} cuts",
                report.served, report.turned_away, report.cuts
            );
        }
        Workload::BinarySemaphore => {
            let total = binary_semaphore::run(options)?;
            info!("shared counter is {total}");
        }
    }
    Ok(())
}

#[derive(Clone, Copy, EnumIter, EnumString, Display)]
#[strum(serialize_all = "snake_case")]
enum Workload {
    Swap,
    ReadersWriters,
    Barber,
    BinarySemaphore,
}

#[cfg(test)]
mod test {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_option_errors_stay_on_one_line() {
        let e = options(args("--threads")).unwrap_err();
        assert_eq!("option `--threads' needs a value", e);
        assert!(!e.contains('\n'));
    }

    #[test]
    fn test_help_is_not_an_error() {
        assert_eq!(Ok(None), options(args("--help")));
        assert_eq!(3, options(args("-t 3")).unwrap().unwrap().threads);
    }

    #[test]
    fn test_workload_names() {
        assert!(matches!(
            Workload::from_str("readers_writers"),
            Ok(Workload::ReadersWriters)
        ));
        assert!(Workload::from_str("nope").is_err());
    }
}
