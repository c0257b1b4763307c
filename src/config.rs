//! Options for the workloads.
//!
//! The defaults are the ones the exercises start with. Everything can be overridden with `--name value`
//! or `--name=value`, some options have a short `-x value` form too.

use std::{str::FromStr, time::Duration};

use log::LevelFilter;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown option `{0}'")]
    UnknownOption(String),

    #[error("option `{0}' needs a value")]
    MissingValue(String),

    #[error("`{value}' is not a valid value for `{option}'")]
    InvalidValue { option: String, value: String },

    #[error("`{0}' must be greater than 0")]
    NotPositive(String),

    #[error("help requested")]
    HelpRequested,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadOptions {
    pub threads: usize,
    pub buffer_size: usize,
    pub iterations: usize,
    /// swap workers draw from this many operations in total instead of `iterations` each
    pub shared_iterations: Option<usize>,
    /// pause between the steps of an operation to force context switches
    pub delay: Duration,
    pub readers: usize,
    pub writers: usize,
    pub barbers: usize,
    pub customers: usize,
    pub seats: usize,
    pub cut_time: Duration,
    /// run a printer thread snapshotting the swap buffer this often
    pub print_period: Option<Duration>,
    pub log_level: LevelFilter,
}

impl Default for WorkloadOptions {
    fn default() -> Self {
        Self {
            threads: 10,
            buffer_size: 10,
            iterations: 10,
            shared_iterations: None,
            delay: Duration::from_micros(10),
            readers: 5,
            writers: 2,
            barbers: 5,
            customers: 100,
            seats: 5,
            cut_time: Duration::from_micros(1000),
            print_period: None,
            log_level: LevelFilter::Info,
        }
    }
}

pub const USAGE: &str = "\
Options:
  -t n, --threads=<n>       number of worker threads
  -b n, --buffer-size=<n>   number of slots in the swap buffer
  -i n, --iterations=<n>    operations per thread
  -g n, --shared-iterations=<n>
                            swap operations shared by all the threads
  -d n, --delay=<n>         microseconds between steps of an operation
  -r n, --readers=<n>       number of reader threads
  -w n, --writers=<n>       number of writer threads
        --barbers=<n>       number of barber threads
  -c n, --customers=<n>     number of customer threads
  -s n, --seats=<n>         number of waiting room seats
        --cut-time=<n>      microseconds a hair cut takes
  -p n, --print-period=<n>  microseconds between buffer snapshots
  -l l, --log-level=<l>     off, error, warn, info, debug or trace
  -h,   --help              this message";

impl WorkloadOptions {
    /// Parse the options that follow the workload name
    pub fn parse<I>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            if arg == "-h" || arg == "--help" {
                return Err(ConfigError::HelpRequested);
            }
            // --name=value or --name value
            let (name, inline) = match arg.split_once('=') {
                Some((name, value)) => (name.to_string(), Some(value.to_string())),
                None => (arg, None),
            };
            let value = match inline {
                Some(value) => value,
                None => args
                    .next()
                    .ok_or_else(|| ConfigError::MissingValue(name.clone()))?,
            };
            options.set(&name, &value)?;
        }
        Ok(options)
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), ConfigError> {
        match name {
            "-t" | "--threads" => self.threads = positive(name, value)?,
            "-b" | "--buffer-size" => self.buffer_size = positive(name, value)?,
            "-i" | "--iterations" => self.iterations = positive(name, value)?,
            "-g" | "--shared-iterations" => {
                self.shared_iterations = Some(positive(name, value)?)
            }
            "-d" | "--delay" => self.delay = micros(name, value)?,
            "-r" | "--readers" => self.readers = positive(name, value)?,
            "-w" | "--writers" => self.writers = positive(name, value)?,
            "--barbers" => self.barbers = positive(name, value)?,
            "-c" | "--customers" => self.customers = positive(name, value)?,
            "-s" | "--seats" => self.seats = positive(name, value)?,
            "--cut-time" => self.cut_time = micros(name, value)?,
            "-p" | "--print-period" => {
                self.print_period = Some(Duration::from_micros(positive(name, value)? as u64))
            }
            "-l" | "--log-level" => self.log_level = parsed(name, value)?,
            _ => return Err(ConfigError::UnknownOption(name.to_string())),
        }
        Ok(())
    }
}

fn parsed<Y: FromStr>(name: &str, value: &str) -> Result<Y, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        option: name.to_string(),
        value: value.to_string(),
    })
}

fn positive(name: &str, value: &str) -> Result<usize, ConfigError> {
    match parsed(name, value)? {
        0 => Err(ConfigError::NotPositive(name.to_string())),
        n => Ok(n),
    }
}

// u64 can't be negative, so "-5" fails to parse => delays are always >= 0
fn micros(name: &str, value: &str) -> Result<Duration, ConfigError> {
    parsed(name, value).map(Duration::from_micros)
}
