use std::path::PathBuf;

macro_rules! exit {
    ($code:expr => $($arg:tt)*) => {{
        eprintln!($($arg)*);
        std::process::exit($code);
    }};
}
pub(crate) use exit;

const HELP: &str = "OVERVIEW: CPU identification tool

USAGE: cpuident [options]

OPTIONS:
  -h, --help              Print usage information
  -c, --config <FILE>     Settings file (default: cpuident.toml if present)
  -l, --load <FILE>       Identify from a raw snapshot instead of the running CPU
  -s, --save <FILE>       Save the captured raw data as a snapshot
  -r, --raw               Dump the raw register data after the report
  -f, --features          Print the feature list one feature per line
      --list <VENDOR>     Print the codenames known for a vendor
      --has <FEATURE>     Exit with 0 when the feature is present, 1 otherwise
      --toml              Print the identity as TOML";

/// Parsed command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cli {
    /// Path to the settings file.
    pub config: Option<PathBuf>,

    /// Snapshot to identify instead of querying the CPU.
    pub load: Option<PathBuf>,

    /// Where to save the captured raw data.
    pub save: Option<PathBuf>,

    /// Vendor whose known codenames are listed.
    pub list: Option<String>,

    /// Feature to check for.
    pub has: Option<String>,

    pub raw: bool,
    pub features: bool,
    pub toml: bool,
}

impl Cli {
    pub fn parse() -> Self {
        match Self::parse_from(std::env::args().skip(1)) {
            Ok(Some(cli)) => cli,
            Ok(None) => exit!(0 => "{}", HELP),
            Err(err) => exit!(2 => "{}\n\n{}", err, HELP),
        }
    }

    /// Parse the arguments following the program name, `None` when help was requested.
    pub fn parse_from<I: IntoIterator<Item = String>>(args: I) -> Result<Option<Self>, String> {
        let mut cli = Cli::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "-c" | "--config" => cli.config = Some(PathBuf::from(value(&arg, args.next())?)),
                "-l" | "--load" => cli.load = Some(PathBuf::from(value(&arg, args.next())?)),
                "-s" | "--save" => cli.save = Some(PathBuf::from(value(&arg, args.next())?)),
                "--list" => cli.list = Some(value(&arg, args.next())?),
                "--has" => cli.has = Some(value(&arg, args.next())?),
                "-r" | "--raw" => cli.raw = true,
                "-f" | "--features" => cli.features = true,
                "--toml" => cli.toml = true,
                unknown => return Err(format!("Unknown cmd arg '{}' was entered.", unknown)),
            }
        }

        if cli.load.is_some() && cli.save.is_some() {
            return Err(String::from("'--load' and '--save' can't be combined"));
        }
        Ok(Some(cli))
    }
}

fn value(flag: &str, next: Option<String>) -> Result<String, String> {
    match next {
        Some(val) if !val.starts_with('-') => Ok(val),
        _ => Err(format!("'{}' expects a value", flag)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Cli>, String> {
        Cli::parse_from(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn no_args() {
        assert_eq!(parse(&[]), Ok(Some(Cli::default())));
    }

    #[test]
    fn help() {
        assert_eq!(parse(&["-r", "--help"]), Ok(None));
    }

    #[test]
    fn values_and_flags() {
        let cli = parse(&["-c", "my.toml", "--load", "kaby.txt", "--has", "avx2", "-f", "--toml"]).unwrap().unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
        assert_eq!(cli.load, Some(PathBuf::from("kaby.txt")));
        assert_eq!(cli.has.as_deref(), Some("avx2"));
        assert!(cli.features);
        assert!(cli.toml);
        assert!(!cli.raw);
        assert!(cli.save.is_none());
    }

    #[test]
    fn missing_value() {
        assert!(parse(&["--list"]).is_err());
        assert!(parse(&["-s", "-r"]).is_err());
    }

    #[test]
    fn unknown_arg() {
        assert_eq!(parse(&["--frobnicate"]), Err(String::from("Unknown cmd arg '--frobnicate' was entered.")));
    }

    #[test]
    fn load_and_save_conflict() {
        assert!(parse(&["-l", "a.txt", "-s", "b.txt"]).is_err());
    }
}
