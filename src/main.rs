use std::{fs, io, path::Path, process::ExitCode};

use cpuident::{CpuFeature, CpuIdentity, RawCpuData, Vendor};
use cpuident_base::EnumFromNameT;
use cpuident_logging::{log_error, log_info, log_verbose, set_logger, LogCategory, Logger};

mod cli;
mod settings;

use cli::{exit, Cli};
use settings::Settings;

pub const LOG_CAT : LogCategory = LogCategory::new("Main");

const DEFAULT_SETTINGS_FILE: &str = "cpuident.toml";

static LOGGER: Logger = Logger::new();

fn load_settings(cli: &Cli) -> Settings {
    let path = match &cli.config {
        Some(path) => path.as_path(),
        None if Path::new(DEFAULT_SETTINGS_FILE).is_file() => Path::new(DEFAULT_SETTINGS_FILE),
        None => return Settings::default(),
    };

    let toml = match fs::read_to_string(path) {
        Ok(toml) => toml,
        Err(err) => exit!(2 => "Failed to read '{}': {}", path.display(), err),
    };
    match Settings::load(&toml) {
        Some(settings) => settings,
        None => exit!(2 => "Invalid settings file '{}'", path.display()),
    }
}

fn configure_logger(settings: &Settings) {
    let logger = &LOGGER;
    logger.set_max_level(settings.log.level);
    logger.set_always_flush(settings.log.always_flush);
    logger.set_log_to_console(settings.log.console);

    if let Some(path) = &settings.log.file {
        match fs::File::create(path) {
            Ok(file) => if logger.add_writer(Box::new(file)).is_err() {
                log_error!(LOG_CAT, configure_logger, "No free log writer slot for '{}'", path.display());
            },
            Err(err) => log_error!(LOG_CAT, configure_logger, "Failed to create log file '{}': {}", path.display(), err),
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Installed with its defaults first, so settings errors are reported
    set_logger(&LOGGER);
    let _flush = scopeguard::guard((), |_| LOGGER.flush());

    let settings = load_settings(&cli);
    configure_logger(&settings);

    match run(&cli, &settings) {
        Ok(code) => code,
        Err(err) => {
            log_error!(LOG_CAT, main, "{}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, settings: &Settings) -> cpuident::Result<ExitCode> {
    if let Some(name) = &cli.list {
        return list_codenames(name);
    }

    let raw = match &cli.load {
        Some(path) => {
            log_verbose!(LOG_CAT, "Loading snapshot '{}'", path.display());
            RawCpuData::load(path)?
        },
        None => cpuident::capture_raw()?,
    };

    let mut identity = cpuident::identify_raw(&raw);
    if cli.load.is_none() {
        identity.total_logical_cpus = u32::try_from(cpuident::total_logical_cpus()).ok();
    }

    if let Some(path) = &cli.save {
        raw.save(path)?;
        log_info!(LOG_CAT, "Saved raw data to '{}'", path.display());
    }

    if let Some(name) = &cli.has {
        return has_feature(&identity, name);
    }

    if cli.toml {
        match toml::to_string(&identity) {
            Ok(text) => print!("{text}"),
            Err(err) => exit!(1 => "Failed to serialize the identity: {}", err),
        }
    } else {
        println!("{identity}");
    }

    if cli.features || settings.output.features {
        println!();
        for feature in identity.features.iter() {
            println!("{feature}");
        }
    }

    if cli.raw || settings.output.raw {
        println!();
        raw.serialize(io::stdout().lock())?;
    }
    Ok(ExitCode::SUCCESS)
}

fn list_codenames(name: &str) -> cpuident::Result<ExitCode> {
    let Some(vendor) = Vendor::parse(name) else {
        eprintln!("Unknown vendor '{name}'");
        return Ok(ExitCode::from(2));
    };

    for codename in cpuident::list_known_cpus(vendor)? {
        println!("{codename}");
    }
    Ok(ExitCode::SUCCESS)
}

fn has_feature(identity: &CpuIdentity, name: &str) -> cpuident::Result<ExitCode> {
    let Some(feature) = CpuFeature::parse(name) else {
        eprintln!("Unknown feature '{name}'");
        return Ok(ExitCode::from(2));
    };

    let present = identity.has_feature(feature);
    log_verbose!(LOG_CAT, "{} present: {}", feature, present);
    Ok(if present { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
