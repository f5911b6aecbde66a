use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use distro_rs_core::collaborator::{MavenRepository, Prompter, ZipArchiveReader};
use distro_rs_core::differential::Differ;
use distro_rs_core::{Config, DistroResolver, ResolverContext, ServerInstance};

fn main() {
	let mut opts;

	/* Parse console input */
	let parsed_options = {
		let args: Vec<String> = std::env::args().collect();

		opts = getopts::Options::new();
		opts.optflag( "h", "help",              "Show help");
		opts.optflag( "v", "verbose",           "Increased verbosity");
		opts.optopt(  "c", "config",            "Config file to use instead of the default", "FILE");
		opts.optmulti("D", "property",          "Property value overriding the distro, for `instance properties`", "KEY=VALUE");
		opts.optflag( "",  "refresh-snapshots", "Report installed snapshots as updates when the distro asks for the same snapshot");
		opts.parsing_style(getopts::ParsingStyle::FloatingFrees);

		let parsed_options = match opts.parse(&args[1..]) {
			Ok(m)  => { m }
			Err(e) => { println!("Unable to parse options: {}", e); return }
		};

		if parsed_options.opt_present("h") || parsed_options.free.is_empty() {
			eprintln!("{}", opts.usage(USAGE));
			return;
		}

		parsed_options
	};

	let default_filter = if parsed_options.opt_present("v") { "debug" } else { "info" };
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

	let config = match parsed_options.opt_str("c") {
		Some(path) => Config::load_from_file(path),
		None => Config::load_from_disk(),
	}.unwrap_or_else(|e| {
		log::warn!("Failed to read config file: {}", e);
		log::warn!("Using default config.");
		Config::default()
	});

	let free = &parsed_options.free;
	let result = match free[0].as_str() {
		"resolve" => arg(free, 1, "specifier").and_then(|specifier| resolve(&config, specifier)),
		"diff" => (|| {
			let server = arg(free, 1, "server directory or instance name")?;
			let specifier = arg(free, 2, "specifier")?;
			diff(&config, server, specifier, parsed_options.opt_present("refresh-snapshots"))
		})(),
		"instance" => match free.get(1).map(String::as_str) {
			Some("create") => (|| {
				let name = arg(free, 2, "instance name")?;
				let path = arg(free, 3, "server directory")?;
				let platform_version = arg(free, 4, "platform version")?;
				let db_driver = free.get(5).map(String::as_str).unwrap_or("mysql");
				create_instance(&config, name, path, platform_version, db_driver)
			})(),
			Some("properties") => (|| {
				let name = arg(free, 2, "instance name")?;
				let specifier = arg(free, 3, "specifier")?;
				let overrides = parse_overrides(&parsed_options.opt_strs("D"))?;
				apply_properties(&config, name, specifier, &overrides)
			})(),
			Some(other) => Err(Error::UnknownCommand(format!("instance {other}"))),
			None => Err(Error::MissingArgument("instance subcommand")),
		},
		other => Err(Error::UnknownCommand(other.to_string())),
	};

	if let Err(e) = result {
		report(&e);
		std::process::exit(1);
	}
}

const USAGE: &str = "\
Usage:
    distro-rs resolve <specifier>
    distro-rs diff <server directory | instance name> <specifier>
    distro-rs instance create <name> <server directory> <platform version> [db driver]
    distro-rs instance properties <name> <specifier> [-D KEY=VALUE]...

A specifier is a descriptor file path or a coordinate: [group:]artifact:version.
The version may be LATEST or LATEST-SNAPSHOT.";

fn arg<'a>(free: &'a [String], index: usize, name: &'static str) -> Result<&'a str, Error> {
	free.get(index).map(String::as_str).ok_or(Error::MissingArgument(name))
}

fn parse_overrides(raw: &[String]) -> Result<HashMap<String, String>, Error> {
	raw.iter()
		.map(|s| match s.split_once('=') {
			Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
			_ => Err(Error::InvalidOverride(s.clone())),
		})
		.collect()
}

fn resolve_descriptor(config: &Config, specifier: &str) -> Result<distro_rs_core::Descriptor, Error> {
	let repository = MavenRepository::new(config)?;
	let context = ResolverContext::new(std::env::current_dir()?);
	let resolver = DistroResolver::new(context, &repository, &ZipArchiveReader)
		.version_lookup(&repository);
	Ok(resolver.resolve(specifier)?)
}

fn resolve(config: &Config, specifier: &str) -> Result<(), Error> {
	let descriptor = resolve_descriptor(config, specifier)?;
	print!("{}", descriptor.render());
	Ok(())
}

fn diff(config: &Config, server: &str, specifier: &str, refresh_snapshots: bool) -> Result<(), Error> {
	let installed = if Path::new(server).is_dir() {
		log::debug!("Scanning {} for installed artifacts", server);
		distro_rs_core::server::scan_installed_artifacts(server)?
	} else {
		ServerInstance::load_by_name(config, server)?.artifacts().to_vec()
	};

	let descriptor = resolve_descriptor(config, specifier)?;
	let differential = Differ::new()
		.refresh_snapshots(refresh_snapshots)
		.diff(&installed, &descriptor.target_artifacts())?;

	print!("{}", differential);
	Ok(())
}

fn create_instance(config: &Config, name: &str, path: &str, platform_version: &str, db_driver: &str) -> Result<(), Error> {
	log::trace!("Attempting to create new instance");
	let instance = ServerInstance::new(config, name, path, platform_version, db_driver)?;

	log::debug!("Saving new instance to disk.");
	instance.save_to_disk(config)?;

	log::info!("Created new instance {} with {} artifacts.", instance.name(), instance.artifacts().len());
	Ok(())
}

fn apply_properties(config: &Config, name: &str, specifier: &str, overrides: &HashMap<String, String>) -> Result<(), Error> {
	let mut instance = ServerInstance::load_by_name(config, name)?;
	let descriptor = resolve_descriptor(config, specifier)?;

	instance.apply_properties(&descriptor, overrides, &StdinPrompter)?;
	instance.save_to_disk(config)?;

	for (key, value) in instance.properties() {
		println!("{key}={value}");
	}
	Ok(())
}

/// Reads answers from the terminal.
struct StdinPrompter;

impl Prompter for StdinPrompter {
	fn prompt(&self, text: &str, default: Option<&str>) -> distro_rs_core::Result<String> {
		match default {
			Some(d) => print!("{text} [{d}]: "),
			None => print!("{text}: "),
		}
		std::io::stdout().flush()?;

		let mut input = String::new();
		if std::io::stdin().read_line(&mut input)? == 0 {
			return Err(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no input for prompt").into())
		}
		let input = input.trim();
		match default {
			Some(d) if input.is_empty() => Ok(d.to_string()),
			_ => Ok(input.to_string()),
		}
	}
}

/// Logs an error with a hint on what to do about it.
fn report(e: &Error) {
	use distro_rs_core::Error as Core;
	match e {
		Error::Core(Core::InvalidSpecifier(s)) => log::error!("\"{}\" is not a distro. Use a descriptor file path or [group:]artifact:version.", s),
		Error::Core(Core::UnsupportedVersion(s)) => log::error!("{}. Pick a newer release.", s),
		Error::Core(Core::CoreArtifactDeletionAttempted(a)) => log::error!("The distro does not name a platform but the server runs {}. Add war.openmrs to the distro.", a),
		Error::Core(Core::DescriptorMissing(a)) => log::error!("{} does not contain a distro descriptor.", a),
		Error::Core(Core::AlreadyExists) => log::error!("An instance with this name or server directory already exists."),
		other => log::error!("{}", other),
	}
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("distro-rs error: {0}")]
	Core(#[from] distro_rs_core::Error),
	#[error("IO error: {0}")]
	IO(#[from] std::io::Error),
	#[error("Missing argument: {0}")]
	MissingArgument(&'static str),
	#[error("Invalid property override \"{0}\", expected KEY=VALUE")]
	InvalidOverride(String),
	#[error("Unknown command: {0}")]
	UnknownCommand(String),
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn overrides_are_split_on_first_equals() {
		let parsed = parse_overrides(&["a=b=c".to_string(), " k = v ".to_string()]).unwrap();
		assert_eq!(parsed["a"], "b=c");
		assert_eq!(parsed["k"], "v");
	}

	#[test]
	fn override_without_key_is_rejected() {
		assert!(matches!(parse_overrides(&["=v".to_string()]), Err(Error::InvalidOverride(_))));
		assert!(matches!(parse_overrides(&["novalue".to_string()]), Err(Error::InvalidOverride(_))));
	}

	#[test]
	fn missing_argument_is_named() {
		let free = vec!["resolve".to_string()];
		assert!(matches!(arg(&free, 1, "specifier"), Err(Error::MissingArgument("specifier"))));
	}
}
