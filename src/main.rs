use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::sync::Arc;
use std::{env, fs, path};

use strmsync::config::{ConfigStore, DataDir, JsonConfigStore};
use strmsync::logging::*;
use strmsync::progress::{CliProgressCallback, SyncEvent};
use strmsync::utils::shutdown_signal;
use strmsync::validation::Validator;
use strmsync::{ReconciliationIndex, RunOptions, RunOutcome, Scheduler, SyncService, SyncStatus};

///////////////////////
// Utility functions //
///////////////////////

fn init_data_dir(matches: &ArgMatches) -> Result<DataDir, Box<dyn Error>> {
	let dir = match matches.get_one::<String>("data-dir") {
		Some(dir) => path::PathBuf::from(dir),
		None => match env::var("HOME") {
			Ok(home) => path::PathBuf::from(home).join(".strmsync"),
			Err(_e) => return Err("Could not determine HOME directory! Use --data-dir.".into()),
		},
	};

	match fs::metadata(&dir) {
		Ok(meta) if !meta.is_dir() => {
			Err(format!("{} exists, but it is not a directory!", dir.display()).into())
		}
		Ok(_) => Ok(DataDir::new(dir)),
		Err(_err) => {
			fs::create_dir_all(&dir).map_err(|err| format!("Cannot create directory: {}", err))?;
			Ok(DataDir::new(dir))
		}
	}
}

fn service(data_dir: DataDir, status: SyncStatus) -> SyncService {
	let store = Arc::new(JsonConfigStore::new(data_dir.settings_path()));
	SyncService::new(data_dir, store, Arc::new(status))
}

async fn cmd_sync(data_dir: DataDir, options: RunOptions) -> Result<(), Box<dyn Error>> {
	let status = SyncStatus::new().with_observer(Arc::new(CliProgressCallback::new()));
	match service(data_dir, status).run(options).await {
		RunOutcome::Completed(summary) => {
			println!(
				"Synced {} paths: {} written, {} kept, {} removed ({} indexed)",
				summary.unique_paths, summary.written, summary.skipped, summary.removed, summary.index_size
			);
			Ok(())
		}
		RunOutcome::Skipped => {
			println!("Tree unchanged, nothing to do");
			Ok(())
		}
		RunOutcome::Failed(message) => Err(message.into()),
		RunOutcome::Busy => Err("another sync is already running".into()),
	}
}

async fn cmd_daemon(data_dir: DataDir) -> Result<(), Box<dyn Error>> {
	// Operator log lines go to the tracing output
	let status = SyncStatus::new().with_observer(Arc::new(|event: SyncEvent| {
		if let SyncEvent::Log(line) = event {
			info!("{}", line);
		}
	}));
	let service = service(data_dir, status);
	service.load_config()?.validate()?;

	Scheduler::new(service).run_until(shutdown_signal()).await;
	Ok(())
}

fn cmd_config(data_dir: &DataDir) -> Result<(), Box<dyn Error>> {
	let store = JsonConfigStore::new(data_dir.settings_path());
	let config = store.load()?;
	eprintln!("settings: {}", store.path().display());
	println!("{}", serde_json::to_string_pretty(&config)?);
	if let Err(e) = config.validate() {
		eprintln!("warning: {}", e);
	}
	Ok(())
}

fn cmd_status(data_dir: &DataDir) -> Result<(), Box<dyn Error>> {
	let config = JsonConfigStore::new(data_dir.settings_path()).load()?;
	let index_path = data_dir.index_path();
	let indexed = if index_path.exists() { ReconciliationIndex::open(&index_path)?.len()? } else { 0 };

	println!("Pointer root:     {}", data_dir.strm_root(&config).display());
	println!("Indexed pointers: {}", indexed);
	if config.last_hash.is_empty() {
		println!("Last fingerprint: (none)");
	} else {
		println!("Last fingerprint: {}", config.last_hash);
	}
	match config.sync_interval_minutes {
		Some(minutes) if minutes > 0 => println!("Schedule:         every {} min", minutes),
		_ => println!("Schedule:         disabled"),
	}
	Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	init_tracing();

	let matches = Command::new("strmsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Mirror a remote media tree dump into .strm pointer files")
		.subcommand_required(true)
		.arg(
			Arg::new("data-dir")
				.short('d')
				.long("data-dir")
				.value_name("DIR")
				.global(true)
				.help("Data directory (default: ~/.strmsync)"),
		)
		.subcommand(
			Command::new("sync")
				.about("Run one sync now")
				.arg(
					Arg::new("force-full")
						.long("force-full")
						.action(ArgAction::SetTrue)
						.help("Rewrite every pointer file, ignoring the recorded fingerprint"),
				)
				.arg(
					Arg::new("use-local")
						.long("use-local")
						.action(ArgAction::SetTrue)
						.help("Process the existing tree document without downloading"),
				),
		)
		.subcommand(Command::new("daemon").about("Run scheduled syncs until interrupted"))
		.subcommand(Command::new("config").about("Print the effective settings"))
		.subcommand(Command::new("status").about("Print index size and last fingerprint"))
		.get_matches();

	let data_dir = init_data_dir(&matches)?;

	if let Some(sub_matches) = matches.subcommand_matches("sync") {
		let options = RunOptions {
			force_full: sub_matches.get_flag("force-full"),
			use_local: sub_matches.get_flag("use-local"),
		};
		cmd_sync(data_dir, options).await
	} else if matches.subcommand_matches("daemon").is_some() {
		cmd_daemon(data_dir).await
	} else if matches.subcommand_matches("config").is_some() {
		cmd_config(&data_dir)
	} else if matches.subcommand_matches("status").is_some() {
		cmd_status(&data_dir)
	} else {
		Ok(())
	}
}

// vim: ts=4
