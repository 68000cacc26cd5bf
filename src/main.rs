use std::path::PathBuf ;
use std::process::ExitCode ;
use clap::Parser ;
use tracing::{ error, info, warn };
use tracing_subscriber::EnvFilter ;
use wasm_script_host::{ HostConfig, OptimizationLevel, ScriptExecutor, UnloadOutcome };



/// Compile a component script, run its `execute` entry point and confirm it unloads.
#[derive( Parser, Debug )]
#[command( name = "wasm-script-host", version )]
struct Args {
	/// Script source in the WebAssembly text format
	#[arg( value_name = "FILE" )]
	script: PathBuf,

	/// Boundary root: holds `deps.json` and serves as the runtime library directory
	#[arg( long, value_name = "DIR" )]
	base_dir: Option<PathBuf>,

	/// Component the script may import from (repeatable)
	#[arg( long = "reference", value_name = "FILE" )]
	references: Vec<String>,

	/// Argument passed to the entry point
	#[arg( long, default_value = "Mary" )]
	name: String,

	/// Host configuration file (TOML)
	#[arg( long, value_name = "FILE" )]
	config: Option<PathBuf>,

	/// Compile without optimisation
	#[arg( long )]
	debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {

	tracing_subscriber::fmt()
		.with_env_filter( EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new( "info" )))
		.init();

	let args = Args::parse();

	let config = match &args.config {
		Some( path ) => match HostConfig::from_file( path ) {
			Ok( config ) => config,
			Err( err ) => { error!( "{}", err ); return ExitCode::FAILURE }
		},
		None => HostConfig::default(),
	};
	let config = match args.debug {
		true => config.with_optimization_level( OptimizationLevel::Debug ),
		false => config,
	};

	let source = match std::fs::read_to_string( &args.script ) {
		Ok( source ) => source,
		Err( err ) => { error!( script = %args.script.display(), "{}", err ); return ExitCode::FAILURE }
	};

	let base_dir = args.base_dir.clone()
		.or_else(|| args.script.parent().map( PathBuf::from ))
		.filter(| dir | !dir.as_os_str().is_empty() )
		.unwrap_or_else(|| PathBuf::from( "." ));

	let executor = ScriptExecutor::new( config );
	let report = match executor.execute_entry_point( &base_dir, &source, &args.references, &args.name, None ).await {
		Ok( report ) => report,
		Err( err ) => { error!( "{}", err ); return ExitCode::FAILURE }
	};

	match report.unload {
		UnloadOutcome::Reclaimed { attempts } => info!( attempts, "script unloaded" ),
		UnloadOutcome::Exhausted { attempts } => warn!( attempts, "script is still loaded" ),
	}

	match report.result {
		Ok( Ok( output )) => {
			println!( "{}", output );
			ExitCode::SUCCESS
		}
		Ok( Err( err )) => {
			error!( "{}", err );
			ExitCode::FAILURE
		}
		Err( diagnostics ) => {
			diagnostics.iter().for_each(| diagnostic | eprintln!( "{}", diagnostic ));
			ExitCode::FAILURE
		}
	}

}
