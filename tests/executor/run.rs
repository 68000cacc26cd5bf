use std::sync::Arc ;
use std::sync::atomic::{ AtomicBool, Ordering };
use std::time::Duration ;
use wasm_script_host::{ HostConfig, ScriptExecutor, UnloadMonitor, UnloadOutcome };

#[tokio::test]
async fn executor_run_unloads_after_callback() {

	let executor = ScriptExecutor::new( HostConfig::default() );
	let dir = tempfile::tempdir().unwrap();
	let called = Arc::new( AtomicBool::new( false ));

	let run = executor.run( dir.path(), &crate::fixtures::source( "greeter.wat" ), Vec::<String>::new(), {
		let called = Arc::clone( &called );
		| module | async move {
			called.store( true, Ordering::SeqCst );
			module.resolve_entry_point().unwrap().interface().to_string()
		}
	}).await.unwrap();

	assert!( called.load( Ordering::SeqCst ));
	assert_eq!( run.result.unwrap(), "script:greeter/entry" );
	assert!( !run.handle.is_live() );

}

#[tokio::test]
async fn executor_run_skips_callback_on_failure() {

	let executor = ScriptExecutor::new( HostConfig::default() );
	let dir = tempfile::tempdir().unwrap();

	let run = executor.run( dir.path(), "(component (import \"script:missing/api\" (instance)))", Vec::<String>::new(), | _module | async {
		panic!( "Callback must not run" );
	}).await.unwrap();

	match run.result {
		Err( diagnostics ) => assert_eq!( diagnostics.len(), 1 ),
		Ok(()) => panic!( "Expected diagnostics" ),
	}

}

#[tokio::test]
async fn executor_run_and_unload_detects_leak() {

	let config = HostConfig::default().with_unload_monitor( UnloadMonitor::new( 2, Duration::from_millis( 1 )));
	let executor = ScriptExecutor::new( config );
	let dir = tempfile::tempdir().unwrap();

	let report = executor.run_and_unload( dir.path(), &crate::fixtures::source( "greeter.wat" ), Vec::<String>::new(), None, | module | async move {
		module
	}).await.unwrap();

	assert_eq!( report.unload, UnloadOutcome::Exhausted { attempts: 2 });
	drop( report );

}
