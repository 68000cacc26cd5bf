use std::time::Duration ;
use wasm_script_host::{ CancellationToken, OptimizationLevel, ScriptContext, UnloadError, UnloadMonitor };

#[tokio::test]
async fn unload_monitor_cancelled() {

	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "greeter.wat" ),
		Vec::<String>::new(),
		|| {},
		OptimizationLevel::Debug,
	).unwrap();

	let _leaked = outcome.module.unwrap();
	let handle = outcome.context.unload();

	let token = CancellationToken::new();
	let canceller = {
		let token = token.clone();
		tokio::spawn( async move {
			tokio::time::sleep( Duration::from_millis( 20 )).await ;
			token.cancel();
		})
	};

	let monitor = UnloadMonitor::new( 1_000, Duration::from_millis( 5 ));
	let result = monitor.wait_for_unload( &handle, Some( &token )).await ;
	canceller.await.unwrap();

	match result {
		Err( UnloadError::Cancelled { id, attempts }) => {
			assert_eq!( id, handle.id() );
			assert!( attempts < 1_000 );
		}
		value => panic!( "Expected Cancelled, found: {:#?}", value ),
	}
	assert!( handle.is_live() );

}

#[tokio::test]
async fn unload_monitor_from_config() {

	let config = wasm_script_host::HostConfig::from_toml_str( "unload-max-attempts = 2\nunload-delay-ms = 1" ).unwrap();
	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile_with(
		&config,
		dir.path(),
		&crate::fixtures::source( "greeter.wat" ),
		Vec::<String>::new(),
		|| {},
	).unwrap();

	let _leaked = outcome.module.unwrap();
	let handle = outcome.context.unload();
	let result = config.monitor().wait_for_unload( &handle, None ).await.unwrap();

	assert!( !result.is_reclaimed() );
	assert_eq!( result.attempts(), 2 );

}
