use wasm_script_host::{ EntryPointError, HostConfig, ScriptError, ScriptExecutor };

#[tokio::test]
async fn executor_memory_limit_rejects_instance() {

	// The greeter needs one 64 KiB page.
	let executor = ScriptExecutor::new( HostConfig::default().with_max_memory_bytes( 1024 ));
	let dir = tempfile::tempdir().unwrap();

	let report = executor.execute_entry_point( dir.path(), &crate::fixtures::source( "greeter.wat" ), Vec::<String>::new(), "Mary", None ).await.unwrap();

	match report.result {
		Ok( Err( ScriptError::EntryPoint( EntryPointError::Instantiation( _ )))) => {}
		value => panic!( "Expected Instantiation, found: {:#?}", value ),
	}
	assert!( report.unload.is_reclaimed() );

}

#[tokio::test]
async fn executor_memory_limit_allows_small_scripts() {

	let executor = ScriptExecutor::new( HostConfig::default().with_max_memory_bytes( 1 << 20 ));
	let dir = tempfile::tempdir().unwrap();

	let report = executor.execute_entry_point( dir.path(), &crate::fixtures::source( "greeter.wat" ), Vec::<String>::new(), "Mary", None ).await.unwrap();
	assert_eq!( report.result.unwrap().unwrap(), "Hi there: 'Mary'" );

}
