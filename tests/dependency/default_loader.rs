use wasm_script_host::{ OptimizationLevel, ScriptContext, Severity };

#[tokio::test]
async fn dependency_from_reference() {

	let dir = crate::fixtures::base_dir( &[ "quote_single.wat" ]);
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "quoting_greeter.wat" ),
		[ "quote_single.wat" ],
		|| {},
		OptimizationLevel::Debug,
	).unwrap();
	assert_no_diagnostics!( outcome.diagnostics );

	let instance = outcome.module.unwrap().resolve_entry_point().unwrap().instantiate().unwrap();
	assert_eq!( instance.execute( "Mary", None ).await.unwrap(), "Hi there: 'Mary'" );

}

#[tokio::test]
async fn dependency_batch_skips_missing_reference() {

	let dir = crate::fixtures::base_dir( &[ "quote_single.wat" ]);
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "quoting_greeter.wat" ),
		[ "quote_single.wat", "does-not-exist.wasm" ],
		|| {},
		OptimizationLevel::Debug,
	).unwrap();

	assert_eq!( outcome.diagnostics.len(), 1, "{:?}", outcome.diagnostics );
	assert_eq!( outcome.diagnostics[0].severity(), Severity::Warning );
	assert!( outcome.diagnostics[0].message().contains( "does-not-exist.wasm" ));

	let instance = outcome.module.unwrap().resolve_entry_point().unwrap().instantiate().unwrap();
	assert_eq!( instance.execute( "Mary", None ).await.unwrap(), "Hi there: 'Mary'" );

}
