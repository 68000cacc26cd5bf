use wasm_script_host::{ OptimizationLevel, ScriptContext };

#[tokio::test]
async fn entry_point_greets() {

	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "greeter.wat" ),
		Vec::<String>::new(),
		|| {},
		OptimizationLevel::Debug,
	).unwrap();
	assert_no_diagnostics!( outcome.diagnostics );

	let module = outcome.module.unwrap();
	let entry_point = module.resolve_entry_point().unwrap();
	assert_eq!( entry_point.interface(), "script:greeter/entry" );
	assert_eq!( entry_point.function(), "execute" );

	let instance = entry_point.instantiate().unwrap();
	assert_eq!( instance.execute( "Mary", None ).await.unwrap(), "Hi there: 'Mary'" );
	assert_eq!( instance.execute( "", None ).await.unwrap(), "Hi there: ''" );

}

#[tokio::test]
async fn entry_point_instances_are_independent() {

	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "greeter.wat" ),
		Vec::<String>::new(),
		|| {},
		OptimizationLevel::Release,
	).unwrap();

	let entry_point = outcome.module.unwrap().resolve_entry_point().unwrap();
	let first = entry_point.instantiate().unwrap();
	let second = entry_point.instantiate().unwrap();

	let ( a, b ) = tokio::join!( first.execute( "Ada", None ), second.execute( "Grace", None ));
	assert_eq!( a.unwrap(), "Hi there: 'Ada'" );
	assert_eq!( b.unwrap(), "Hi there: 'Grace'" );

}
