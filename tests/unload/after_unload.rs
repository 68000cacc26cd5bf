use wasm_script_host::{ EntryPointError, InvocationError, Lifecycle, OptimizationLevel, ScriptContext };

#[tokio::test]
async fn unload_rejects_further_use() {

	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "greeter.wat" ),
		Vec::<String>::new(),
		|| {},
		OptimizationLevel::Debug,
	).unwrap();

	let module = outcome.module.unwrap();
	let entry_point = module.resolve_entry_point().unwrap();
	let instance = entry_point.instantiate().unwrap();
	let observer = outcome.context.observe();

	let handle = outcome.context.unload();
	assert_eq!( handle.id(), observer.id() );

	match module.resolve_entry_point() {
		Err( EntryPointError::Unloaded ) => {}
		value => panic!( "Expected Unloaded, found: {:#?}", value ),
	}
	match entry_point.instantiate() {
		Err( EntryPointError::Unloaded ) => {}
		value => panic!( "Expected Unloaded, found: {:#?}", value ),
	}
	match instance.execute( "Mary", None ).await {
		Err( InvocationError::Unloaded ) => {}
		value => panic!( "Expected Unloaded, found: {:#?}", value ),
	}

	drop(( module, entry_point, instance ));
	assert!( !observer.is_live() );

}

#[test]
fn unload_lifecycle() {

	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "greeter.wat" ),
		Vec::<String>::new(),
		|| {},
		OptimizationLevel::Debug,
	).unwrap();

	let module = outcome.module.unwrap();
	assert_eq!( outcome.context.lifecycle(), Lifecycle::Active );
	assert_eq!( module.context_id(), outcome.context.id() );

	let handle = outcome.context.unload();
	assert!( handle.is_live() );
	drop( module );
	assert!( !handle.is_live() );

}
