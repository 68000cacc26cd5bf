use wasm_script_host::{ InvocationError, OptimizationLevel, ScriptContext };

#[tokio::test]
async fn entry_point_trap_propagates() {

	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "trap.wat" ),
		Vec::<String>::new(),
		|| {},
		OptimizationLevel::Debug,
	).unwrap();

	let instance = outcome.module.unwrap().resolve_entry_point().unwrap().instantiate().unwrap();

	match instance.execute( "Mary", None ).await {
		Err( InvocationError::Trap( _ )) => {}
		value => panic!( "Expected Trap, found: {:#?}", value ),
	}

}
