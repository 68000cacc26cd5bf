use wasm_script_host::{ CapabilityContract, EntryPointError, LoadedModule, OptimizationLevel, ScriptContext };

fn load( fixture: &str ) -> ( tempfile::TempDir, ScriptContext, LoadedModule ) {
	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( fixture ),
		Vec::<String>::new(),
		|| {},
		OptimizationLevel::Debug,
	).unwrap();
	assert_no_diagnostics!( outcome.diagnostics );
	( dir, outcome.context, outcome.module.unwrap() )
}

#[test]
fn entry_point_ambiguous() {

	let ( _dir, _context, module ) = load( "ambiguous.wat" );

	match module.resolve_entry_point() {
		Err( EntryPointError::Ambiguous( interfaces )) => assert_eq!(
			interfaces,
			vec![ "script:greeter/entry".to_string(), "script:greeter/fallback".to_string() ],
		),
		value => panic!( "Expected Ambiguous, found: {:#?}", value ),
	}

}

#[test]
fn entry_point_wrong_signature() {

	let ( _dir, _context, module ) = load( "wrong_signature.wat" );

	match module.resolve_entry_point() {
		Err( EntryPointError::NoImplementation( function )) => assert_eq!( function, "execute" ),
		value => panic!( "Expected NoImplementation, found: {:#?}", value ),
	}

}

#[test]
fn entry_point_custom_contract() {

	let ( _dir, _context, module ) = load( "greeter.wat" );

	match module.resolve_entry_point_with( &CapabilityContract::new( "run" )) {
		Err( EntryPointError::NoImplementation( function )) => assert_eq!( function, "run" ),
		value => panic!( "Expected NoImplementation, found: {:#?}", value ),
	}
	assert!( module.resolve_entry_point_with( &CapabilityContract::default() ).is_ok() );

}
