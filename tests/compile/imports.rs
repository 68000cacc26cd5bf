use wasm_script_host::{ OptimizationLevel, ScriptCompiler, Severity };

#[test]
fn compile_unresolved_import() {

	let compiler = ScriptCompiler::new( crate::fixtures::path( "" ));

	match compiler.compile( &crate::fixtures::source( "quoting_greeter.wat" ), OptimizationLevel::Debug ) {
		Err( err ) => {
			assert_eq!( err.diagnostics().len(), 1 );
			assert!( err.diagnostics()[0].message().contains( "script:format/text" ));
		}
		Ok( module ) => panic!( "Expected failure, compiled: {:#?}", module ),
	}

}

#[test]
fn compile_with_reference() {

	let mut compiler = ScriptCompiler::new( crate::fixtures::path( "" ));
	assert!( compiler.add_reference( crate::fixtures::path( "quote_single.wat" ).to_str().unwrap() ));

	let module = compiler.compile( &crate::fixtures::source( "quoting_greeter.wat" ), OptimizationLevel::Debug ).unwrap();
	assert_no_diagnostics!( module.warnings() );
	assert_eq!( module.imports(), vec![ "script:format/text".to_string() ]);

}

#[test]
fn compile_unused_reference_is_a_warning() {

	let mut compiler = ScriptCompiler::new( crate::fixtures::path( "" ));
	assert!( compiler.add_reference( "quote_single.wat" ));

	let module = compiler.compile( &crate::fixtures::source( "greeter.wat" ), OptimizationLevel::Debug ).unwrap();
	assert_eq!( module.warnings().len(), 1 );
	assert_eq!( module.warnings()[0].severity(), Severity::Warning );

}

#[test]
fn compile_warnings_as_errors() {

	let mut compiler = ScriptCompiler::new( crate::fixtures::path( "" )).with_warnings_as_errors( true );
	assert!( compiler.add_reference( "quote_single.wat" ));

	match compiler.compile( &crate::fixtures::source( "greeter.wat" ), OptimizationLevel::Debug ) {
		Err( err ) => assert!( err.diagnostics().iter().all(| diagnostic | !diagnostic.is_error() )),
		Ok( module ) => panic!( "Expected failure, compiled: {:#?}", module ),
	}

}
