use wasm_script_host::{ ReferenceError, ReferenceSet };

#[test]
fn reference_added_twice_is_idempotent() {

	let mut references = ReferenceSet::new( crate::fixtures::path( "" ));
	let path = crate::fixtures::path( "quote_single.wat" );

	assert!( references.add( path.to_str().unwrap() ));
	assert!( references.add( path.to_str().unwrap() ));
	// The bare name falls back to the same file in the runtime library directory.
	assert!( references.add( "quote_single.wat" ));

	assert_eq!( references.len(), 1 );
	assert!( references.contains( &path ));

}

#[test]
fn reference_unresolvable_leaves_set_untouched() {

	let mut references = ReferenceSet::new( crate::fixtures::path( "" ));
	assert!( references.add( "quote_single.wat" ));

	match references.try_add( "does-not-exist.wasm" ) {
		Err( ReferenceError::Unresolved( name )) => assert_eq!( name, "does-not-exist.wasm" ),
		value => panic!( "Expected Unresolved, found: {:#?}", value ),
	}
	match references.try_add( "   " ) {
		Err( ReferenceError::EmptyName ) => {}
		value => panic!( "Expected EmptyName, found: {:#?}", value ),
	}

	assert_eq!( references.len(), 1 );

}

#[test]
fn reference_directory_is_not_a_file() {
	let dir = tempfile::tempdir().unwrap();
	std::fs::create_dir( dir.path().join( "lib.wasm" )).unwrap();
	let mut references = ReferenceSet::new( dir.path() );
	assert!( !references.add( dir.path().join( "lib.wasm" ).to_str().unwrap() ));
	assert!( references.is_empty() );
}

#[test]
fn reference_batch_reports_failures_in_order() {

	let mut references = ReferenceSet::new( crate::fixtures::path( "" ));
	let failed = references.add_all([ "missing-a.wasm", "quote_single.wat", "", "missing-b.wasm", "quote_double.wat" ]);

	assert_eq!( failed, vec![ "missing-a.wasm".to_string(), String::new(), "missing-b.wasm".to_string() ]);
	assert_eq!( references.len(), 2 );
	assert_eq!(
		references.iter().map(| token | token.path().to_path_buf() ).collect::<Vec<_>>(),
		vec![ crate::fixtures::path( "quote_single.wat" ), crate::fixtures::path( "quote_double.wat" )],
	);

}

#[test]
fn reference_name_is_trimmed() {
	let mut references = ReferenceSet::new( crate::fixtures::path( "" ));
	assert!( references.add( "  quote_single.wat\n" ));
	assert!( references.contains( &crate::fixtures::path( "quote_single.wat" )));
}
