use std::time::Duration ;
use wasm_script_host::{ CancellationToken, InvocationError, OptimizationLevel, ScriptContext };

#[tokio::test( flavor = "multi_thread" )]
async fn entry_point_cancelled_while_running() {

	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "spin.wat" ),
		Vec::<String>::new(),
		|| {},
		OptimizationLevel::Debug,
	).unwrap();

	let instance = outcome.module.unwrap().resolve_entry_point().unwrap().instantiate().unwrap();
	let token = CancellationToken::new();

	let canceller = {
		let token = token.clone();
		tokio::spawn( async move {
			tokio::time::sleep( Duration::from_millis( 50 )).await ;
			token.cancel();
		})
	};

	let result = tokio::time::timeout( Duration::from_secs( 10 ), instance.execute( "Mary", Some( &token ))).await
		.expect( "Cancellation did not interrupt the script" );
	canceller.await.unwrap();

	match result {
		Err( InvocationError::Cancelled ) => {}
		value => panic!( "Expected Cancelled, found: {:#?}", value ),
	}

}

#[tokio::test]
async fn entry_point_cancelled_before_start() {

	let dir = tempfile::tempdir().unwrap();
	let outcome = ScriptContext::load_and_compile(
		dir.path(),
		&crate::fixtures::source( "greeter.wat" ),
		Vec::<String>::new(),
		|| {},
		OptimizationLevel::Debug,
	).unwrap();

	let instance = outcome.module.unwrap().resolve_entry_point().unwrap().instantiate().unwrap();
	let token = CancellationToken::new();
	token.cancel();

	match instance.execute( "Mary", Some( &token )).await {
		Err( InvocationError::Cancelled ) => {}
		value => panic!( "Expected Cancelled, found: {:#?}", value ),
	}
	assert_eq!( instance.execute( "Mary", None ).await.unwrap(), "Hi there: 'Mary'" );

}
