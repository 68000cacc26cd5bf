#[macro_export]
macro_rules! assert_no_diagnostics {
	( $diagnostics:expr ) => {
		if !$diagnostics.is_empty() { panic!( "Produced diagnostics: {:?}", $diagnostics ) }
	};
}
