//! Compiler diagnostics.
//!
//! Every failure the frontend can recover from is reported as a [`Diagnostic`] rather than
//! an error value, so a caller can show the whole list to whoever wrote the script and let
//! them retry with corrected source.

/// How serious a [`Diagnostic`] is.
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord )]
pub enum Severity {
	/// The script compiled, but something about it looks wrong.
	Warning,
	/// The script could not be compiled or loaded.
	Error,
}

impl std::fmt::Display for Severity {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		match self {
			Self::Warning => write!( f, "warning" ),
			Self::Error => write!( f, "error" ),
		}
	}
}

/// A 1-based position inside the script source.
#[derive( Copy, Clone, Debug, PartialEq, Eq, Hash )]
pub struct Location {
	pub line: usize,
	pub column: usize,
}

/// A single message produced while compiling or loading a script.
#[derive( Clone, Debug, PartialEq, Eq )]
pub struct Diagnostic {
	severity: Severity,
	location: Option<Location>,
	message: String,
}

impl Diagnostic {

	/// Creates an error diagnostic with no source location.
	pub fn error( message: impl Into<String> ) -> Self {
		Self { severity: Severity::Error, location: None, message: message.into() }
	}

	/// Creates a warning diagnostic with no source location.
	pub fn warning( message: impl Into<String> ) -> Self {
		Self { severity: Severity::Warning, location: None, message: message.into() }
	}

	/// Attaches a source location.
	pub fn at( mut self, location: Location ) -> Self {
		self.location = Some( location );
		self
	}

	#[inline] pub fn severity( &self ) -> Severity { self.severity }
	#[inline] pub fn location( &self ) -> Option<Location> { self.location }
	#[inline] pub fn message( &self ) -> &str { &self.message }
	#[inline] pub fn is_error( &self ) -> bool { self.severity == Severity::Error }

	/// Converts a text-format parse failure, keeping the parser's line and column.
	pub(crate) fn from_parse_error( error: &wat::Error ) -> Self {
		let rendered = error.to_string();
		let message = rendered.lines().next().unwrap_or( "malformed source" ).trim().to_string();
		let diagnostic = Self::error( message );
		match parse_location( &rendered ) {
			Some( location ) => diagnostic.at( location ),
			None => diagnostic,
		}
	}

}

impl std::fmt::Display for Diagnostic {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
		match self.location {
			Some( Location { line, column }) => write!( f, "<script>:{}:{}: {}: {}", line, column, self.severity, self.message ),
			None => write!( f, "<script>: {}: {}", self.severity, self.message ),
		}
	}
}

/// Returns `true` if any diagnostic in the list is an error.
pub fn has_errors<'a>( diagnostics: impl IntoIterator<Item = &'a Diagnostic> ) -> bool {
	diagnostics.into_iter().any( Diagnostic::is_error )
}

// The parser renders positions as ` --> <file>:<line>:<column>`.
fn parse_location( rendered: &str ) -> Option<Location> {
	let position = rendered.lines()
		.find_map(| line | line.trim_start().strip_prefix( "-->" ))?
		.trim();
	let mut parts = position.rsplitn( 3, ':' );
	let column = parts.next()?.parse().ok()?;
	let line = parts.next()?.parse().ok()?;
	Some( Location { line, column })
}

#[cfg( test )]
mod tests {
	use super::*;

	#[test]
	fn location_is_read_from_rendered_parse_error() {
		let rendered = "expected `)`\n     --> <anon>:3:9\n      |\n    3 |   (func\n      |         ^";
		assert_eq!( parse_location( rendered ), Some( Location { line: 3, column: 9 }));
	}

	#[test]
	fn missing_location_is_none() {
		assert_eq!( parse_location( "unexpected end of input" ), None );
	}

	#[test]
	fn display_includes_severity_and_location() {
		let diagnostic = Diagnostic::error( "expected `)`" ).at( Location { line: 2, column: 4 });
		assert_eq!( diagnostic.to_string(), "<script>:2:4: error: expected `)`" );
		assert_eq!( Diagnostic::warning( "unused" ).to_string(), "<script>: warning: unused" );
	}

	#[test]
	fn warnings_alone_are_not_errors() {
		let diagnostics = vec![ Diagnostic::warning( "a" ), Diagnostic::warning( "b" ) ];
		assert!( !has_errors( &diagnostics ));
		let diagnostics = vec![ Diagnostic::warning( "a" ), Diagnostic::error( "b" ) ];
		assert!( has_errors( &diagnostics ));
	}
}
