pub mod document;
pub mod pcb;
pub mod sexp;

// Re-export for convenience
pub use document::{format_angle, format_nm, KicadDocument};
pub use pcb::{PcbParseError, PcbParser};
pub use sexp::{ParseError, SExp, SExpParser};
