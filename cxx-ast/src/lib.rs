//! AST arena, string interner, and token-stream data model shared by every
//! phase of the compiler core. Treated as infrastructure ("an opaque handle
//! service with stated invariants" rather than as
//! one of the three hard subsystems — but its invariants (arena stability,
//! intern stability, append-only ids) are load-bearing for all of them.

pub mod arena;
pub mod intern;
pub mod node;
pub mod token;

pub use arena::AstArena;
pub use intern::{Interner, Symbol};
pub use node::*;
pub use token::{FileId, SaveHandle, Token, TokenKind, TokenRange, TokenStream, VecTokenStream};
