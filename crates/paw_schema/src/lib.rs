//! # paw_schema
//!
//! Type metadata for the paw data compiler.
//!
//! - [`Parser`] reads the `.paw` schema IDL into [`ast`] declarations.
//! - [`Schema`] / [`SchemaBuilder`] collect declarations from files or code.
//! - [`TypeRegistry`] resolves them once into immutable [`TypeDescriptor`]s
//!   whose members are classified as [`MemberKind::Primitive`],
//!   [`MemberKind::Owned`] or [`MemberKind::StreamingRef`].

pub mod ast;
pub mod ident;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod schema;

pub use ast::{Field, TypeDecl, TypeExpr};
pub use ident::{TypeKey, fnv1a_64};
pub use parser::{ParseError, Parser};
pub use registry::{MemberDescriptor, MemberKind, TypeDescriptor, TypeRegistry};
pub use schema::{SCHEMA_EXTENSION, Schema, SchemaBuilder, SchemaError, TypeDeclBuilder};
