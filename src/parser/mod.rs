//
//  mod.rs
//  Atlas
//

//! AstExtractor: Java source files into the structural AST.

pub mod ast;
pub mod helpers;
pub mod java;

pub use ast::{
    Annotation, AnnotationArgs, Body, CompilationUnit, Constructor, Creation, ElementValue, Expr, Field,
    FieldAccess, Import, LocalVar, Method, MethodCall, Modifiers, Param, TypeArg, TypeDecl, TypeKind,
    TypeParam, TypeRef, Visibility,
};
pub use java::parse_java;

use std::path::Path;

use crate::error::{AtlasError, Result};

/// Read and parse one file. IO and decoding failures surface as parse errors
/// so the caller can skip the file uniformly.
pub fn parse_file(path: &Path) -> Result<CompilationUnit> {
    let bytes = std::fs::read(path).map_err(|e| AtlasError::Parse {
        path: path.to_path_buf(),
        message: format!("unreadable: {}", e),
    })?;
    let source = String::from_utf8(bytes).map_err(|e| AtlasError::Parse {
        path: path.to_path_buf(),
        message: format!("not valid UTF-8: {}", e),
    })?;
    parse_java(path, &source)
}
