//
//  java.rs
//  Atlas
//

//! Java CST -> structural AST.

use std::path::Path;
use tree_sitter::{Node, Parser};

use super::ast::*;
use super::helpers::{
    child_of_kind, children, compact_text, field_children, line_of, named_children, node_text,
    strip_generics, unquote,
};
use crate::error::{AtlasError, Result};

fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration"
    )
}

fn is_type_node(kind: &str) -> bool {
    matches!(
        kind,
        "type_identifier"
            | "scoped_type_identifier"
            | "generic_type"
            | "array_type"
            | "integral_type"
            | "floating_point_type"
            | "boolean_type"
            | "void_type"
            | "annotated_type"
    )
}

/// Parse Java source text into a [`CompilationUnit`].
pub fn parse_java(path: &Path, source: &str) -> Result<CompilationUnit> {
    let mut parser = Parser::new();
    let language = tree_sitter_java::LANGUAGE;
    parser
        .set_language(&language.into())
        .map_err(|e| AtlasError::Parse {
            path: path.to_path_buf(),
            message: format!("failed to load Java grammar: {}", e),
        })?;

    let tree = parser.parse(source, None).ok_or_else(|| AtlasError::Parse {
        path: path.to_path_buf(),
        message: "parser produced no tree".to_string(),
    })?;

    let root = tree.root_node();
    let src = source.as_bytes();
    let mut unit = CompilationUnit {
        path: path.to_path_buf(),
        has_syntax_errors: root.has_error(),
        ..Default::default()
    };

    for child in named_children(&root) {
        match child.kind() {
            "package_declaration" => unit.package = package_name(&child, src),
            "import_declaration" => {
                if let Some(import) = parse_import(&child, src) {
                    unit.imports.push(import);
                }
            }
            kind if is_type_declaration(kind) => {
                if let Some(decl) = type_decl(&child, src) {
                    unit.types.push(decl);
                }
            }
            _ => {}
        }
    }

    Ok(unit)
}

fn package_name(node: &Node, src: &[u8]) -> Option<String> {
    named_children(node)
        .into_iter()
        .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
        .map(|c| compact_text(&c, src))
        .filter(|name| !name.is_empty())
}

fn parse_import(node: &Node, src: &[u8]) -> Option<Import> {
    let tokens = children(node);
    let is_static = tokens.iter().any(|c| c.kind() == "static");
    let is_wildcard = tokens.iter().any(|c| c.kind() == "asterisk");
    let path = tokens
        .iter()
        .find(|c| matches!(c.kind(), "identifier" | "scoped_identifier"))
        .map(|c| compact_text(c, src))?;
    Some(Import {
        path,
        is_static,
        is_wildcard,
    })
}

fn type_decl(node: &Node, src: &[u8]) -> Option<TypeDecl> {
    let name = node.child_by_field_name("name").map(|n| node_text(&n, src))?;
    let kind = match node.kind() {
        "interface_declaration" => TypeKind::Interface,
        "enum_declaration" => TypeKind::Enum,
        "record_declaration" => TypeKind::Record,
        "annotation_type_declaration" => TypeKind::Annotation,
        _ => TypeKind::Class,
    };

    let mut decl = TypeDecl::new(name, kind);
    decl.line = line_of(node);

    for child in children(node) {
        match child.kind() {
            "modifiers" => {
                let (modifiers, annotations) = parse_modifiers(&child, src);
                decl.modifiers = modifiers;
                decl.annotations = annotations;
            }
            "type_parameters" => decl.type_params = type_params(&child, src),
            "superclass" | "extends_interfaces" => decl.extends.extend(types_in(&child, src)),
            "super_interfaces" => decl.implements.extend(types_in(&child, src)),
            "formal_parameters" => decl.record_components = params(&child, src),
            _ => {}
        }
    }

    if let Some(body) = node.child_by_field_name("body") {
        members(&body, src, &mut decl);
    }

    Some(decl)
}

fn members(body: &Node, src: &[u8], decl: &mut TypeDecl) {
    for child in named_children(body) {
        match child.kind() {
            "field_declaration" | "constant_declaration" => field(&child, src, decl),
            "method_declaration" => {
                if let Some(m) = method(&child, src) {
                    decl.methods.push(m);
                }
            }
            "constructor_declaration" | "compact_constructor_declaration" => {
                let ctor = constructor(&child, src, &decl.name);
                decl.constructors.push(ctor);
            }
            "enum_body_declarations" => members(&child, src, decl),
            "enum_constant" | "static_initializer" | "block" => {
                collect_body(&child, src, &mut decl.initializers)
            }
            kind if is_type_declaration(kind) => {
                if let Some(nested) = type_decl(&child, src) {
                    decl.nested.push(nested);
                }
            }
            _ => {}
        }
    }
}

fn parse_modifiers(node: &Node, src: &[u8]) -> (Modifiers, Vec<Annotation>) {
    let mut modifiers = Modifiers::default();
    let mut annotations = Vec::new();
    for child in children(node) {
        match child.kind() {
            "public" => modifiers.visibility = Visibility::Public,
            "protected" => modifiers.visibility = Visibility::Protected,
            "private" => modifiers.visibility = Visibility::Private,
            "static" => modifiers.is_static = true,
            "final" => modifiers.is_final = true,
            "abstract" => modifiers.is_abstract = true,
            "marker_annotation" | "annotation" => {
                if let Some(a) = parse_annotation(&child, src) {
                    annotations.push(a);
                }
            }
            _ => {}
        }
    }
    (modifiers, annotations)
}

fn modifiers_of(node: &Node, src: &[u8]) -> (Modifiers, Vec<Annotation>) {
    child_of_kind(node, "modifiers")
        .map(|m| parse_modifiers(&m, src))
        .unwrap_or_default()
}

fn parse_annotation(node: &Node, src: &[u8]) -> Option<Annotation> {
    let name = node
        .child_by_field_name("name")
        .map(|n| compact_text(&n, src))?;
    let args = match node.child_by_field_name("arguments") {
        None => AnnotationArgs::Marker,
        Some(list) => {
            let items = named_children(&list);
            if items.is_empty() {
                AnnotationArgs::Marker
            } else if items.iter().all(|i| i.kind() == "element_value_pair") {
                AnnotationArgs::Pairs(
                    items
                        .iter()
                        .filter_map(|pair| {
                            let key = pair.child_by_field_name("key")?;
                            let value = pair.child_by_field_name("value")?;
                            Some((node_text(&key, src), element_value(&value, src)))
                        })
                        .collect(),
                )
            } else {
                AnnotationArgs::Single(element_value(&items[0], src))
            }
        }
    };
    Some(Annotation { name, args })
}

fn element_value(node: &Node, src: &[u8]) -> ElementValue {
    match node.kind() {
        "string_literal" => ElementValue::Str(unquote(&node_text(node, src))),
        "element_value_array_initializer" => ElementValue::Array(
            named_children(node)
                .iter()
                .map(|c| element_value(c, src))
                .collect(),
        ),
        "marker_annotation" | "annotation" => match parse_annotation(node, src) {
            Some(a) => ElementValue::Annotation(Box::new(a)),
            None => ElementValue::Expr(node_text(node, src)),
        },
        _ => ElementValue::Expr(node_text(node, src)),
    }
}

fn type_params(node: &Node, src: &[u8]) -> Vec<TypeParam> {
    named_children(node)
        .iter()
        .filter(|c| c.kind() == "type_parameter")
        .filter_map(|param| {
            let name = named_children(param)
                .into_iter()
                .find(|c| matches!(c.kind(), "type_identifier" | "identifier"))
                .map(|c| node_text(&c, src))?;
            let bounds = child_of_kind(param, "type_bound")
                .map(|b| types_in(&b, src))
                .unwrap_or_default();
            Some(TypeParam { name, bounds })
        })
        .collect()
}

/// Types listed directly under a node, looking through `type_list`.
fn types_in(node: &Node, src: &[u8]) -> Vec<TypeRef> {
    let mut out = Vec::new();
    for child in named_children(node) {
        if child.kind() == "type_list" {
            out.extend(types_in(&child, src));
        } else if is_type_node(child.kind()) {
            out.push(parse_type(&child, src));
        }
    }
    out
}

fn parse_type(node: &Node, src: &[u8]) -> TypeRef {
    match node.kind() {
        "integral_type" | "floating_point_type" | "boolean_type" => {
            TypeRef::Primitive(node_text(node, src))
        }
        "void_type" => TypeRef::Void,
        "type_identifier" | "identifier" => TypeRef::named(node_text(node, src)),
        "generic_type" => {
            let mut name = String::new();
            let mut args = Vec::new();
            for child in named_children(node) {
                match child.kind() {
                    "type_identifier" | "scoped_type_identifier" => {
                        name = strip_generics(&compact_text(&child, src))
                    }
                    "type_arguments" => args = type_args(&child, src),
                    _ => {}
                }
            }
            TypeRef::Named { name, args }
        }
        "array_type" => {
            let element = node
                .child_by_field_name("element")
                .map(|e| parse_type(&e, src))
                .unwrap_or_else(|| TypeRef::named(compact_text(node, src)));
            let dims = node
                .child_by_field_name("dimensions")
                .map(|d| node_text(&d, src).matches('[').count())
                .unwrap_or(1)
                .max(1);
            TypeRef::Array {
                element: Box::new(element),
                dims,
            }
        }
        "annotated_type" => named_children(node)
            .into_iter()
            .find(|c| is_type_node(c.kind()))
            .map(|inner| parse_type(&inner, src))
            .unwrap_or_else(|| TypeRef::named(compact_text(node, src))),
        _ => TypeRef::named(strip_generics(&compact_text(node, src))),
    }
}

fn type_args(node: &Node, src: &[u8]) -> Vec<TypeArg> {
    named_children(node)
        .iter()
        .filter_map(|child| {
            if child.kind() == "wildcard" {
                let bound = named_children(child)
                    .into_iter()
                    .find(|c| is_type_node(c.kind()))
                    .map(|b| Box::new(parse_type(&b, src)));
                Some(TypeArg::Wildcard(bound))
            } else if is_type_node(child.kind()) {
                Some(TypeArg::Type(parse_type(child, src)))
            } else {
                None
            }
        })
        .collect()
}

fn field(node: &Node, src: &[u8], decl: &mut TypeDecl) {
    let (modifiers, annotations) = modifiers_of(node, src);
    let Some(ty_node) = node.child_by_field_name("type") else {
        return;
    };
    let ty = parse_type(&ty_node, src);

    let mut names = Vec::new();
    for declarator in field_children(node, "declarator") {
        if let Some(name) = declarator.child_by_field_name("name") {
            names.push(node_text(&name, src));
        }
        if let Some(value) = declarator.child_by_field_name("value") {
            collect_body(&value, src, &mut decl.initializers);
        }
    }

    decl.fields.push(Field {
        modifiers,
        annotations,
        ty,
        names,
        line: line_of(node),
    });
}

fn params(node: &Node, src: &[u8]) -> Vec<Param> {
    let mut out = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "formal_parameter" => {
                let (_, annotations) = modifiers_of(&child, src);
                let Some(ty_node) = child.child_by_field_name("type") else {
                    continue;
                };
                let mut ty = parse_type(&ty_node, src);
                if let Some(dims) = child.child_by_field_name("dimensions") {
                    ty = TypeRef::Array {
                        element: Box::new(ty),
                        dims: node_text(&dims, src).matches('[').count().max(1),
                    };
                }
                let name = child
                    .child_by_field_name("name")
                    .map(|n| node_text(&n, src))
                    .unwrap_or_default();
                out.push(Param {
                    name,
                    ty,
                    annotations,
                    varargs: false,
                });
            }
            "spread_parameter" => {
                let (_, annotations) = modifiers_of(&child, src);
                let inner = named_children(&child);
                let Some(ty_node) = inner.iter().find(|c| is_type_node(c.kind())) else {
                    continue;
                };
                let name = inner
                    .iter()
                    .find(|c| c.kind() == "variable_declarator")
                    .and_then(|d| d.child_by_field_name("name"))
                    .map(|n| node_text(&n, src))
                    .unwrap_or_default();
                out.push(Param {
                    name,
                    ty: TypeRef::Array {
                        element: Box::new(parse_type(ty_node, src)),
                        dims: 1,
                    },
                    annotations,
                    varargs: true,
                });
            }
            _ => {}
        }
    }
    out
}

fn method(node: &Node, src: &[u8]) -> Option<Method> {
    let name = node.child_by_field_name("name").map(|n| node_text(&n, src))?;
    let (modifiers, annotations) = modifiers_of(node, src);
    let type_params = node
        .child_by_field_name("type_parameters")
        .or_else(|| child_of_kind(node, "type_parameters"))
        .map(|t| type_params(&t, src))
        .unwrap_or_default();
    let return_type = node
        .child_by_field_name("type")
        .map(|t| parse_type(&t, src))
        .unwrap_or(TypeRef::Void);
    let params = node
        .child_by_field_name("parameters")
        .map(|p| params(&p, src))
        .unwrap_or_default();
    let throws = child_of_kind(node, "throws")
        .map(|t| types_in(&t, src))
        .unwrap_or_default();

    let mut body = Body::default();
    if let Some(block) = node.child_by_field_name("body") {
        collect_body(&block, src, &mut body);
    }

    Some(Method {
        name,
        modifiers,
        annotations,
        type_params,
        return_type,
        params,
        throws,
        body,
        line: line_of(node),
    })
}

fn constructor(node: &Node, src: &[u8], owner: &str) -> Constructor {
    let (modifiers, annotations) = modifiers_of(node, src);
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(&n, src))
        .unwrap_or_else(|| owner.to_string());
    let params = node
        .child_by_field_name("parameters")
        .map(|p| params(&p, src))
        .unwrap_or_default();
    let throws = child_of_kind(node, "throws")
        .map(|t| types_in(&t, src))
        .unwrap_or_default();

    let mut body = Body::default();
    if let Some(block) = node.child_by_field_name("body") {
        collect_body(&block, src, &mut body);
    }

    Constructor {
        name,
        modifiers,
        annotations,
        params,
        throws,
        body,
        line: line_of(node),
    }
}

/// Collect call/creation/access facts from every node under `node`, in source order.
fn collect_body(node: &Node, src: &[u8], body: &mut Body) {
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        match current.kind() {
            "method_invocation" => {
                if let Some(call) = method_call(&current, src) {
                    body.calls.push(call);
                }
            }
            "object_creation_expression" => {
                if let Some(t) = current.child_by_field_name("type") {
                    let args = current
                        .child_by_field_name("arguments")
                        .map(|a| named_children(&a).iter().map(|e| parse_expr(e, src)).collect())
                        .unwrap_or_default();
                    body.creations.push(Creation {
                        ty: parse_type(&t, src),
                        args,
                    });
                }
            }
            "field_access" if !is_chain_scope(&current) => {
                if let Some(access) = field_access(&current, src) {
                    body.field_accesses.push(access);
                }
            }
            "local_variable_declaration" => {
                if let Some(t) = current.child_by_field_name("type") {
                    let ty = parse_type(&t, src);
                    if ty.class_name() != Some("var") {
                        let names = field_children(&current, "declarator")
                            .iter()
                            .filter_map(|d| d.child_by_field_name("name"))
                            .map(|n| node_text(&n, src))
                            .collect();
                        body.locals.push(LocalVar { ty, names });
                    }
                }
            }
            "catch_formal_parameter" => {
                if let Some(catch_type) = child_of_kind(&current, "catch_type") {
                    body.catches.extend(types_in(&catch_type, src));
                }
            }
            _ => {}
        }
        let mut kids = named_children(&current);
        kids.reverse();
        stack.extend(kids);
    }
}

/// A field access that is the object of an enclosing call or access.
fn is_chain_scope(node: &Node) -> bool {
    match node.parent() {
        Some(parent) if matches!(parent.kind(), "method_invocation" | "field_access") => {
            parent.child_by_field_name("object") == Some(*node)
        }
        _ => false,
    }
}

fn method_call(node: &Node, src: &[u8]) -> Option<MethodCall> {
    let name = node.child_by_field_name("name").map(|n| node_text(&n, src))?;
    let scope = node.child_by_field_name("object").map(|o| parse_expr(&o, src));
    let args = node
        .child_by_field_name("arguments")
        .map(|a| named_children(&a).iter().map(|e| parse_expr(e, src)).collect())
        .unwrap_or_default();
    Some(MethodCall { scope, name, args })
}

fn field_access(node: &Node, src: &[u8]) -> Option<FieldAccess> {
    let object = node.child_by_field_name("object")?;
    let field = node.child_by_field_name("field")?;
    Some(FieldAccess {
        scope: parse_expr(&object, src),
        field: node_text(&field, src),
    })
}

fn parse_expr(node: &Node, src: &[u8]) -> Expr {
    match node.kind() {
        "this" => Expr::This,
        "super" => Expr::Super,
        "identifier" => Expr::name(node_text(node, src)),
        "string_literal" => Expr::StringLit(unquote(&node_text(node, src))),
        "method_invocation" => Expr::Call {
            name: node
                .child_by_field_name("name")
                .map(|n| node_text(&n, src))
                .unwrap_or_default(),
            text: node_text(node, src),
        },
        "field_access" | "scoped_identifier" => {
            selector_chain(node, src).unwrap_or_else(|| Expr::Other(node_text(node, src)))
        }
        _ => Expr::Other(node_text(node, src)),
    }
}

/// Flatten `a.b.c` / `this.a.b` into selector segments.
fn selector_chain(node: &Node, src: &[u8]) -> Option<Expr> {
    let mut segments = Vec::new();
    let mut this_rooted = false;
    let mut current = *node;
    loop {
        match current.kind() {
            "field_access" => {
                segments.push(node_text(&current.child_by_field_name("field")?, src));
                current = current.child_by_field_name("object")?;
            }
            "scoped_identifier" => {
                segments.push(node_text(&current.child_by_field_name("name")?, src));
                current = current.child_by_field_name("scope")?;
            }
            "identifier" => {
                segments.push(node_text(&current, src));
                break;
            }
            "this" => {
                this_rooted = true;
                break;
            }
            _ => return None,
        }
    }
    segments.reverse();
    Some(Expr::Selector {
        this_rooted,
        segments,
    })
}
