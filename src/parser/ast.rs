//
//  ast.rs
//  Atlas
//

//! Structural Java AST produced by the extractor.
//!
//! Only the shapes the classifier and resolver care about are kept. Every
//! node category is a closed enum so consumers match exhaustively instead
//! of probing node kinds.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One parsed source file.
#[derive(Debug, Clone, Default)]
pub struct CompilationUnit {
    pub path: PathBuf,
    /// Declared package, `None` for the unnamed package.
    pub package: Option<String>,
    pub imports: Vec<Import>,
    /// Top-level type declarations.
    pub types: Vec<TypeDecl>,
    /// The syntax tree contained error or missing nodes.
    pub has_syntax_errors: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    /// Dotted path without the trailing `.*`.
    pub path: String,
    pub is_static: bool,
    pub is_wildcard: bool,
}

impl Import {
    /// Last segment of the import path.
    pub fn simple_name(&self) -> &str {
        simple_name(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    Protected,
    Private,
    #[default]
    PackagePrivate,
}

impl Visibility {
    /// Mermaid visibility prefix.
    pub fn symbol(self) -> char {
        match self {
            Visibility::Public => '+',
            Visibility::Protected => '#',
            Visibility::Private => '-',
            Visibility::PackagePrivate => '~',
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
}

#[derive(Debug, Clone)]
pub struct TypeDecl {
    pub name: String,
    pub kind: TypeKind,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub type_params: Vec<TypeParam>,
    pub extends: Vec<TypeRef>,
    pub implements: Vec<TypeRef>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub constructors: Vec<Constructor>,
    pub record_components: Vec<Param>,
    /// Expressions outside methods: field initializers, initializer blocks, enum constants.
    pub initializers: Body,
    pub nested: Vec<TypeDecl>,
    pub line: usize,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: Modifiers::default(),
            annotations: Vec::new(),
            type_params: Vec::new(),
            extends: Vec::new(),
            implements: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            constructors: Vec::new(),
            record_components: Vec::new(),
            initializers: Body::default(),
            nested: Vec::new(),
            line: 0,
        }
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }

    /// Whether a field with this name is declared directly on the type.
    pub fn field_type(&self, name: &str) -> Option<&TypeRef> {
        self.fields
            .iter()
            .find(|f| f.names.iter().any(|n| n == name))
            .map(|f| &f.ty)
    }

    /// This declaration followed by all nested declarations, depth first.
    pub fn self_and_nested(&self) -> Vec<&TypeDecl> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(decl) = stack.pop() {
            out.push(decl);
            for nested in decl.nested.iter().rev() {
                stack.push(nested);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub bounds: Vec<TypeRef>,
}

/// A written type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Primitive(String),
    Void,
    /// Class or interface type; `name` may be dotted (`Map.Entry`, `java.util.List`).
    Named { name: String, args: Vec<TypeArg> },
    Array { element: Box<TypeRef>, dims: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArg {
    Type(TypeRef),
    /// `?`, `? extends T`, `? super T`.
    Wildcard(Option<Box<TypeRef>>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Name of a class/interface type, `None` for primitives, void and arrays.
    pub fn class_name(&self) -> Option<&str> {
        match self {
            TypeRef::Named { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Innermost element type of an array, or the type itself.
    pub fn element(&self) -> &TypeRef {
        let mut current = self;
        while let TypeRef::Array { element, .. } = current {
            current = element;
        }
        current
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array { .. })
    }

    /// Direct type arguments that are themselves types (wildcard bounds included).
    pub fn type_arguments(&self) -> Vec<&TypeRef> {
        match self.element() {
            TypeRef::Named { args, .. } => args
                .iter()
                .filter_map(|a| match a {
                    TypeArg::Type(t) => Some(t),
                    TypeArg::Wildcard(Some(b)) => Some(b.as_ref()),
                    TypeArg::Wildcard(None) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// All class types nested anywhere inside the type arguments.
    pub fn nested_arguments(&self) -> Vec<&TypeRef> {
        let mut out = Vec::new();
        let mut stack: Vec<&TypeRef> = self.type_arguments();
        stack.reverse();
        while let Some(t) = stack.pop() {
            out.push(t);
            let mut inner = t.type_arguments();
            inner.reverse();
            stack.extend(inner);
        }
        out
    }

    /// Source-like rendering (`List<Foo>`, `int[]`, `Map<K, ?>`).
    pub fn display(&self) -> String {
        match self {
            TypeRef::Primitive(p) => p.clone(),
            TypeRef::Void => "void".to_string(),
            TypeRef::Named { name, args } if args.is_empty() => name.clone(),
            TypeRef::Named { name, args } => {
                let rendered: Vec<String> = args
                    .iter()
                    .map(|a| match a {
                        TypeArg::Type(t) => t.display(),
                        TypeArg::Wildcard(None) => "?".to_string(),
                        TypeArg::Wildcard(Some(b)) => format!("? extends {}", b.display()),
                    })
                    .collect();
                format!("{}<{}>", name, rendered.join(", "))
            }
            TypeRef::Array { element, dims } => format!("{}{}", element.display(), "[]".repeat(*dims)),
        }
    }
}

/// An annotation use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Name as written, possibly qualified.
    pub name: String,
    pub args: AnnotationArgs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnnotationArgs {
    Marker,
    /// `@A(x)`, equivalent to `@A(value = x)`.
    Single(ElementValue),
    Pairs(Vec<(String, ElementValue)>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementValue {
    Str(String),
    Array(Vec<ElementValue>),
    Annotation(Box<Annotation>),
    /// Any other expression, kept as source text.
    Expr(String),
}

impl ElementValue {
    /// Flat textual form; arrays are joined with `,`.
    pub fn render(&self) -> String {
        match self {
            ElementValue::Str(s) => s.clone(),
            ElementValue::Array(items) => items
                .iter()
                .map(|i| i.render())
                .collect::<Vec<_>>()
                .join(","),
            ElementValue::Annotation(a) => format!("@{}", a.name),
            ElementValue::Expr(e) => e.clone(),
        }
    }

    /// The string literal, or the first string literal of an array.
    pub fn first_str(&self) -> Option<&str> {
        match self {
            ElementValue::Str(s) => Some(s),
            ElementValue::Array(items) => items.iter().find_map(|i| i.first_str()),
            _ => None,
        }
    }

    /// All string literals, flattening arrays.
    pub fn strs(&self) -> Vec<&str> {
        match self {
            ElementValue::Str(s) => vec![s.as_str()],
            ElementValue::Array(items) => items.iter().flat_map(|i| i.strs()).collect(),
            _ => Vec::new(),
        }
    }
}

impl Annotation {
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: AnnotationArgs::Marker,
        }
    }

    pub fn simple_name(&self) -> &str {
        simple_name(&self.name)
    }

    /// Written as `name` or qualified as `*.name`.
    pub fn is(&self, name: &str) -> bool {
        names_match(&self.name, name)
    }

    /// Attribute value by key; a single-member value answers to `value`.
    pub fn attr(&self, key: &str) -> Option<&ElementValue> {
        match &self.args {
            AnnotationArgs::Marker => None,
            AnnotationArgs::Single(v) => (key == "value").then_some(v),
            AnnotationArgs::Pairs(pairs) => pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v),
        }
    }

    /// First string literal found under any of `keys`, tried in order.
    pub fn string_attr(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|k| self.attr(k).and_then(|v| v.first_str()))
            .map(|s| s.to_string())
    }

    /// All string literals under any of `keys`, from the first key present.
    pub fn string_list(&self, keys: &[&str]) -> Vec<String> {
        keys.iter()
            .find_map(|k| self.attr(k))
            .map(|v| v.strs().into_iter().map(|s| s.to_string()).collect())
            .unwrap_or_default()
    }

    /// Raw attribute text (`RequestMethod.POST`, `"x"` contents, joined arrays).
    pub fn rendered_attr(&self, key: &str) -> Option<String> {
        self.attr(key).map(|v| v.render())
    }

    /// Attribute pairs in declaration order, single members named `value`.
    pub fn attributes(&self) -> Vec<(String, String)> {
        match &self.args {
            AnnotationArgs::Marker => Vec::new(),
            AnnotationArgs::Single(v) => vec![("value".to_string(), v.render())],
            AnnotationArgs::Pairs(pairs) => pairs
                .iter()
                .map(|(k, v)| (k.clone(), v.render()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub ty: TypeRef,
    /// Declarator names; `int a, b;` yields two.
    pub names: Vec<String>,
    pub line: usize,
}

impl Field {
    pub fn has_annotation(&self, name: &str) -> bool {
        find_annotation(&self.annotations, name).is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    pub annotations: Vec<Annotation>,
    pub varargs: bool,
}

#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub type_params: Vec<TypeParam>,
    pub return_type: TypeRef,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    pub body: Body,
    pub line: usize,
}

impl Method {
    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, name)
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        self.annotation(name).is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Constructor {
    pub name: String,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub params: Vec<Param>,
    pub throws: Vec<TypeRef>,
    pub body: Body,
    pub line: usize,
}

impl Constructor {
    pub fn has_annotation(&self, name: &str) -> bool {
        find_annotation(&self.annotations, name).is_some()
    }
}

/// Facts collected from executable code.
#[derive(Debug, Clone, Default)]
pub struct Body {
    pub calls: Vec<MethodCall>,
    pub creations: Vec<Creation>,
    pub field_accesses: Vec<FieldAccess>,
    pub locals: Vec<LocalVar>,
    pub catches: Vec<TypeRef>,
}

impl Body {
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
            && self.creations.is_empty()
            && self.field_accesses.is_empty()
            && self.locals.is_empty()
            && self.catches.is_empty()
    }
}

/// `new T(args)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creation {
    pub ty: TypeRef,
    pub args: Vec<Expr>,
}

impl Creation {
    pub fn first_string_arg(&self) -> Option<&str> {
        first_string(&self.args)
    }
}

/// A local variable declaration (`Order a, b = ...;`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
    pub ty: TypeRef,
    pub names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub scope: Option<Expr>,
    pub name: String,
    pub args: Vec<Expr>,
}

impl MethodCall {
    pub fn scope_text(&self) -> Option<String> {
        self.scope.as_ref().map(|s| s.text())
    }

    /// First string-literal argument.
    pub fn first_string_arg(&self) -> Option<&str> {
        first_string(&self.args)
    }
}

/// A field access that is not itself the scope of a call or of another access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldAccess {
    pub scope: Expr,
    pub field: String,
}

/// Expressions in scope or argument position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    This,
    Super,
    /// Identifier chain (`a`, `a.b.C`), optionally rooted at `this`.
    Selector { this_rooted: bool, segments: Vec<String> },
    StringLit(String),
    /// Result of another invocation (`http.csrf()` in `http.csrf().disable()`).
    Call { name: String, text: String },
    Other(String),
}

impl Expr {
    pub fn name(name: impl Into<String>) -> Self {
        Expr::Selector {
            this_rooted: false,
            segments: vec![name.into()],
        }
    }

    pub fn text(&self) -> String {
        match self {
            Expr::This => "this".to_string(),
            Expr::Super => "super".to_string(),
            Expr::Selector { this_rooted, segments } => {
                let joined = segments.join(".");
                if *this_rooted {
                    format!("this.{}", joined)
                } else {
                    joined
                }
            }
            Expr::StringLit(s) => s.clone(),
            Expr::Call { text, .. } => text.clone(),
            Expr::Other(text) => text.clone(),
        }
    }
}

fn first_string(args: &[Expr]) -> Option<&str> {
    args.iter().find_map(|a| match a {
        Expr::StringLit(s) => Some(s.as_str()),
        _ => None,
    })
}

/// Last dotted segment of a name.
pub fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// `written` is `wanted` or a qualified form ending in `.wanted`.
pub fn names_match(written: &str, wanted: &str) -> bool {
    written == wanted
        || (written.len() > wanted.len()
            && written.ends_with(wanted)
            && written.as_bytes()[written.len() - wanted.len() - 1] == b'.')
}

pub fn find_annotation<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.is(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_match() {
        assert!(names_match("Service", "Service"));
        assert!(names_match("org.springframework.stereotype.Service", "Service"));
        assert!(!names_match("MyService", "Service"));
        assert!(!names_match("Serv", "Service"));
    }

    #[test]
    fn test_annotation_attributes() {
        let single = Annotation {
            name: "RequestMapping".to_string(),
            args: AnnotationArgs::Single(ElementValue::Str("/api".to_string())),
        };
        assert_eq!(single.string_attr(&["value", "path"]), Some("/api".to_string()));
        assert_eq!(single.attributes(), vec![("value".to_string(), "/api".to_string())]);

        let pairs = Annotation {
            name: "KafkaListener".to_string(),
            args: AnnotationArgs::Pairs(vec![(
                "topics".to_string(),
                ElementValue::Array(vec![
                    ElementValue::Str("a".to_string()),
                    ElementValue::Str("b".to_string()),
                ]),
            )]),
        };
        assert_eq!(pairs.string_list(&["topics"]), vec!["a", "b"]);
        assert_eq!(pairs.rendered_attr("topics"), Some("a,b".to_string()));
        assert_eq!(pairs.attr("value"), None);
    }

    #[test]
    fn test_type_ref_nested_arguments() {
        let ty = TypeRef::Named {
            name: "Map".to_string(),
            args: vec![
                TypeArg::Type(TypeRef::named("String")),
                TypeArg::Type(TypeRef::Named {
                    name: "List".to_string(),
                    args: vec![TypeArg::Wildcard(Some(Box::new(TypeRef::named("Order"))))],
                }),
            ],
        };
        let names: Vec<_> = ty
            .nested_arguments()
            .iter()
            .filter_map(|t| t.class_name())
            .collect();
        assert_eq!(names, vec!["String", "List", "Order"]);
        assert_eq!(ty.display(), "Map<String, List<? extends Order>>");
    }

    #[test]
    fn test_array_element() {
        let ty = TypeRef::Array {
            element: Box::new(TypeRef::named("Widget")),
            dims: 2,
        };
        assert_eq!(ty.element().class_name(), Some("Widget"));
        assert_eq!(ty.display(), "Widget[][]");
    }
}
