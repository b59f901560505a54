//
//  members.rs
//  Atlas
//

//! Member capture for the diagram: fields, methods and constructors of a
//! top-level class, with resolved types and flattened annotations.

use crate::parser::ast::{Annotation, TypeRef, Visibility};
use crate::registry::ClassId;
use crate::store::{Member, MemberAnnotation, MemberKind};

use super::ClassContext;

fn annotations(list: &[Annotation]) -> Vec<MemberAnnotation> {
    list.iter()
        .map(|a| MemberAnnotation {
            name: a.simple_name().to_string(),
            attributes: a.attributes(),
        })
        .collect()
}

/// Resolved class type, or the written form for primitives, arrays and type variables.
fn type_name(ctx: &ClassContext, ty: &TypeRef) -> String {
    match ty {
        TypeRef::Void => "void".to_string(),
        TypeRef::Named { .. } => ctx.resolve_type(ty).unwrap_or_else(|| ty.display()),
        _ => ty.display(),
    }
}

pub fn extract(ctx: &ClassContext, class: ClassId) -> Vec<Member> {
    let decl = ctx.decl;
    let mut members = Vec::new();

    for component in &decl.record_components {
        members.push(Member {
            class,
            name: component.name.clone(),
            type_name: Some(type_name(ctx, &component.ty)),
            visibility: Visibility::Private,
            kind: MemberKind::Field,
            annotations: annotations(&component.annotations),
        });
    }
    for field in &decl.fields {
        let ty = type_name(ctx, &field.ty);
        for name in &field.names {
            members.push(Member {
                class,
                name: name.clone(),
                type_name: Some(ty.clone()),
                visibility: field.modifiers.visibility,
                kind: MemberKind::Field,
                annotations: annotations(&field.annotations),
            });
        }
    }
    for ctor in &decl.constructors {
        members.push(Member {
            class,
            name: ctor.name.clone(),
            type_name: None,
            visibility: ctor.modifiers.visibility,
            kind: MemberKind::Constructor,
            annotations: annotations(&ctor.annotations),
        });
    }
    for method in &decl.methods {
        members.push(Member {
            class,
            name: method.name.clone(),
            type_name: Some(type_name(ctx, &method.return_type)),
            visibility: method.modifiers.visibility,
            kind: MemberKind::Method,
            annotations: annotations(&method.annotations),
        });
    }
    members
}

#[cfg(test)]
mod tests {
    use super::super::testing::register;
    use super::super::DependencyClassifier;
    use super::*;
    use crate::parser::parse_java;
    use crate::resolver::ResolutionContext;
    use std::path::Path;

    #[test]
    fn test_members_are_captured_with_resolved_types() {
        let unit = parse_java(
            Path::new("Order.java"),
            r#"
package com.shop.model;
import java.util.List;
public class Order {
    @Id
    private Long id, version;
    protected List<Line> lines;
    int[] counts;
    public Order() {}
    @JsonProperty(value = "total", required = true)
    public Money total() { return null; }
    public void clear() {}
}
"#,
        )
        .unwrap();
        let registry = register(std::slice::from_ref(&unit));
        let findings = DependencyClassifier::classify_unit(&unit, ResolutionContext::new(&registry));
        let members = &findings[0].members;

        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["id", "version", "lines", "counts", "Order", "total", "clear"]);

        assert_eq!(members[0].type_name.as_deref(), Some("java.lang.Long"));
        assert_eq!(members[0].annotations[0].name, "Id");
        assert_eq!(members[2].type_name.as_deref(), Some("java.util.List"));
        assert_eq!(members[2].visibility, Visibility::Protected);
        assert_eq!(members[3].type_name.as_deref(), Some("int[]"));
        assert_eq!(members[4].kind, MemberKind::Constructor);
        assert_eq!(members[4].type_name, None);
        assert_eq!(members[5].type_name.as_deref(), Some("com.shop.model.Money"));
        assert_eq!(
            members[5].annotations[0].attributes,
            vec![
                ("value".to_string(), "total".to_string()),
                ("required".to_string(), "true".to_string())
            ]
        );
        assert_eq!(members[6].type_name.as_deref(), Some("void"));
    }
}
