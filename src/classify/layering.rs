//
//  layering.rs
//  Atlas
//

//! Layer collaborations and web/test wiring (`009_*`).

use crate::endpoint::is_mapping_annotation;
use crate::kind::DependencyKind as K;
use crate::parser::ast::simple_name;

use super::rules::{annotation_in, BINDING_ANNOTATIONS, TEST_SLICE_ANNOTATIONS};
use super::{ClassContext, Emitter};

pub fn classify(ctx: &ClassContext, out: &mut Emitter) {
    if ctx.is_controller() {
        collaborators(ctx, "Service", K::ControllerToService, out);
        request_binding(ctx, out);
    }
    if ctx.is_service() {
        collaborators(ctx, "Repository", K::ServiceToRepository, out);
    }
    if ctx.is_repository() {
        repository_entity(ctx, out);
    }
    if ctx.is_test_class() {
        test_slices(ctx, out);
    }
}

/// Field and constructor-parameter types whose written name mentions `role`.
fn collaborators(ctx: &ClassContext, role: &str, kind: K, out: &mut Emitter) {
    let decl = ctx.decl;
    let types = decl
        .fields
        .iter()
        .map(|f| &f.ty)
        .chain(decl.constructors.iter().flat_map(|c| c.params.iter().map(|p| &p.ty)));
    for ty in types {
        if ty.class_name().is_some_and(|n| simple_name(n).contains(role)) {
            out.emit_type(ctx.resolve_type(ty), kind);
        }
    }
}

fn repository_entity(ctx: &ClassContext, out: &mut Emitter) {
    let entity = ctx
        .decl
        .extends
        .iter()
        .filter(|t| t.class_name().is_some_and(|n| n.ends_with("Repository")))
        .find_map(|t| t.type_arguments().into_iter().next());
    if let Some(entity) = entity {
        out.emit_type(ctx.resolve_type(entity), K::RepositoryToEntity);
    }
}

fn request_binding(ctx: &ClassContext, out: &mut Emitter) {
    for method in &ctx.decl.methods {
        for mapping in method.annotations.iter().filter(|a| is_mapping_annotation(a)) {
            for path in mapping.string_list(&["value", "path"]) {
                out.emit(format!("Path:{}", path), K::RequestBinding);
            }
        }
        for param in &method.params {
            for binding in param
                .annotations
                .iter()
                .filter(|a| annotation_in(&a.name, BINDING_ANNOTATIONS))
            {
                let mut descriptor = format!("{}:{}", binding.simple_name(), param.name);
                if let Some(detail) = binding.string_attr(&["value", "name"]) {
                    descriptor.push('=');
                    descriptor.push_str(&detail);
                }
                out.emit(descriptor, K::RequestBinding);
            }
        }
    }
}

fn test_slices(ctx: &ClassContext, out: &mut Emitter) {
    for slice in ctx
        .decl
        .annotations
        .iter()
        .filter(|a| annotation_in(&a.name, TEST_SLICE_ANNOTATIONS))
    {
        let target = match slice.rendered_attr("value").or_else(|| slice.rendered_attr("controllers")) {
            Some(value) => format!("{}:{}", slice.simple_name(), value),
            None => slice.simple_name().to_string(),
        };
        out.emit(target, K::TestSlice);
    }
}
