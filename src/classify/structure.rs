//
//  structure.rs
//  Atlas
//

//! Type-structure dependencies (`001_*`): inheritance, signatures, fields and code bodies.

use crate::kind::DependencyKind as K;
use crate::parser::ast::{simple_name, Body, Expr, MethodCall, TypeDecl, TypeRef};
use crate::resolver::starts_upper;

use super::rules::COLLECTION_TYPES;
use super::{ClassContext, Emitter, Vars};

pub fn classify(ctx: &ClassContext, out: &mut Emitter) {
    let top = ctx.decl;
    for ty in &top.extends {
        out.emit_type(ctx.resolve_type(ty), K::Extends);
    }
    for ty in &top.implements {
        out.emit_type(ctx.resolve_type(ty), K::Implements);
    }

    for decl in ctx.declarations() {
        bounds(ctx, decl, out);
        signatures(ctx, decl, out);
        fields(ctx, decl, out);
        bodies(ctx, decl, out);
    }
}

fn bounds(ctx: &ClassContext, decl: &TypeDecl, out: &mut Emitter) {
    let params = decl
        .type_params
        .iter()
        .chain(decl.methods.iter().flat_map(|m| m.type_params.iter()));
    for param in params {
        for bound in &param.bounds {
            out.emit_type(ctx.resolve_type(bound), K::TypeParameterBound);
            generics(ctx, bound, K::GenericArgument, out);
        }
    }
}

fn signatures(ctx: &ClassContext, decl: &TypeDecl, out: &mut Emitter) {
    for method in &decl.methods {
        for ty in &method.throws {
            out.emit_type(ctx.resolve_type(ty), K::ExceptionType);
        }
        out.emit_type(ctx.resolve_type(method.return_type.element()), K::ReturnType);
        generics(ctx, &method.return_type, K::GenericArgument, out);
        for param in &method.params {
            out.emit_type(ctx.resolve_type(param.ty.element()), K::ParameterType);
            generics(ctx, &param.ty, K::GenericArgument, out);
        }
    }
    for ctor in &decl.constructors {
        for ty in &ctor.throws {
            out.emit_type(ctx.resolve_type(ty), K::ExceptionType);
        }
        for param in &ctor.params {
            out.emit_type(ctx.resolve_type(param.ty.element()), K::ParameterType);
            generics(ctx, &param.ty, K::GenericArgument, out);
        }
    }
}

fn fields(ctx: &ClassContext, decl: &TypeDecl, out: &mut Emitter) {
    for field in &decl.fields {
        field_type(ctx, &field.ty, out);
    }
    for component in &decl.record_components {
        field_type(ctx, &component.ty, out);
    }
}

fn field_type(ctx: &ClassContext, ty: &TypeRef, out: &mut Emitter) {
    if ty.is_array() {
        out.emit_type(ctx.resolve_type(ty.element()), K::ArrayElement);
        return;
    }
    out.emit_type(ctx.resolve_type(ty), K::Composition);
    let is_collection = ty
        .class_name()
        .is_some_and(|n| COLLECTION_TYPES.contains(&simple_name(n)));
    let kind = if is_collection {
        K::CollectionElement
    } else {
        K::GenericArgument
    };
    generics(ctx, ty, kind, out);
}

/// Every class type nested inside the type arguments of `ty`.
fn generics(ctx: &ClassContext, ty: &TypeRef, kind: K, out: &mut Emitter) {
    for arg in ty.nested_arguments() {
        out.emit_type(ctx.resolve_type(arg.element()), kind);
    }
}

fn bodies(ctx: &ClassContext, decl: &TypeDecl, out: &mut Emitter) {
    for method in &decl.methods {
        let vars = Vars::new(decl, ctx.decl)
            .with_params(&method.params)
            .with_body(&method.body);
        body(ctx, &method.body, &vars, out);
    }
    for ctor in &decl.constructors {
        let vars = Vars::new(decl, ctx.decl)
            .with_params(&ctor.params)
            .with_body(&ctor.body);
        body(ctx, &ctor.body, &vars, out);
    }
    let vars = Vars::new(decl, ctx.decl).with_body(&decl.initializers);
    body(ctx, &decl.initializers, &vars, out);
}

fn body(ctx: &ClassContext, body: &Body, vars: &Vars, out: &mut Emitter) {
    for local in &body.locals {
        out.emit_type(ctx.resolve_type(local.ty.element()), K::LocalVariable);
        generics(ctx, &local.ty, K::GenericArgument, out);
    }
    for creation in &body.creations {
        out.emit_type(ctx.resolve_type(creation.ty.element()), K::ObjectCreation);
    }
    for ty in &body.catches {
        out.emit_type(ctx.resolve_type(ty), K::ExceptionType);
    }
    for call in &body.calls {
        invocation(ctx, call, vars, out);
    }
    for access in &body.field_accesses {
        if !starts_upper(&access.field) {
            continue;
        }
        let Expr::Selector {
            this_rooted: false,
            segments,
        } = &access.scope
        else {
            continue;
        };
        if segments.first().is_some_and(|head| vars.lookup(head).is_some()) {
            continue;
        }
        if let Some(owner) = ctx.resolver.resolve_type_path(segments, ctx.file) {
            if !ctx.is_self(&owner) {
                out.emit_type(Some(owner), K::ConstantReference);
            }
        }
    }
}

/// Instance calls go to the receiver variable's type; type-path receivers are static calls.
fn invocation(ctx: &ClassContext, call: &MethodCall, vars: &Vars, out: &mut Emitter) {
    let Some(Expr::Selector {
        this_rooted,
        segments,
    }) = &call.scope
    else {
        return;
    };
    let Some(head) = segments.first() else {
        return;
    };

    let receiver = if *this_rooted {
        vars.field(head)
    } else {
        vars.lookup(head)
    };
    if let Some(ty) = receiver {
        // only direct receivers; `a.b.call()` has an unknown intermediate type
        if segments.len() == 1 {
            if let Some(target) = ctx.resolve_type(ty.element()) {
                if !ctx.is_self(&target) {
                    out.emit_type(Some(target), K::MethodCall);
                }
            }
        }
        return;
    }
    if *this_rooted {
        return;
    }
    if let Some(owner) = ctx.resolver.resolve_type_path(segments, ctx.file) {
        if !ctx.is_self(&owner) {
            out.emit_type(Some(owner), K::StaticCall);
        }
    }
}
