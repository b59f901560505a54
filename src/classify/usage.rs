//
//  usage.rs
//  Atlas
//

//! Table-driven pass over call sites and declared variable types.

use super::rules::{apply_call_rules, apply_type_rules, CallSite, Site, CALL_RULES, TYPE_RULES};
use super::{written_name, ClassContext, Emitter, Vars};
use crate::parser::ast::{Body, Expr, Param, TypeDecl};

pub fn classify(ctx: &ClassContext, out: &mut Emitter) {
    for decl in ctx.declarations() {
        declared_types(decl, out);
        for method in &decl.methods {
            let vars = Vars::new(decl, ctx.decl)
                .with_params(&method.params)
                .with_body(&method.body);
            calls(&method.body, &vars, out);
        }
        for ctor in &decl.constructors {
            let vars = Vars::new(decl, ctx.decl)
                .with_params(&ctor.params)
                .with_body(&ctor.body);
            calls(&ctor.body, &vars, out);
        }
        let vars = Vars::new(decl, ctx.decl).with_body(&decl.initializers);
        calls(&decl.initializers, &vars, out);
    }
}

fn declared_types(decl: &TypeDecl, out: &mut Emitter) {
    for field in &decl.fields {
        for name in &field.names {
            apply_type_rules(TYPE_RULES, Site::Field, &field.ty, name, out);
        }
    }
    let params = decl
        .methods
        .iter()
        .flat_map(|m| m.params.iter())
        .chain(decl.constructors.iter().flat_map(|c| c.params.iter()));
    for Param { name, ty, .. } in params {
        apply_type_rules(TYPE_RULES, Site::Parameter, ty, name, out);
    }
}

fn calls(body: &Body, vars: &Vars, out: &mut Emitter) {
    for call in &body.calls {
        let scope_type = match &call.scope {
            Some(Expr::Selector {
                this_rooted,
                segments,
            }) if segments.len() == 1 => {
                let declared = if *this_rooted {
                    vars.field(&segments[0])
                } else {
                    vars.lookup(&segments[0])
                };
                declared.map(written_name)
            }
            _ => None,
        };
        apply_call_rules(CALL_RULES, &CallSite { call, scope_type }, out);
    }
}
