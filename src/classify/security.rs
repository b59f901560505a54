//
//  security.rs
//  Atlas
//

//! Spring Security structure (`007_*`) visible from declarations: filter-chain
//! beans, security base types, method-security annotations and authority
//! objects. DSL calls are matched by the call rule table in the `usage` pass.

use crate::kind::DependencyKind as K;
use crate::parser::ast::{simple_name, Annotation, Method, TypeRef};

use super::rules::METHOD_SECURITY_ANNOTATIONS;
use super::{ClassContext, Emitter};

pub fn classify(ctx: &ClassContext, out: &mut Emitter) {
    supertypes(ctx, out);
    beans(ctx, out);
    method_security(ctx, out);
    creations(ctx, out);
}

fn written_simple(ty: &TypeRef) -> &str {
    ty.class_name().map(simple_name).unwrap_or("")
}

fn supertypes(ctx: &ClassContext, out: &mut Emitter) {
    let decl = ctx.decl;
    let supers = || decl.extends.iter().chain(decl.implements.iter()).map(written_simple);

    if supers().any(|n| n.ends_with("UserDetails")) {
        out.emit("UserDetails:implementation", K::UserDetails);
    }
    if decl
        .implements
        .iter()
        .map(written_simple)
        .any(|n| n.contains("UserDetailsService"))
    {
        out.emit("UserDetailsService:implementation", K::UserDetailsService);
    }
    if supers().any(|n| n == "AuthenticationProvider") {
        out.emit("AuthenticationProvider:implementation", K::AuthenticationProvider);
    }
    if supers().any(|n| n == "OncePerRequestFilter") {
        out.emit("OncePerRequestFilter:extends", K::OncePerRequestFilter);
    }

    for method in &decl.methods {
        match method.name.as_str() {
            "loadUserByUsername" => {
                out.emit("UserDetailsService:loadUserByUsername", K::UserDetailsService)
            }
            "doFilterInternal" => {
                out.emit("OncePerRequestFilter:doFilterInternal", K::OncePerRequestFilter)
            }
            _ => {}
        }
    }
}

fn returns(method: &Method, fragment: &str) -> bool {
    written_simple(&method.return_type).contains(fragment)
}

fn beans(ctx: &ClassContext, out: &mut Emitter) {
    for method in ctx.decl.methods.iter().filter(|m| m.has_annotation("Bean")) {
        if returns(method, "SecurityFilterChain") {
            out.emit(format!("SecurityFilterChain:{}", method.name), K::SecurityFilterChain);
        }
        if returns(method, "PasswordEncoder") {
            out.emit(format!("PasswordEncoder:@Bean:{}", method.name), K::PasswordEncoder);
        }
        if returns(method, "AuthenticationProvider") {
            out.emit(format!("AuthenticationProvider:@Bean:{}", method.name), K::AuthenticationProvider);
        }
    }
}

fn security_descriptor(annotation: &Annotation) -> String {
    match annotation.rendered_attr("value") {
        Some(value) => format!("{}:{}", annotation.simple_name(), value),
        None => annotation.simple_name().to_string(),
    }
}

fn method_security(ctx: &ClassContext, out: &mut Emitter) {
    let guarded = |a: &&Annotation| METHOD_SECURITY_ANNOTATIONS.iter().any(|n| a.is(n));

    for annotation in ctx.decl.annotations.iter().filter(guarded) {
        out.emit(security_descriptor(annotation), K::MethodSecurity);
    }
    for enable in ["EnableMethodSecurity", "EnableGlobalMethodSecurity"] {
        if ctx.has_annotation(enable) {
            out.emit(enable, K::MethodSecurity);
        }
    }
    for decl in ctx.declarations() {
        for method in &decl.methods {
            for annotation in method.annotations.iter().filter(guarded) {
                out.emit(security_descriptor(annotation), K::MethodSecurity);
            }
        }
    }
}

/// `new BCryptPasswordEncoder()`, `new SimpleGrantedAuthority("ROLE_X")`.
fn creations(ctx: &ClassContext, out: &mut Emitter) {
    for decl in ctx.declarations() {
        let bodies = decl
            .methods
            .iter()
            .map(|m| &m.body)
            .chain(decl.constructors.iter().map(|c| &c.body))
            .chain(std::iter::once(&decl.initializers));
        for body in bodies {
            for creation in &body.creations {
                let name = written_simple(&creation.ty);
                if name.contains("PasswordEncoder") {
                    out.emit(format!("PasswordEncoder:new:{}", name), K::PasswordEncoder);
                }
                if name.contains("GrantedAuthority") {
                    let role = creation.first_string_arg().unwrap_or(name);
                    out.emit(format!("Role:{}", role), K::RoleAuthority);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use crate::kind::DependencyKind as K;

    #[test]
    fn test_security_configuration_beans() {
        let edges = classify_sources(&[r#"
package com.shop.security;
@Configuration
@EnableMethodSecurity
public class SecurityConfig {
    @Bean
    public SecurityFilterChain api(HttpSecurity http) throws Exception {
        return http.build();
    }
    @Bean
    public PasswordEncoder encoder() { return new BCryptPasswordEncoder(); }
}
"#]);
        assert!(has(&edges, "SecurityFilterChain:api", K::SecurityFilterChain));
        assert!(has(&edges, "PasswordEncoder:@Bean:encoder", K::PasswordEncoder));
        assert!(has(&edges, "PasswordEncoder:new:BCryptPasswordEncoder", K::PasswordEncoder));
        assert!(has(&edges, "EnableMethodSecurity", K::MethodSecurity));
    }

    #[test]
    fn test_user_details_service_and_roles() {
        let edges = classify_sources(&[r#"
package com.shop.security;
public class AccountDetailsService implements UserDetailsService {
    public UserDetails loadUserByUsername(String username) {
        GrantedAuthority authority = new SimpleGrantedAuthority("ROLE_USER");
        return null;
    }
}
"#]);
        assert!(has(&edges, "UserDetailsService:implementation", K::UserDetailsService));
        assert!(has(&edges, "UserDetailsService:loadUserByUsername", K::UserDetailsService));
        assert!(has(&edges, "Role:ROLE_USER", K::RoleAuthority));
    }

    #[test]
    fn test_filter_and_method_security() {
        let edges = classify_sources(&[r#"
package com.shop.security;
public class JwtFilter extends OncePerRequestFilter {
    protected void doFilterInternal(HttpServletRequest request, HttpServletResponse response, FilterChain chain) {}
    @PreAuthorize("hasRole('ADMIN')")
    public void purge() {}
    @Secured({"ROLE_A", "ROLE_B"})
    public void audit() {}
}
"#]);
        assert!(has(&edges, "OncePerRequestFilter:extends", K::OncePerRequestFilter));
        assert!(has(&edges, "OncePerRequestFilter:doFilterInternal", K::OncePerRequestFilter));
        assert_eq!(
            targets(&edges, K::MethodSecurity),
            vec!["PreAuthorize:hasRole('ADMIN')", "Secured:ROLE_A,ROLE_B"]
        );
    }
}
