//
//  rules.rs
//  Atlas
//

//! Declarative rule tables and the small engine that evaluates them.
//!
//! Call rules fire on method invocations, type-use rules on declared field
//! and parameter types. Within one construct only the first matching rule of
//! each kind fires.

use crate::kind::DependencyKind;
use crate::parser::ast::{MethodCall, TypeRef};

use super::Emitter;

/// Name test: exact match against one list or substring match against another.
#[derive(Debug, Clone, Copy)]
pub struct Names {
    pub exact: &'static [&'static str],
    pub contains: &'static [&'static str],
}

impl Names {
    pub const fn exact(names: &'static [&'static str]) -> Self {
        Self {
            exact: names,
            contains: &[],
        }
    }

    pub const fn contains(fragments: &'static [&'static str]) -> Self {
        Self {
            exact: &[],
            contains: fragments,
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.exact.contains(&name) || self.contains.iter().any(|f| name.contains(f))
    }
}

/// Extra condition on a call, beyond its method name.
#[derive(Debug, Clone, Copy)]
pub enum Guard {
    Always,
    /// Scope text or the scope variable's declared type contains a fragment (case-insensitive).
    Scope(&'static [&'static str]),
    /// As `Scope`, but an unqualified call also passes.
    ScopeOrAbsent(&'static [&'static str]),
    /// Some argument's source text contains a fragment.
    Argument(&'static [&'static str]),
    HasArguments,
}

/// How the target identifier of a call rule is built.
#[derive(Debug, Clone, Copy)]
pub enum CallTarget {
    /// `prefix` + method name.
    Named(&'static str),
    Fixed(&'static str),
    /// `prefix` + first string-literal argument, falling back to `prefix` + method name.
    FirstString(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct CallRule {
    pub kind: DependencyKind,
    pub names: Names,
    pub guard: Guard,
    pub target: CallTarget,
}

/// A method invocation plus what is known about its receiver.
pub struct CallSite<'a> {
    pub call: &'a MethodCall,
    /// Written type of the receiver variable, when the scope names one.
    pub scope_type: Option<String>,
}

impl CallSite<'_> {
    fn scope_mentions(&self, fragments: &[&str]) -> Option<bool> {
        let text = self.call.scope_text()?.to_ascii_lowercase();
        let ty = self
            .scope_type
            .as_deref()
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        Some(
            fragments
                .iter()
                .map(|f| f.to_ascii_lowercase())
                .any(|f| text.contains(&f) || ty.contains(&f)),
        )
    }

    fn passes(&self, guard: Guard) -> bool {
        match guard {
            Guard::Always => true,
            Guard::Scope(fragments) => self.scope_mentions(fragments).unwrap_or(false),
            Guard::ScopeOrAbsent(fragments) => self.scope_mentions(fragments).unwrap_or(true),
            Guard::Argument(fragments) => self
                .call
                .args
                .iter()
                .any(|a| fragments.iter().any(|f| a.text().contains(f))),
            Guard::HasArguments => !self.call.args.is_empty(),
        }
    }

    fn target(&self, target: CallTarget) -> String {
        let name = &self.call.name;
        match target {
            CallTarget::Named(prefix) => format!("{}{}", prefix, name),
            CallTarget::Fixed(text) => text.to_string(),
            CallTarget::FirstString(prefix) => match self.call.first_string_arg() {
                Some(value) => format!("{}{}", prefix, value),
                None => format!("{}{}", prefix, name),
            },
        }
    }
}

/// Evaluate `rules` against one call.
pub fn apply_call_rules(rules: &[CallRule], site: &CallSite, out: &mut Emitter) {
    let mut fired: Vec<DependencyKind> = Vec::new();
    for rule in rules {
        if fired.contains(&rule.kind) || !rule.names.matches(&site.call.name) || !site.passes(rule.guard) {
            continue;
        }
        fired.push(rule.kind);
        out.emit(site.target(rule.target), rule.kind);
    }
}

/// Where a declared type appears.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    Field,
    Parameter,
}

/// How the target identifier of a type-use rule is built.
#[derive(Debug, Clone, Copy)]
pub enum TypeTarget {
    Fixed(&'static str),
    /// `prefix` + the type as written.
    Type(&'static str),
    /// `prefix` + the variable name.
    Variable(&'static str),
}

#[derive(Debug, Clone, Copy)]
pub struct TypeUseRule {
    pub kind: DependencyKind,
    pub sites: &'static [Site],
    pub names: Names,
    pub target: TypeTarget,
}

/// Evaluate `rules` against one declared variable.
pub fn apply_type_rules(rules: &[TypeUseRule], site: Site, ty: &TypeRef, variable: &str, out: &mut Emitter) {
    let written = ty.display();
    let mut fired: Vec<DependencyKind> = Vec::new();
    for rule in rules {
        if fired.contains(&rule.kind) || !rule.sites.contains(&site) || !rule.names.matches(&written) {
            continue;
        }
        fired.push(rule.kind);
        let target = match rule.target {
            TypeTarget::Fixed(text) => text.to_string(),
            TypeTarget::Type(prefix) => format!("{}{}", prefix, written),
            TypeTarget::Variable(prefix) => format!("{}{}", prefix, variable),
        };
        out.emit(target, rule.kind);
    }
}

/// True when `name` (as written) matches any entry by simple name or qualified suffix.
pub fn annotation_in(name: &str, table: &[&str]) -> bool {
    table
        .iter()
        .any(|wanted| crate::parser::ast::names_match(name, wanted))
}

use DependencyKind as K;

const FIELD: &[Site] = &[Site::Field];
const PARAM: &[Site] = &[Site::Parameter];
const ANY_SITE: &[Site] = &[Site::Field, Site::Parameter];

/// Rules over method invocations.
pub const CALL_RULES: &[CallRule] = &[
    CallRule {
        kind: K::HttpSecurityRule,
        names: Names::exact(&[
            "authorizeHttpRequests",
            "authorizeRequests",
            "requestMatchers",
            "antMatchers",
            "mvcMatchers",
            "regexMatchers",
            "permitAll",
            "authenticated",
            "hasRole",
            "hasAnyRole",
            "hasAuthority",
            "hasAnyAuthority",
            "access",
            "denyAll",
        ]),
        guard: Guard::Always,
        target: CallTarget::Named("HttpSecurity:"),
    },
    CallRule {
        kind: K::UserDetails,
        names: Names {
            exact: &["getAuthorities", "getRoles"],
            contains: &["GrantedAuthority"],
        },
        guard: Guard::Always,
        target: CallTarget::Named("GrantedAuthority:"),
    },
    CallRule {
        kind: K::PasswordEncoder,
        names: Names::contains(&["PasswordEncoder", "BCrypt", "Argon2", "Pbkdf2"]),
        guard: Guard::Always,
        target: CallTarget::Named("PasswordEncoder:new:"),
    },
    CallRule {
        kind: K::AuthenticationManager,
        names: Names::exact(&["authenticate"]),
        guard: Guard::ScopeOrAbsent(&["AuthenticationManager"]),
        target: CallTarget::Fixed("AuthenticationManager:authenticate"),
    },
    CallRule {
        kind: K::RoleAuthority,
        names: Names::contains(&["GrantedAuthority", "ROLE_", "SCOPE_"]),
        guard: Guard::Always,
        target: CallTarget::FirstString("Role:"),
    },
    CallRule {
        kind: K::SecurityContext,
        names: Names::exact(&["getContext"]),
        guard: Guard::Scope(&["SecurityContextHolder"]),
        target: CallTarget::Fixed("SecurityContext:getContext"),
    },
    CallRule {
        kind: K::SecurityContext,
        names: Names::exact(&["getAuthentication", "setAuthentication"]),
        guard: Guard::Always,
        target: CallTarget::Named("SecurityContext:"),
    },
    CallRule {
        kind: K::SessionManagement,
        names: Names::exact(&["sessionManagement", "sessionCreationPolicy"]),
        guard: Guard::Always,
        target: CallTarget::Named("SessionManagement:"),
    },
    CallRule {
        kind: K::TokenExtraction,
        names: Names::contains(&["Authorization", "Bearer"]),
        guard: Guard::Always,
        target: CallTarget::Named("TokenExtraction:"),
    },
    CallRule {
        kind: K::TokenExtraction,
        names: Names::exact(&["getHeader", "get"]),
        guard: Guard::Argument(&["Authorization", "Bearer"]),
        target: CallTarget::Named("TokenExtraction:"),
    },
    CallRule {
        kind: K::JwtVerification,
        names: Names::contains(&["JWT", "Jwt", "Jws", "Verifier", "Nimbus"]),
        guard: Guard::Always,
        target: CallTarget::Named("JWT:"),
    },
    CallRule {
        kind: K::JwtVerification,
        names: Names::exact(&["verify", "parse", "parser", "parserBuilder", "parseSignedClaims"]),
        guard: Guard::ScopeOrAbsent(&["jwt", "jws", "verifier", "decoder", "parser", "token"]),
        target: CallTarget::Named("JWT:"),
    },
    CallRule {
        kind: K::ClaimToAuthority,
        names: Names::contains(&["getClaim"]),
        guard: Guard::Always,
        target: CallTarget::Named("ClaimToAuthority:"),
    },
    CallRule {
        kind: K::ClaimToAuthority,
        names: Names::contains(&["GrantedAuthority"]),
        guard: Guard::HasArguments,
        target: CallTarget::Named("ClaimToAuthority:"),
    },
    CallRule {
        kind: K::LoginLogout,
        names: Names::exact(&[
            "formLogin",
            "httpBasic",
            "logout",
            "loginPage",
            "loginProcessingUrl",
            "defaultSuccessUrl",
            "failureUrl",
            "logoutUrl",
            "logoutSuccessUrl",
        ]),
        guard: Guard::Always,
        target: CallTarget::Named("LoginLogout:"),
    },
    CallRule {
        kind: K::CorsCsrf,
        names: Names::exact(&["cors", "csrf"]),
        guard: Guard::Always,
        target: CallTarget::Named("CorsCsrf:"),
    },
    CallRule {
        kind: K::CorsCsrf,
        names: Names::exact(&["disable"]),
        guard: Guard::Always,
        target: CallTarget::Fixed("CorsCsrf:disable"),
    },
    CallRule {
        kind: K::Jackson,
        names: Names {
            exact: &[
                "readValue",
                "writeValueAsString",
                "writeValue",
                "readTree",
                "convertValue",
                "valueToTree",
            ],
            contains: &["Json"],
        },
        guard: Guard::ScopeOrAbsent(&["ObjectMapper"]),
        target: CallTarget::Named("Jackson:ObjectMapper:"),
    },
];

/// Rules over declared field and parameter types.
pub const TYPE_RULES: &[TypeUseRule] = &[
    TypeUseRule {
        kind: K::HttpClient,
        sites: FIELD,
        names: Names::contains(&["WebClient"]),
        target: TypeTarget::Fixed("WebClient"),
    },
    TypeUseRule {
        kind: K::HttpClient,
        sites: FIELD,
        names: Names::contains(&["RestTemplate"]),
        target: TypeTarget::Fixed("RestTemplate"),
    },
    TypeUseRule {
        kind: K::HttpClient,
        sites: FIELD,
        names: Names::contains(&["RestClient"]),
        target: TypeTarget::Fixed("RestClient"),
    },
    TypeUseRule {
        kind: K::PasswordEncoder,
        sites: FIELD,
        names: Names::contains(&["PasswordEncoder"]),
        target: TypeTarget::Variable("PasswordEncoder:field:"),
    },
    TypeUseRule {
        kind: K::PasswordEncoder,
        sites: PARAM,
        names: Names::contains(&["PasswordEncoder"]),
        target: TypeTarget::Variable("PasswordEncoder:parameter:"),
    },
    TypeUseRule {
        kind: K::JwtVerification,
        sites: FIELD,
        names: Names::contains(&["JWT", "Jws", "JwtDecoder", "JwtEncoder", "Nimbus"]),
        target: TypeTarget::Type("JWT:type:"),
    },
    TypeUseRule {
        kind: K::Jackson,
        sites: ANY_SITE,
        names: Names::contains(&["ObjectMapper", "JsonNode", "ObjectReader", "ObjectWriter"]),
        target: TypeTarget::Type("Jackson:ObjectMapper:"),
    },
];

/// Container types whose arguments are held elements rather than plain generic arguments.
pub const COLLECTION_TYPES: &[&str] = &[
    "Collection",
    "List",
    "ArrayList",
    "LinkedList",
    "Set",
    "HashSet",
    "LinkedHashSet",
    "TreeSet",
    "SortedSet",
    "Queue",
    "Deque",
    "ArrayDeque",
    "Map",
    "HashMap",
    "LinkedHashMap",
    "TreeMap",
    "SortedMap",
    "ConcurrentMap",
    "ConcurrentHashMap",
    "Iterable",
];

/// Name prefixes of derived repository query methods.
pub const QUERY_METHOD_PREFIXES: &[&str] = &["find", "get", "count", "exists", "delete", "save"];

pub const VALIDATION_CONSTRAINTS: &[&str] = &[
    "NotNull",
    "NotEmpty",
    "NotBlank",
    "Size",
    "Min",
    "Max",
    "Email",
    "Pattern",
    "Past",
    "Future",
    "DecimalMin",
    "DecimalMax",
    "Positive",
    "PositiveOrZero",
    "Negative",
    "NegativeOrZero",
];

pub const VALID_MARKERS: &[&str] = &["Valid", "Validated"];

pub const LOMBOK_TYPE_ANNOTATIONS: &[&str] = &[
    "Getter",
    "Setter",
    "Data",
    "Builder",
    "AllArgsConstructor",
    "NoArgsConstructor",
    "RequiredArgsConstructor",
    "ToString",
    "EqualsAndHashCode",
    "Slf4j",
    "Log",
    "Log4j2",
    "Value",
    "With",
];

pub const LOMBOK_FIELD_ANNOTATIONS: &[&str] = &["Getter", "Setter"];

pub const LOMBOK_CONSTRUCTOR_ANNOTATIONS: &[&str] =
    &["AllArgsConstructor", "NoArgsConstructor", "RequiredArgsConstructor"];

/// Lombok logger annotations and the logger type each one injects.
pub const LOMBOK_LOGGERS: &[(&str, &str)] = &[
    ("Slf4j", "org.slf4j.Logger"),
    ("Log4j2", "org.apache.logging.log4j.Logger"),
    ("CommonsLog", "org.apache.commons.logging.Log"),
    ("Log", "java.util.logging.Logger"),
];

pub const LOGGER_TYPES: &[&str] = &[
    "org.slf4j.Logger",
    "org.apache.logging.log4j.Logger",
    "java.util.logging.Logger",
    "org.apache.commons.logging.Log",
];

pub const ADVICE_ANNOTATIONS: &[&str] =
    &["Around", "Before", "After", "AfterReturning", "AfterThrowing", "Pointcut"];

pub const METHOD_SECURITY_ANNOTATIONS: &[&str] = &["PreAuthorize", "PostAuthorize", "Secured", "RolesAllowed"];

pub const BINDING_ANNOTATIONS: &[&str] = &[
    "PathVariable",
    "RequestParam",
    "RequestBody",
    "RequestHeader",
    "CookieValue",
    "ModelAttribute",
];

pub const TEST_SLICE_ANNOTATIONS: &[&str] = &[
    "WebMvcTest",
    "DataJpaTest",
    "JsonTest",
    "WebFluxTest",
    "DataJdbcTest",
    "JdbcTest",
    "DataMongoTest",
    "DataRedisTest",
    "RestClientTest",
];

pub const INJECTION_MARKERS: &[&str] = &["Autowired", "Inject"];

pub const EVENT_LISTENERS: &[&str] = &["EventListener", "TransactionalEventListener"];

/// Jackson annotation: `Json*` by simple name, or anything under `com.fasterxml.jackson`.
pub fn is_jackson_annotation(name: &str) -> bool {
    crate::parser::ast::simple_name(name).starts_with("Json") || name.contains("com.fasterxml.jackson")
}

/// Lombok annotation by qualified package or by one of the listed simple names.
pub fn is_lombok_annotation(name: &str, table: &[&str]) -> bool {
    name.starts_with("lombok.") || annotation_in(name, table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Expr;

    fn call(scope: Option<&str>, name: &str, args: Vec<Expr>) -> MethodCall {
        MethodCall {
            scope: scope.map(Expr::name),
            name: name.to_string(),
            args,
        }
    }

    fn run(site: CallSite) -> Vec<(String, DependencyKind)> {
        let mut out = Emitter::new();
        apply_call_rules(CALL_RULES, &site, &mut out);
        out.into_vec().into_iter().map(|c| (c.target, c.kind)).collect()
    }

    #[test]
    fn test_names_matching() {
        let names = Names {
            exact: &["get"],
            contains: &["Bearer"],
        };
        assert!(names.matches("get"));
        assert!(names.matches("resolveBearerToken"));
        assert!(!names.matches("getter"));
    }

    #[test]
    fn test_http_security_rule() {
        let c = call(Some("auth"), "requestMatchers", vec![Expr::StringLit("/api/**".into())]);
        let fired = run(CallSite { call: &c, scope_type: None });
        assert_eq!(fired, vec![("HttpSecurity:requestMatchers".to_string(), K::HttpSecurityRule)]);
    }

    #[test]
    fn test_scope_guard_uses_declared_type() {
        let c = call(Some("manager"), "authenticate", Vec::new());
        assert!(run(CallSite { call: &c, scope_type: None }).is_empty());
        let typed = run(CallSite {
            call: &c,
            scope_type: Some("AuthenticationManager".to_string()),
        });
        assert_eq!(typed[0].0, "AuthenticationManager:authenticate");

        let bare = call(None, "authenticate", Vec::new());
        assert_eq!(run(CallSite { call: &bare, scope_type: None }).len(), 1);
    }

    #[test]
    fn test_token_extraction_fires_once() {
        let c = call(
            Some("request"),
            "getHeader",
            vec![Expr::StringLit("Authorization".into())],
        );
        let fired = run(CallSite { call: &c, scope_type: None });
        assert_eq!(fired, vec![("TokenExtraction:getHeader".to_string(), K::TokenExtraction)]);
    }

    #[test]
    fn test_role_uses_string_argument() {
        let c = call(None, "ROLE_ADMIN_check", vec![Expr::StringLit("ADMIN".into())]);
        let fired = run(CallSite { call: &c, scope_type: None });
        assert!(fired.contains(&("Role:ADMIN".to_string(), K::RoleAuthority)));
    }

    #[test]
    fn test_parse_int_is_not_jwt() {
        let c = call(Some("Integer"), "parseInt", vec![Expr::name("raw")]);
        assert!(run(CallSite { call: &c, scope_type: None }).is_empty());
        let jwt = call(Some("jwtParser"), "parse", vec![Expr::name("token")]);
        assert_eq!(run(CallSite { call: &jwt, scope_type: None })[0].0, "JWT:parse");
    }

    #[test]
    fn test_type_rules() {
        let mut out = Emitter::new();
        apply_type_rules(TYPE_RULES, Site::Field, &TypeRef::named("PasswordEncoder"), "encoder", &mut out);
        apply_type_rules(TYPE_RULES, Site::Parameter, &TypeRef::named("ObjectMapper"), "mapper", &mut out);
        apply_type_rules(TYPE_RULES, Site::Parameter, &TypeRef::named("RestTemplate"), "rest", &mut out);
        let targets: Vec<_> = out.into_vec().into_iter().map(|c| c.target).collect();
        assert_eq!(
            targets,
            vec!["PasswordEncoder:field:encoder", "Jackson:ObjectMapper:ObjectMapper"]
        );
    }

    #[test]
    fn test_annotation_tables() {
        assert!(annotation_in("javax.validation.constraints.NotNull", VALIDATION_CONSTRAINTS));
        assert!(is_jackson_annotation("JsonIgnore"));
        assert!(is_lombok_annotation("lombok.experimental.SuperBuilder", LOMBOK_FIELD_ANNOTATIONS));
        assert!(!is_lombok_annotation("Override", LOMBOK_TYPE_ANNOTATIONS));
    }
}
