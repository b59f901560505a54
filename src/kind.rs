//
//  kind.rs
//  Atlas
//

//! Dependency kind taxonomy.
//!
//! Every edge the classifier emits carries exactly one of these kinds. The
//! set is closed: codes only enter from text at the storage and CLI
//! boundaries, through [`DependencyKind::from_code`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AtlasError, Result};

/// Rule family a kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    TypeStructure,
    DependencyInjection,
    Persistence,
    Configuration,
    Messaging,
    CrossCutting,
    Security,
    Library,
    Layering,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::TypeStructure => "type structure",
            Category::DependencyInjection => "dependency injection",
            Category::Persistence => "persistence",
            Category::Configuration => "configuration",
            Category::Messaging => "messaging",
            Category::CrossCutting => "cross-cutting",
            Category::Security => "security",
            Category::Library => "library",
            Category::Layering => "layering",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DependencyKind {
    // 001 type structure
    Extends,
    Implements,
    GenericArgument,
    ExceptionType,
    MethodCall,
    ReturnType,
    ParameterType,
    StaticCall,
    Composition,
    CollectionElement,
    ConstantReference,
    LocalVariable,
    ObjectCreation,
    ArrayElement,
    TypeParameterBound,
    // 002 dependency injection
    SetterInjection,
    BeanDefinition,
    ConstructorInjection,
    FieldInjection,
    Controller,
    Service,
    Repository,
    // 003 persistence
    JpaRepository,
    JpaEntity,
    QueryMethod,
    Dto,
    Mapper,
    // 004 configuration
    ValueInjection,
    ConfigurationProperties,
    ProfileCondition,
    AutoConfiguration,
    BuildDependency,
    // 005 messaging
    EventListener,
    HttpClient,
    MessageListener,
    // 006 cross-cutting
    Transaction,
    Aspect,
    LoggingMetrics,
    BeanValidation,
    // 007 security
    SecurityFilterChain,
    HttpSecurityRule,
    UserDetails,
    UserDetailsService,
    PasswordEncoder,
    AuthenticationManager,
    AuthenticationProvider,
    OncePerRequestFilter,
    MethodSecurity,
    RoleAuthority,
    SecurityContext,
    SessionManagement,
    TokenExtraction,
    JwtVerification,
    ClaimToAuthority,
    LoginLogout,
    CorsCsrf,
    // 008 library markers
    Lombok,
    Jackson,
    // 009 layering
    ControllerToService,
    ServiceToRepository,
    RepositoryToEntity,
    RequestBinding,
    TestSlice,
}

struct KindInfo {
    kind: DependencyKind,
    code: &'static str,
    description: &'static str,
    category: Category,
}

macro_rules! kinds {
    ($(($kind:ident, $code:literal, $desc:literal, $cat:ident)),* $(,)?) => {
        const TABLE: &[KindInfo] = &[
            $(KindInfo {
                kind: DependencyKind::$kind,
                code: $code,
                description: $desc,
                category: Category::$cat,
            }),*
        ];
    };
}

kinds![
    (Extends, "001_001", "extends", TypeStructure),
    (Implements, "001_002", "implements", TypeStructure),
    (GenericArgument, "001_003", "generic type argument", TypeStructure),
    (ExceptionType, "001_004", "exception type", TypeStructure),
    (MethodCall, "001_005", "method call", TypeStructure),
    (ReturnType, "001_006", "return type", TypeStructure),
    (ParameterType, "001_007", "parameter type", TypeStructure),
    (StaticCall, "001_008", "static method call", TypeStructure),
    (Composition, "001_009", "composition", TypeStructure),
    (CollectionElement, "001_010", "collection element", TypeStructure),
    (ConstantReference, "001_011", "constant reference", TypeStructure),
    (LocalVariable, "001_012", "local variable type", TypeStructure),
    (ObjectCreation, "001_013", "object creation", TypeStructure),
    (ArrayElement, "001_014", "array element type", TypeStructure),
    (TypeParameterBound, "001_015", "type parameter bound", TypeStructure),
    (SetterInjection, "002_001", "setter injection", DependencyInjection),
    (BeanDefinition, "002_002", "bean definition", DependencyInjection),
    (ConstructorInjection, "002_003", "constructor injection", DependencyInjection),
    (FieldInjection, "002_004", "field injection", DependencyInjection),
    (Controller, "002_005", "controller", DependencyInjection),
    (Service, "002_006", "service", DependencyInjection),
    (Repository, "002_007", "repository", DependencyInjection),
    (JpaRepository, "003_001", "JPA repository", Persistence),
    (JpaEntity, "003_002", "JPA entity", Persistence),
    (QueryMethod, "003_003", "query method", Persistence),
    (Dto, "003_004", "DTO", Persistence),
    (Mapper, "003_005", "mapper", Persistence),
    (ValueInjection, "004_001", "value injection", Configuration),
    (ConfigurationProperties, "004_002", "configuration properties", Configuration),
    (ProfileCondition, "004_003", "profile condition", Configuration),
    (AutoConfiguration, "004_004", "auto-configuration", Configuration),
    (BuildDependency, "004_005", "build dependency", Configuration),
    (EventListener, "005_001", "event listener", Messaging),
    (HttpClient, "005_002", "HTTP client", Messaging),
    (MessageListener, "005_003", "message listener", Messaging),
    (Transaction, "006_001", "transaction", CrossCutting),
    (Aspect, "006_002", "aspect", CrossCutting),
    (LoggingMetrics, "006_003", "logging and metrics", CrossCutting),
    (BeanValidation, "006_004", "bean validation", CrossCutting),
    (SecurityFilterChain, "007_001", "SecurityFilterChain", Security),
    (HttpSecurityRule, "007_002", "HttpSecurity rule", Security),
    (UserDetails, "007_003", "UserDetails", Security),
    (UserDetailsService, "007_004", "UserDetailsService", Security),
    (PasswordEncoder, "007_005", "PasswordEncoder", Security),
    (AuthenticationManager, "007_006", "AuthenticationManager", Security),
    (AuthenticationProvider, "007_007", "AuthenticationProvider", Security),
    (OncePerRequestFilter, "007_008", "OncePerRequestFilter", Security),
    (MethodSecurity, "007_009", "method security", Security),
    (RoleAuthority, "007_010", "role or authority", Security),
    (SecurityContext, "007_011", "SecurityContext", Security),
    (SessionManagement, "007_012", "session management", Security),
    (TokenExtraction, "007_013", "token extraction", Security),
    (JwtVerification, "007_014", "JWT signing and verification", Security),
    (ClaimToAuthority, "007_015", "claim to authority", Security),
    (LoginLogout, "007_016", "login and logout", Security),
    (CorsCsrf, "007_017", "CORS and CSRF", Security),
    (Lombok, "008_001", "Lombok", Library),
    (Jackson, "008_002", "Jackson", Library),
    (ControllerToService, "009_001", "controller to service", Layering),
    (ServiceToRepository, "009_002", "service to repository", Layering),
    (RepositoryToEntity, "009_003", "repository to entity", Layering),
    (RequestBinding, "009_004", "request binding", Layering),
    (TestSlice, "009_005", "test slice", Layering),
];

impl DependencyKind {
    fn info(self) -> &'static KindInfo {
        // TABLE is declared in enum order.
        &TABLE[self as usize]
    }

    /// Every kind, in code order.
    pub fn all() -> impl Iterator<Item = DependencyKind> {
        TABLE.iter().map(|info| info.kind)
    }

    pub fn code(self) -> &'static str {
        self.info().code
    }

    pub fn description(self) -> &'static str {
        self.info().description
    }

    pub fn category(self) -> Category {
        self.info().category
    }

    /// Diagram edge label: `<code>_<description>`.
    pub fn label(self) -> String {
        format!("{}_{}", self.code(), self.description())
    }

    pub fn from_code(code: &str) -> Result<Self> {
        TABLE
            .iter()
            .find(|info| info.code == code)
            .map(|info| info.kind)
            .ok_or_else(|| AtlasError::UnknownDependencyKind(code.to_string()))
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<DependencyKind> for String {
    fn from(kind: DependencyKind) -> Self {
        kind.code().to_string()
    }
}

impl TryFrom<String> for DependencyKind {
    type Error = AtlasError;

    fn try_from(code: String) -> Result<Self> {
        DependencyKind::from_code(&code)
    }
}
