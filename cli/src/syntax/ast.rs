use super::http_method::HttpMethod;
use std::ops::Range;
use std::path::PathBuf;

pub type Span = Range<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Double,
    Single,
    Triple,
}

/// A string literal with its quotes removed and escapes decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct StrLit {
    pub value: String,
    pub quote: QuoteKind,
}

impl StrLit {
    pub fn double(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote: QuoteKind::Double,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsonKey {
    Str(StrLit),
    /// `{{name}}` used as an object key.
    Var(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsonAst {
    Null,
    Bool(bool),
    /// Number as written in the source.
    Number(String),
    Str(StrLit),
    /// Placeholder text (`{{name}}`) or a bare identifier inside a `var` body.
    VarRef(String),
    /// Arithmetic over numbers and names, e.g. `60 * 60`.
    Expr(String),
    Array(Vec<JsonAst>),
    Object(Vec<(JsonKey, JsonAst)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultipartPart {
    pub name: String,
    /// Path when it exists at compile time, inline content otherwise.
    pub source: String,
    pub mime: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadAst {
    Raw {
        chunks: Vec<StrLit>,
        mime: Option<String>,
    },
    FormEncoded(JsonAst),
    Json(JsonAst),
    File {
        path: String,
        mime: Option<String>,
    },
    Multipart(Vec<MultipartPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AzureAuthAst {
    ServicePrincipal {
        tenant_id: String,
        client_id: String,
        client_secret: String,
        scope: Option<String>,
    },
    Certificate {
        tenant_id: String,
        client_id: String,
        certificate_path: String,
        certificate_password: Option<String>,
        scope: Option<String>,
    },
    Cli {
        scope: Option<String>,
    },
    DeviceCode {
        scope: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAst {
    Basic {
        user: String,
        pass: String,
    },
    Digest {
        user: String,
        pass: String,
    },
    Ntlm {
        user: String,
        pass: String,
    },
    Hawk {
        id: String,
        key: String,
        algorithm: Option<String>,
    },
    AwsV4 {
        access_id: String,
        secret_key: String,
        service: Option<String>,
        region: Option<String>,
        session_token: Option<String>,
    },
    Azure(AzureAuthAst),
}

impl AuthAst {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthAst::Basic { .. } => "basic",
            AuthAst::Digest { .. } => "digest",
            AuthAst::Ntlm { .. } => "ntlm",
            AuthAst::Hawk { .. } => "hawk",
            AuthAst::AwsV4 { .. } => "aws",
            AuthAst::Azure(_) => "azure",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CertAst {
    Pem {
        cert_path: String,
        key_path: Option<String>,
    },
    P12 {
        path: String,
        password: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptLang {
    #[default]
    JavaScript,
    Python,
}

impl ScriptLang {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptLang::JavaScript => "javascript",
            ScriptLang::Python => "python",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptAst {
    pub lang: ScriptLang,
    pub source: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags {
    pub clear: bool,
    pub insecure: bool,
    pub no_parent_script: bool,
}

/// Byte spans of the parts of a request, used by editor integrations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestSpans {
    pub whole: Span,
    pub name: Option<Span>,
    pub named_args: Vec<Span>,
    pub url: Span,
    pub auth: Option<Span>,
    pub certificate: Option<Span>,
    pub headers: Vec<Span>,
    pub queries: Vec<Span>,
    pub payload: Option<Span>,
    pub output: Option<Span>,
    pub script: Option<Span>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RequestNode {
    pub name: Option<String>,
    pub base: Option<String>,
    pub description: Option<String>,
    pub flags: Flags,
    pub named_args: Vec<(String, String)>,
    pub method: Option<HttpMethod>,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub queries: Vec<(String, String)>,
    pub payload: Option<PayloadAst>,
    pub auth: Option<AuthAst>,
    pub certificate: Option<CertAst>,
    pub output: Option<String>,
    pub script: Option<ScriptAst>,
    pub spans: RequestSpans,
    /// File the request was parsed from; differs from the root for imports.
    pub source_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub path: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VarBody {
    Value(JsonAst),
    Function { name: String, args: Vec<String> },
    /// `p"..."` template over `{name}` markers.
    Template(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub body: VarBody,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub imports: Vec<Import>,
    pub vars: Vec<VarDecl>,
    pub requests: Vec<RequestNode>,
    pub source_path: Option<PathBuf>,
}
