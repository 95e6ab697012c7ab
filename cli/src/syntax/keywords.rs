pub const KW_IMPORT: &str = "import";
pub const KW_VAR: &str = "var";
pub const ALL_KEYWORDS: &[&str] = &[KW_IMPORT, KW_VAR];

pub const ANN_NAME: &str = "@name";
pub const ANN_CLEAR: &str = "@clear";
pub const ANN_INSECURE: &str = "@insecure";
pub const ANN_NO_PARENT_SCRIPT: &str = "@no-parent-script";

pub const FN_BASIC_AUTH: &str = "basicauth";
pub const FN_DIGEST_AUTH: &str = "digestauth";
pub const FN_NTLM_AUTH: &str = "ntlmauth";
pub const FN_HAWK_AUTH: &str = "hawkauth";
pub const FN_AWS_AUTH: &str = "awsauth";
pub const FN_AZURE_SP_SECRET: &str = "azurespsecret";
pub const FN_AZURE_SP_CERT: &str = "azurespcert";
pub const FN_AZURE_CLI: &str = "azurecli";
pub const FN_AZURE_DEVICE_CODE: &str = "azuredevicecode";
pub const AUTH_FUNCTIONS: &[&str] = &[
    FN_BASIC_AUTH,
    FN_DIGEST_AUTH,
    FN_NTLM_AUTH,
    FN_HAWK_AUTH,
    FN_AWS_AUTH,
    FN_AZURE_SP_SECRET,
    FN_AZURE_SP_CERT,
    FN_AZURE_CLI,
    FN_AZURE_DEVICE_CODE,
];

pub const FN_CERTIFICATE: &str = "certificate";
pub const FN_P12: &str = "p12";

pub const FN_TEXT: &str = "text";
pub const FN_DATA: &str = "data";
pub const FN_URLENCODED: &str = "urlencoded";
pub const FN_JSON: &str = "json";
pub const FN_FILEINPUT: &str = "fileinput";
pub const FN_MULTIPART: &str = "multipart";
pub const FN_FILES: &str = "files";
pub const FN_OUTPUT: &str = "output";
pub const PAYLOAD_FUNCTIONS: &[&str] = &[
    FN_TEXT,
    FN_DATA,
    FN_URLENCODED,
    FN_JSON,
    FN_FILEINPUT,
    FN_MULTIPART,
    FN_FILES,
];

pub const LANG_JAVASCRIPT: &str = "javascript";
pub const LANG_PYTHON: &str = "python";

pub const PUNC_LBRACE: &str = "{";
pub const PUNC_RBRACE: &str = "}";
pub const PUNC_LPAREN: &str = "(";
pub const PUNC_RPAREN: &str = ")";
pub const PUNC_LBRACKET: &str = "[";
pub const PUNC_RBRACKET: &str = "]";
pub const PUNC_COLON: &str = ":";
pub const PUNC_SEMI: &str = ";";
pub const PUNC_COMMA: &str = ",";

pub const OP_ASSIGN: &str = "=";
pub const OP_QUERY: &str = "?";
pub const OP_LT: &str = "<";
pub const OP_GT: &str = ">";
pub const OP_APPEND: &str = ">>";
