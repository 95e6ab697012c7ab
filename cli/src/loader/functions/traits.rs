/// A built-in callable usable as a `var` body, e.g. `var id = $randomStr(8);`.
pub trait VarFunction: Send + Sync {
    fn name(&self) -> &str;

    fn validate_args(&self, _args: &[String]) -> Result<(), String> {
        Ok(())
    }

    fn execute(&self, args: &[String]) -> Result<String, String>;
}

/// Parses an optional positive length argument.
pub fn length_arg(name: &str, args: &[String]) -> Result<Option<usize>, String> {
    match args {
        [] => Ok(None),
        [n] => n
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| format!("${name} expects a length, got `{n}`")),
        _ => Err(format!("${name} takes at most one argument (length)")),
    }
}
