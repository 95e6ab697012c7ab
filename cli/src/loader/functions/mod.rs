pub mod datetime;
pub mod random;
pub mod traits;

use lazy_static::lazy_static;
use std::collections::HashMap;
use traits::VarFunction;

lazy_static! {
    static ref FUNCTIONS: HashMap<String, Box<dyn VarFunction>> = {
        let mut m = HashMap::new();
        register(random::RandomStr, &mut m);
        register(random::RandomInt, &mut m);
        register(random::RandomFloat, &mut m);
        register(random::RandomBool, &mut m);
        register(random::RandomSlug, &mut m);
        register(random::Guid("guid"), &mut m);
        register(random::Guid("uuid"), &mut m);
        register(datetime::Timestamp, &mut m);
        register(datetime::Now, &mut m);
        m
    };
}

fn register<F: VarFunction + 'static>(f: F, m: &mut HashMap<String, Box<dyn VarFunction>>) {
    m.insert(f.name().to_string(), Box::new(f));
}

pub fn get_function(name: &str) -> Option<&'static dyn VarFunction> {
    FUNCTIONS.get(name).map(|f| f.as_ref())
}

/// Calls a registered function. An unknown name evaluates to the name itself.
pub fn call(name: &str, args: &[String]) -> Result<String, String> {
    match get_function(name) {
        Some(f) => {
            f.validate_args(args)?;
            f.execute(args)
        }
        None => {
            tracing::warn!("unknown function `${name}`, using its name as the value");
            Ok(name.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        assert!(get_function("randomStr").is_some());
        assert!(get_function("uuid").is_some());
        assert!(get_function("nope").is_none());
    }

    #[test]
    fn test_unknown_function_is_its_name() {
        assert_eq!(call("nope", &[]).unwrap(), "nope");
        assert!(call("randomInt", &["x".into()]).is_err());
    }
}
