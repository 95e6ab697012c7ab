use lazy_static::lazy_static;
use rand::{distributions::Alphanumeric, seq::SliceRandom, Rng};
use regex::Regex;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWER_ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

pub const RANDOM_STR: &str = "$randomStr";
pub const RANDOM_INT: &str = "$randomInt";
pub const RANDOM_FLOAT: &str = "$randomFloat";
pub const RANDOM_BOOL: &str = "$randomBool";
pub const GUID: &str = "$guid";
pub const UUID: &str = "$uuid";
pub const TIMESTAMP: &str = "$timestamp";
pub const RANDOM_SLUG: &str = "$randomSlug";
pub const RANDOM_LOREM_SLUG: &str = "$randomLoremSlug";
pub const EXPR_PREFIX: &str = "$expr:";

pub const GENERATORS: &[&str] = &[
    RANDOM_STR,
    RANDOM_INT,
    RANDOM_FLOAT,
    RANDOM_BOOL,
    GUID,
    UUID,
    TIMESTAMP,
    RANDOM_LOREM_SLUG,
    RANDOM_SLUG,
];

lazy_static! {
    static ref GENERATOR_REGEX: Regex = {
        let names: Vec<String> = GENERATORS.iter().map(|g| regex::escape(g)).collect();
        Regex::new(&format!(r"^(.*?)({})(:\d*)?", names.join("|"))).unwrap()
    };
}

/// True for placeholder names that are generated rather than looked up.
pub fn is_special(key: &str) -> bool {
    let key = key.trim();
    key.starts_with(EXPR_PREFIX) || GENERATORS.iter().any(|g| key.starts_with(g))
}

pub fn is_generator(text: &str) -> bool {
    GENERATOR_REGEX.is_match(text)
}

/// Replaces the generator call in `text` with a fresh value. Text without a
/// generator is returned unchanged.
pub fn generate(text: &str) -> String {
    let Some(caps) = GENERATOR_REGEX.captures(text) else {
        return text.to_string();
    };
    let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let category = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let length = caps
        .get(3)
        .and_then(|m| m.as_str()[1..].parse::<usize>().ok())
        .filter(|n| *n > 0);
    let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
    let value = run_generator(category, length);
    format!("{prefix}{value}{}", &text[whole..])
}

fn run_generator(category: &str, length: Option<usize>) -> String {
    match category {
        RANDOM_STR => random_str(length),
        RANDOM_INT => random_int(length),
        RANDOM_FLOAT => random_float(),
        RANDOM_BOOL => random_bool(),
        GUID | UUID => uuid::Uuid::new_v4().to_string(),
        TIMESTAMP => chrono::Utc::now().timestamp().to_string(),
        RANDOM_SLUG | RANDOM_LOREM_SLUG => random_slug(length),
        _ => String::new(),
    }
}

/// Letters and digits, starting with a letter. Length defaults to 1..=10.
pub fn random_str(length: Option<usize>) -> String {
    let mut rng = rand::thread_rng();
    let length = length.unwrap_or_else(|| rng.gen_range(1..=10));
    let mut out = String::with_capacity(length);
    out.push(*LETTERS.choose(&mut rng).unwrap_or(&b'a') as char);
    out.extend(
        (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(length.saturating_sub(1))
            .map(char::from),
    );
    out
}

/// A number with exactly `length` digits; any non-negative `i32` without a length.
pub fn random_int(length: Option<usize>) -> String {
    let mut rng = rand::thread_rng();
    match length {
        None => rng.gen_range(0..=i32::MAX).to_string(),
        Some(n) => {
            let mut out = String::with_capacity(n);
            out.push(char::from(b'0' + rng.gen_range(1..=9u8)));
            for _ in 1..n {
                out.push(char::from(b'0' + rng.gen_range(0..=9u8)));
            }
            out
        }
    }
}

pub fn random_float() -> String {
    rand::thread_rng().gen::<f64>().to_string()
}

pub fn random_bool() -> String {
    if rand::thread_rng().gen::<bool>() {
        "true".into()
    } else {
        "false".into()
    }
}

/// `length` lowercase alphanumeric words joined by `-`, four by default.
pub fn random_slug(length: Option<usize>) -> String {
    let mut rng = rand::thread_rng();
    let words = length.filter(|n| *n > 0).unwrap_or(4);
    (0..words)
        .map(|_| {
            let size = rng.gen_range(1..=9);
            (0..size)
                .map(|_| *LOWER_ALNUM.choose(&mut rng).unwrap_or(&b'a') as char)
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_str_shape() {
        for _ in 0..50 {
            let s = random_str(Some(6));
            assert_eq!(s.len(), 6);
            assert!(s.chars().next().unwrap().is_ascii_alphabetic());
            assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        }
        let s = random_str(None);
        assert!((1..=10).contains(&s.len()));
    }

    #[test]
    fn test_random_int_digits() {
        for _ in 0..50 {
            let n = random_int(Some(3));
            assert_eq!(n.len(), 3);
            assert!(!n.starts_with('0'));
        }
        assert!(random_int(None).parse::<i32>().is_ok());
    }

    #[test]
    fn test_generate_keeps_surrounding_text() {
        let v = generate("id-$randomStr:5");
        assert!(v.starts_with("id-"));
        assert_eq!(v.len(), 8);
        assert_eq!(generate("plain"), "plain");
    }

    #[test]
    fn test_slug_and_bool() {
        assert_eq!(random_slug(Some(3)).split('-').count(), 3);
        assert_eq!(random_slug(None).split('-').count(), 4);
        let single = random_slug(Some(1));
        assert!(!single.is_empty() && !single.contains('-'));
        assert_eq!(random_slug(Some(0)).split('-').count(), 4);
        assert!(!generate("$randomSlug:1").contains('-'));
        assert!(["true", "false"].contains(&random_bool().as_str()));
        let f: f64 = random_float().parse().unwrap();
        assert!((0.0..1.0).contains(&f));
    }

    #[test]
    fn test_is_special() {
        assert!(is_special("$randomStr:4"));
        assert!(is_special(" $uuid"));
        assert!(is_special("$expr:1+2"));
        assert!(!is_special("token"));
    }

    #[test]
    fn test_uuid_generator() {
        let v = generate("$uuid");
        assert!(uuid::Uuid::parse_str(&v).is_ok());
    }
}
