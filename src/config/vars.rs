//! Environment variable interpolation for config files.
//!
//! Supports braced references only:
//! - `${VAR}` - substitute with env var value, error if missing
//! - `${VAR:-default}` - use default if VAR is unset or empty

use regex::Regex;
use std::env;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("Invalid regex pattern")
});

/// Result of environment variable interpolation.
#[derive(Debug)]
pub struct InterpolationResult {
    /// The interpolated text.
    pub text: String,
    /// Any errors encountered during interpolation.
    pub errors: Vec<String>,
}

impl InterpolationResult {
    /// Returns true if there were no errors.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Interpolate environment variables in the given text.
///
/// All errors are accumulated so the user can see every missing variable at once.
pub fn interpolate(input: &str) -> InterpolationResult {
    let mut errors = Vec::new();

    let text = ENV_VAR_PATTERN
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let default_value = caps.get(2).map(|m| m.as_str());

            match env::var(var_name) {
                Ok(value) if value.contains('\n') || value.contains('\r') => {
                    errors.push(format!(
                        "environment variable '{}' contains newlines, which is not allowed",
                        var_name
                    ));
                    caps.get(0).unwrap().as_str().to_string()
                }
                Ok(value) if value.is_empty() && default_value.is_some() => {
                    default_value.unwrap_or("").to_string()
                }
                Ok(value) => value,
                Err(_) => match default_value {
                    Some(default) => default.to_string(),
                    None => {
                        errors.push(format!("environment variable '{}' is not set", var_name));
                        caps.get(0).unwrap().as_str().to_string()
                    }
                },
            }
        })
        .to_string();

    InterpolationResult { text, errors }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn with_env_vars<F, R>(vars: &[(&str, Option<&str>)], f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let originals: Vec<_> = vars.iter().map(|(k, _)| (*k, env::var(k).ok())).collect();

        // SAFETY: These tests run serially (not in parallel) and we restore values after
        for (key, value) in vars {
            match value {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        let result = f();

        // SAFETY: Restoring original environment state
        for (key, original) in originals {
            match original {
                Some(v) => unsafe { env::set_var(key, v) },
                None => unsafe { env::remove_var(key) },
            }
        }

        result
    }

    #[test]
    fn test_braced_substitution() {
        with_env_vars(&[("SNOWMELT_TEST_BRACED", Some("world"))], || {
            let result = interpolate("value: ${SNOWMELT_TEST_BRACED}");
            assert!(result.is_ok());
            assert_eq!(result.text, "value: world");
        });
    }

    #[test]
    fn test_missing_variable_error() {
        with_env_vars(&[("SNOWMELT_TEST_MISSING", None)], || {
            let result = interpolate("value: ${SNOWMELT_TEST_MISSING}");
            assert!(!result.is_ok());
            assert_eq!(result.errors.len(), 1);
            assert!(result.errors[0].contains("SNOWMELT_TEST_MISSING"));
            assert!(result.errors[0].contains("not set"));
        });
    }

    #[test]
    fn test_multiple_missing_variables() {
        with_env_vars(
            &[("SNOWMELT_TEST_MISS1", None), ("SNOWMELT_TEST_MISS2", None)],
            || {
                let result =
                    interpolate("a: ${SNOWMELT_TEST_MISS1}, b: ${SNOWMELT_TEST_MISS2}");
                assert!(!result.is_ok());
                assert_eq!(result.errors.len(), 2);
            },
        );
    }

    #[test]
    fn test_default_value_unset() {
        with_env_vars(&[("SNOWMELT_TEST_UNSET", None)], || {
            let result = interpolate("value: ${SNOWMELT_TEST_UNSET:-default}");
            assert!(result.is_ok());
            assert_eq!(result.text, "value: default");
        });
    }

    #[test]
    fn test_default_value_empty() {
        with_env_vars(&[("SNOWMELT_TEST_EMPTY", Some(""))], || {
            let result = interpolate("value: ${SNOWMELT_TEST_EMPTY:-default}");
            assert!(result.is_ok());
            assert_eq!(result.text, "value: default");
        });
    }

    #[test]
    fn test_newline_injection_blocked() {
        with_env_vars(&[("SNOWMELT_TEST_INJECT", Some("line1\nline2"))], || {
            let result = interpolate("value: ${SNOWMELT_TEST_INJECT}");
            assert!(!result.is_ok());
            assert!(result.errors[0].contains("newlines"));
        });
    }

    #[test]
    fn test_credentials_yaml_example() {
        with_env_vars(
            &[
                ("SNOWMELT_TEST_AWS_KEY", Some("AKIA123")),
                ("SNOWMELT_TEST_AWS_SECRET", Some("secret")),
                ("SNOWMELT_TEST_AWS_REGION", None),
            ],
            || {
                let yaml = r#"
input:
  path: "s3://bucket/raw"
  storage_options:
    aws_access_key_id: ${SNOWMELT_TEST_AWS_KEY}
    aws_secret_access_key: ${SNOWMELT_TEST_AWS_SECRET}
    aws_region: ${SNOWMELT_TEST_AWS_REGION:-us-east-1}
"#;
                let result = interpolate(yaml);
                assert!(result.is_ok());
                assert!(result.text.contains("aws_access_key_id: AKIA123"));
                assert!(result.text.contains("aws_secret_access_key: secret"));
                assert!(result.text.contains("aws_region: us-east-1"));
            },
        );
    }
}
