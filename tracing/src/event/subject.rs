use crate::errors::{Error, Result};
use std::fmt;

/// Identity of one logged invocation: a function name and its sample id.
///
/// On a log line the two are concatenated with no separator, the sample id
/// being the maximal trailing run of digits (`do_stuff12` is run 12 of `do_stuff`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subject {
    pub function_name: String,
    pub sample_id: u32,
}

impl Subject {
    pub fn new(function_name: impl Into<String>, sample_id: u32) -> Self {
        Self {
            function_name: function_name.into(),
            sample_id,
        }
    }

    /// Fails on names that would not read back from a log line
    pub fn check_function_name(function_name: &str) -> Result<()> {
        let invalid = |reason: &str| {
            Err(Error::InvalidName {
                name: function_name.to_owned(),
                reason: reason.to_owned(),
            })
        };
        if function_name.is_empty() {
            return invalid("empty function name");
        }
        if function_name.ends_with(|c: char| c.is_ascii_digit()) {
            return invalid("function name ends with a digit");
        }
        if function_name.contains(char::is_whitespace) {
            return invalid("function name contains whitespace");
        }
        Ok(())
    }

    pub fn parse(token: &str) -> Result<Self> {
        let name_len = token.trim_end_matches(|c: char| c.is_ascii_digit()).len();
        let (function_name, digits) = token.split_at(name_len);
        if function_name.is_empty() || digits.is_empty() {
            return Err(Error::MalformedSubject(token.to_owned()));
        }
        let sample_id = digits
            .parse::<u32>()
            .map_err(|_| Error::MalformedSubject(token.to_owned()))?;
        Ok(Self::new(function_name, sample_id))
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.function_name, self.sample_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subject() {
        let subject = Subject::parse("do_stuff12").unwrap();
        assert_eq!(subject.function_name, "do_stuff");
        assert_eq!(subject.sample_id, 12);
        assert_eq!(subject.to_string(), "do_stuff12");
    }

    #[test]
    fn test_digits_inside_name() {
        let subject = Subject::parse("sha256_round7").unwrap();
        assert_eq!(subject.function_name, "sha256_round");
        assert_eq!(subject.sample_id, 7);
    }

    #[test]
    fn test_function_names() {
        assert!(Subject::check_function_name("sha256_round").is_ok());
        for name in ["", "sha256", "say hello", "tab\tname"] {
            assert!(
                matches!(
                    Subject::check_function_name(name),
                    Err(Error::InvalidName { .. })
                ),
                "{name:?}"
            );
        }
    }

    #[test]
    fn test_malformed_subjects() {
        assert!(Subject::parse("Greet").is_err());
        assert!(Subject::parse("42").is_err());
        assert!(Subject::parse("f99999999999").is_err());
    }
}
