use super::{EventKind, Subject};
use crate::errors::{Error, Result};

/// One parsed line of an event log
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine<'a> {
    /// milliseconds since the logging side started
    pub time: i64,
    pub subject: Subject,
    pub kind: EventKind,
    pub args: Vec<&'a str>,
}

impl<'a> LogLine<'a> {
    pub fn parse(line: &'a str) -> Result<Self> {
        let mut tokens = line.split_whitespace();
        let (Some(time), Some(subject), Some(kind)) = (tokens.next(), tokens.next(), tokens.next())
        else {
            return Err(Error::MalformedLine(format!(
                "expected '<time> <subject> <kind>', got {line:?}"
            )));
        };
        let time = time
            .parse::<i64>()
            .map_err(|_| Error::MalformedLine(format!("invalid timestamp {time:?}")))?;
        let subject = Subject::parse(subject)?;
        let kind: EventKind = kind.parse()?;
        let args: Vec<&str> = tokens.collect();
        if args.len() < kind.min_args() {
            return Err(Error::MalformedLine(format!(
                "{kind} expects {} argument(s), got {}",
                kind.min_args(),
                args.len()
            )));
        }
        Ok(Self {
            time,
            subject,
            kind,
            args,
        })
    }

    /// Parses the argument at `index` as an integer
    pub fn int_arg(&self, index: usize) -> Result<i64> {
        let arg = self.args.get(index).ok_or_else(|| {
            Error::MalformedLine(format!("{} is missing argument #{index}", self.kind))
        })?;
        arg.parse::<i64>().map_err(|_| {
            Error::MalformedLine(format!("{} argument {arg:?} is not an integer", self.kind))
        })
    }
}

/// Formats a line the way the logger writes it
pub fn format_log_line(time: u64, subject: &Subject, kind: EventKind, payload: &str) -> String {
    if payload.is_empty() {
        format!("{time} {subject} {kind}")
    } else {
        format!("{time} {subject} {kind} {payload}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let line = LogLine::parse("152 do_stuff3 malloc 10").unwrap();
        assert_eq!(line.time, 152);
        assert_eq!(line.subject, Subject::new("do_stuff", 3));
        assert_eq!(line.kind, EventKind::Malloc);
        assert_eq!(line.int_arg(0).unwrap(), 10);
    }

    #[test]
    fn test_format_round_trip() {
        let subject = Subject::new("Greet", 1);
        let text = format_log_line(7, &subject, EventKind::PageFault, "3 0");
        assert_eq!(text, "7 Greet1 pagefault 3 0");
        let line = LogLine::parse(&text).unwrap();
        assert_eq!(line.args, vec!["3", "0"]);
        assert_eq!(
            format_log_line(9, &subject, EventKind::FuncEnd, ""),
            "9 Greet1 FUNC_END"
        );
    }

    #[test]
    fn test_rejects_malformed_lines() {
        assert!(LogLine::parse("").is_err());
        assert!(LogLine::parse("12 f1").is_err());
        assert!(LogLine::parse("x f1 FUNC_END").is_err());
        assert!(LogLine::parse("12 f1 RPC_end").is_err());
        assert!(LogLine::parse("12 f1 pagefault 1").is_err());
        assert!(matches!(
            LogLine::parse("12 f1 FUNC_PAUSE"),
            Err(Error::UnknownEventKind(_))
        ));
    }
}
