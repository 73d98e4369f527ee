use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ARG_LOG_FORMAT: &str = "log-format";

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        if let Ok(parsed) = level.parse::<u8>() {
            // Successfully parsed as a number
            if parsed <= 5 {
                return Ok(parsed);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_VERBOSITY)
                .short('v')
                .long("verbose")
                .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
                .env("ACCOUNTS_LOG_LEVEL")
                .global(true)
                .action(clap::ArgAction::Count)
                .value_parser(validator_log_level()),
        )
        .arg(
            Arg::new(ARG_LOG_FORMAT)
                .long(ARG_LOG_FORMAT)
                .help("Log output format")
                .env("ACCOUNTS_LOG_FORMAT")
                .value_parser(["pretty", "json"])
                .default_value("pretty"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_rejects_unknown_values() {
        temp_env::with_vars([("ACCOUNTS_LOG_FORMAT", None::<&str>)], || {
            let command = with_args(Command::new("accounts"));
            let result = command.try_get_matches_from(vec!["accounts", "--log-format", "xml"]);
            assert_eq!(
                result.map_err(|e| e.kind()).map(|_| ()),
                Err(clap::error::ErrorKind::InvalidValue)
            );
        });
    }

    #[test]
    fn log_format_defaults_to_pretty() {
        temp_env::with_vars([("ACCOUNTS_LOG_FORMAT", None::<&str>)], || {
            let matches = with_args(Command::new("accounts")).get_matches_from(vec!["accounts"]);
            assert_eq!(
                matches.get_one::<String>(ARG_LOG_FORMAT).map(String::as_str),
                Some("pretty")
            );
        });
    }
}
