pub mod logging;

use clap::{
    Arg, ColorChoice, Command,
    builder::{
        ValueParser,
        styling::{AnsiColor, Effects, Styles},
    },
};
use std::path::PathBuf;

use crate::api::ErrorDetailPolicy;

pub const ARG_PORT: &str = "port";
pub const ARG_DSN: &str = "dsn";
pub const ARG_POLICY: &str = "policy";
pub const ARG_ERROR_DETAIL: &str = "error-detail";

#[must_use]
pub fn validator_error_detail() -> ValueParser {
    ValueParser::from(|value: &str| value.parse::<ErrorDetailPolicy>())
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let long_version: &'static str = Box::leak(
        format!("{} - {}", env!("CARGO_PKG_VERSION"), crate::GIT_COMMIT_HASH).into_boxed_str(),
    );

    let command = Command::new("oam-apiserver")
        .about("OAM application lifecycle API")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long("port")
                .help("Port to listen on")
                .default_value("8080")
                .env("OAM_APISERVER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string")
                .long_help(
                    "Postgres connection string. When omitted, applications are kept in memory and lost on restart.",
                )
                .env("OAM_APISERVER_DSN"),
        )
        .arg(
            Arg::new(ARG_POLICY)
                .long("policy")
                .help("Path to the JSON access policy (tokens and permissions)")
                .env("OAM_APISERVER_POLICY")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new(ARG_ERROR_DETAIL)
                .long("error-detail")
                .help("Backend detail in 5xx responses: redact or passthrough")
                .default_value("redact")
                .env("OAM_APISERVER_ERROR_DETAIL")
                .value_parser(validator_error_detail()),
        );

    logging::with_args(command)
}
