pub mod logging;

use clap::{
    builder::{
        styling::{AnsiColor, Effects, Styles},
        ValueParser,
    },
    Arg, ColorChoice, Command,
};

use crate::flow::FlowKind;

pub const ARG_ENDPOINT: &str = "endpoint";
pub const ARG_FLOW: &str = "flow";
pub const ARG_REDIRECT: &str = "redirect";

#[must_use]
pub fn validator_flow_kind() -> ValueParser {
    ValueParser::from(
        move |kind: &str| -> std::result::Result<FlowKind, String> {
            match kind.to_lowercase().as_str() {
                "login" => Ok(FlowKind::Login),
                "signup" => Ok(FlowKind::Signup),
                _ => Err("invalid flow kind, expected login or signup".to_string()),
            }
        },
    )
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

    let command = Command::new("ensaluto")
        .about("Authentication flow client")
        .version(env!("CARGO_PKG_VERSION"))
        .long_version(long_version)
        .color(ColorChoice::Auto)
        .styles(styles)
        .arg(
            Arg::new(ARG_ENDPOINT)
                .short('e')
                .long("endpoint")
                .help("Identity service base URL, example: https://auth.example.com")
                .env("ENSALUTO_ENDPOINT")
                .required(true),
        )
        .arg(
            Arg::new(ARG_FLOW)
                .short('f')
                .long("flow")
                .help("Ceremony to run: login or signup")
                .default_value("login")
                .env("ENSALUTO_FLOW")
                .value_parser(validator_flow_kind()),
        )
        .arg(
            Arg::new(ARG_REDIRECT)
                .short('r')
                .long("redirect")
                .help("Fallback destination shown when the service does not provide one")
                .default_value("/done")
                .env("ENSALUTO_REDIRECT"),
        );

    logging::with_args(command)
}
