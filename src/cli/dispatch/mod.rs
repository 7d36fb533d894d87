use crate::cli::actions::{flow, Action};
use crate::cli::commands::{ARG_ENDPOINT, ARG_FLOW, ARG_REDIRECT};
use crate::flow::FlowKind;
use anyhow::{Context, Result};

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let endpoint = matches
        .get_one::<String>(ARG_ENDPOINT)
        .cloned()
        .context("missing required argument: --endpoint")?;
    let kind = matches
        .get_one::<FlowKind>(ARG_FLOW)
        .copied()
        .unwrap_or(FlowKind::Login);
    let redirect = matches
        .get_one::<String>(ARG_REDIRECT)
        .cloned()
        .unwrap_or_else(|| "/done".to_string());

    Ok(Action::Flow(flow::Args {
        endpoint,
        kind,
        redirect,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::commands;

    #[test]
    fn handler_builds_flow_action() {
        temp_env::with_vars([("ENSALUTO_REDIRECT", None::<&str>)], || {
            let matches = commands::new().get_matches_from(vec![
                "ensaluto",
                "--endpoint",
                "https://auth.example.com",
                "--flow",
                "signup",
            ]);

            let action = handler(&matches).expect("action");
            let Action::Flow(args) = action;
            assert_eq!(args.endpoint, "https://auth.example.com");
            assert_eq!(args.kind, FlowKind::Signup);
            assert_eq!(args.redirect, "/done");
        });
    }
}
