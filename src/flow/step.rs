use serde::{Deserialize, Serialize};

/// Named points in the login and signup ceremonies, plus the two
/// terminals. The set is closed: steps and their successors are fixed at
/// compile time and never extended at runtime.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowStep {
    Done,
    Error,
    Login,
    LoginAuthenticateRequestOtpViaEmail,
    LoginAuthenticateRequestOtpViaSms,
    LoginAuthenticateWithOtp,
    LoginAuthenticateWithPassword,
    LoginAuthenticateWithTotp,
    Signup,
    SignupAuthenticateRequestOtpViaEmail,
    SignupAuthenticateRequestOtpViaSms,
    SignupAuthenticateWithOtp,
    SignupAuthenticateWithPassword,
    SignupAuthenticateRequestTotp,
    SignupAuthenticateWithTotp,
}

impl FlowStep {
    pub const ALL: [FlowStep; 15] = [
        FlowStep::Done,
        FlowStep::Error,
        FlowStep::Login,
        FlowStep::LoginAuthenticateRequestOtpViaEmail,
        FlowStep::LoginAuthenticateRequestOtpViaSms,
        FlowStep::LoginAuthenticateWithOtp,
        FlowStep::LoginAuthenticateWithPassword,
        FlowStep::LoginAuthenticateWithTotp,
        FlowStep::Signup,
        FlowStep::SignupAuthenticateRequestOtpViaEmail,
        FlowStep::SignupAuthenticateRequestOtpViaSms,
        FlowStep::SignupAuthenticateWithOtp,
        FlowStep::SignupAuthenticateWithPassword,
        FlowStep::SignupAuthenticateRequestTotp,
        FlowStep::SignupAuthenticateWithTotp,
    ];

    /// Legal successor steps. Every set includes the terminals, so any
    /// unrecognized server answer can settle into `Error` and a finishing
    /// answer into `Done`.
    #[must_use]
    pub fn targets(self) -> &'static [FlowStep] {
        use FlowStep::{
            Done, Error, Login, LoginAuthenticateRequestOtpViaEmail,
            LoginAuthenticateRequestOtpViaSms, LoginAuthenticateWithOtp,
            LoginAuthenticateWithPassword, LoginAuthenticateWithTotp, Signup,
            SignupAuthenticateRequestOtpViaEmail, SignupAuthenticateRequestOtpViaSms,
            SignupAuthenticateRequestTotp, SignupAuthenticateWithOtp,
            SignupAuthenticateWithPassword, SignupAuthenticateWithTotp,
        };

        match self {
            Done | Error | LoginAuthenticateWithTotp | SignupAuthenticateWithTotp => {
                &[Done, Error]
            }
            Login => &[
                LoginAuthenticateRequestOtpViaEmail,
                LoginAuthenticateRequestOtpViaSms,
                LoginAuthenticateWithPassword,
                Done,
                Error,
            ],
            LoginAuthenticateRequestOtpViaEmail | LoginAuthenticateRequestOtpViaSms => {
                &[LoginAuthenticateWithOtp, Done, Error]
            }
            LoginAuthenticateWithOtp => &[
                LoginAuthenticateWithOtp,
                LoginAuthenticateWithTotp,
                Done,
                Error,
            ],
            LoginAuthenticateWithPassword => &[LoginAuthenticateWithTotp, Done, Error],
            Signup => &[
                SignupAuthenticateRequestOtpViaEmail,
                SignupAuthenticateRequestOtpViaSms,
                SignupAuthenticateWithPassword,
                Done,
                Error,
            ],
            SignupAuthenticateRequestOtpViaEmail | SignupAuthenticateRequestOtpViaSms => {
                &[SignupAuthenticateWithOtp, Done, Error]
            }
            SignupAuthenticateWithOtp => &[
                SignupAuthenticateWithOtp,
                SignupAuthenticateRequestTotp,
                Done,
                Error,
            ],
            SignupAuthenticateWithPassword => &[SignupAuthenticateRequestTotp, Done, Error],
            SignupAuthenticateRequestTotp => &[SignupAuthenticateWithTotp, Done, Error],
        }
    }

    /// Whether the ceremony stops here.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::FlowStep;

    #[test]
    fn every_step_keeps_terminals_reachable() {
        for step in FlowStep::ALL {
            let targets = step.targets();
            assert!(!targets.is_empty(), "{step:?} has no targets");
            assert!(
                targets.contains(&FlowStep::Done),
                "{step:?} cannot reach Done"
            );
            assert!(
                targets.contains(&FlowStep::Error),
                "{step:?} cannot reach Error"
            );
        }
    }

    #[test]
    fn targets_stay_within_the_step_set() {
        for step in FlowStep::ALL {
            for target in step.targets() {
                assert!(FlowStep::ALL.contains(target));
            }
        }
    }

    #[test]
    fn terminals_only_target_terminals() {
        assert_eq!(FlowStep::Done.targets(), &[FlowStep::Done, FlowStep::Error]);
        assert_eq!(
            FlowStep::Error.targets(),
            &[FlowStep::Done, FlowStep::Error]
        );
        assert!(FlowStep::Done.is_terminal());
        assert!(FlowStep::Error.is_terminal());
        assert!(!FlowStep::Login.is_terminal());
    }

    #[test]
    fn otp_challenge_steps_may_repeat() {
        assert!(FlowStep::LoginAuthenticateWithOtp
            .targets()
            .contains(&FlowStep::LoginAuthenticateWithOtp));
        assert!(FlowStep::SignupAuthenticateWithOtp
            .targets()
            .contains(&FlowStep::SignupAuthenticateWithOtp));
    }
}
