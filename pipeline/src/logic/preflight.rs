use ship_defs::Deployer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightCheck {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

/// Platform CLI installed, then operator logged in. The second is skipped when the first fails.
pub async fn run_preflight(deployer: &dyn Deployer) -> Vec<PreflightCheck> {
    let mut checks = vec![];
    match deployer.version().await {
        Ok(version) => checks.push(PreflightCheck {
            name: "CLI installed",
            passed: true,
            detail: version,
        }),
        Err(e) => {
            checks.push(PreflightCheck {
                name: "CLI installed",
                passed: false,
                detail: e.to_string(),
            });
            return checks;
        }
    }
    checks.push(match deployer.whoami().await {
        Ok(who) => PreflightCheck {
            name: "Logged in",
            passed: true,
            detail: who,
        },
        Err(e) => PreflightCheck {
            name: "Logged in",
            passed: false,
            detail: format!("{} (run `railway login`)", e),
        },
    });
    checks
}
