//! Branded deployment orchestration
//!
//! Composes the launch command, a bounded wait for the container to report
//! running, and the branding injection into one POSIX script. The script is
//! only generated here; running it is the node executor's job.
//!
//! A poll timeout does not abort the deployment. The script writes a warning
//! to stderr, prints [`POLL_TIMEOUT_MARKER`] on stdout and applies branding
//! anyway. [`OrchestrationOutcome::from_output`] turns the markers back into
//! a structured result.

use serde::{Deserialize, Serialize};

use super::injector::BrandingInjector;
use crate::deploy::{LaunchCommand, RUNTIME_BINARY};
use crate::models::BrandingContext;
use crate::script::{heredoc_delimiter, shell_quote, ShellScript, Step, Word};

/// Printed when the container never reported running within the poll budget
pub const POLL_TIMEOUT_MARKER: &str = "provision:poll-timeout";

/// Printed when the branding procedure exited successfully
pub const BRANDING_APPLIED_MARKER: &str = "provision:branding-applied";

/// Printed when the branding procedure failed inside the container
pub const BRANDING_FAILED_MARKER: &str = "provision:branding-failed";

/// Printed as the last line of a completed run
pub const COMPLETE_MARKER: &str = "provision:complete";

const BRANDING_HEREDOC: &str = "__PROVISION_BRANDING__";

/// Bounded retry policy for the running-state poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval_secs: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval_secs: 2,
        }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval_secs: u32) -> Self {
        Self {
            max_attempts,
            interval_secs,
        }
    }

    /// Upper bound on time spent sleeping between polls
    ///
    /// The last failed check breaks out without sleeping.
    pub fn max_wait_secs(&self) -> u64 {
        u64::from(self.attempts() - 1) * u64::from(self.interval_secs)
    }

    /// At least one check is always made
    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// How the branding procedure is delivered into the container
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BrandingMode {
    /// Full script piped to `sh -s` through a heredoc
    #[default]
    FullScript,
    /// Single command line passed to `sh -c`
    Oneliner,
}

/// Sequential phases of one branded deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentPhase {
    Start,
    LaunchIssued,
    Polling,
    BrandingApplied,
    Complete,
}

impl DeploymentPhase {
    pub const ALL: [DeploymentPhase; 5] = [
        DeploymentPhase::Start,
        DeploymentPhase::LaunchIssued,
        DeploymentPhase::Polling,
        DeploymentPhase::BrandingApplied,
        DeploymentPhase::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeploymentPhase::Start => "start",
            DeploymentPhase::LaunchIssued => "launch-issued",
            DeploymentPhase::Polling => "polling",
            DeploymentPhase::BrandingApplied => "branding-applied",
            DeploymentPhase::Complete => "complete",
        }
    }

    /// Phase that follows this one; `Complete` is final
    pub fn next(&self) -> Option<DeploymentPhase> {
        match self {
            DeploymentPhase::Start => Some(DeploymentPhase::LaunchIssued),
            DeploymentPhase::LaunchIssued => Some(DeploymentPhase::Polling),
            DeploymentPhase::Polling => Some(DeploymentPhase::BrandingApplied),
            DeploymentPhase::BrandingApplied => Some(DeploymentPhase::Complete),
            DeploymentPhase::Complete => None,
        }
    }
}

impl std::fmt::Display for DeploymentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured result recovered from the orchestration script's stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationOutcome {
    /// The container never reported running; branding ran regardless
    pub poll_timed_out: bool,
    pub branding_applied: bool,
    pub completed: bool,
}

impl OrchestrationOutcome {
    pub fn from_output(stdout: &str) -> Self {
        let mut outcome = Self::default();
        for line in stdout.lines().map(str::trim) {
            match line {
                POLL_TIMEOUT_MARKER => outcome.poll_timed_out = true,
                BRANDING_APPLIED_MARKER => outcome.branding_applied = true,
                BRANDING_FAILED_MARKER => outcome.branding_applied = false,
                COMPLETE_MARKER => outcome.completed = true,
                _ => {}
            }
        }
        outcome
    }

    /// True when the run finished but something deserves a warning
    pub fn is_degraded(&self) -> bool {
        self.poll_timed_out || !self.branding_applied
    }
}

/// Plan for one launch-poll-brand run
#[derive(Debug, Clone)]
pub struct BrandedDeployment {
    launch: LaunchCommand,
    context: BrandingContext,
    injector: BrandingInjector,
    poll: PollPolicy,
    mode: BrandingMode,
}

impl BrandedDeployment {
    pub fn new(launch: LaunchCommand, context: BrandingContext) -> Self {
        Self {
            launch,
            context,
            injector: BrandingInjector::default(),
            poll: PollPolicy::default(),
            mode: BrandingMode::default(),
        }
    }

    pub fn with_poll(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_mode(mut self, mode: BrandingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_injector(mut self, injector: BrandingInjector) -> Self {
        self.injector = injector;
        self
    }

    pub fn launch(&self) -> &LaunchCommand {
        &self.launch
    }

    pub fn context(&self) -> &BrandingContext {
        &self.context
    }

    pub fn poll(&self) -> PollPolicy {
        self.poll
    }

    pub fn mode(&self) -> BrandingMode {
        self.mode
    }

    /// The orchestration as typed steps, one comment per phase
    pub fn steps(&self) -> ShellScript {
        let mut script = ShellScript::new().exit_on_error();
        for phase in DeploymentPhase::ALL {
            script.push(Step::comment(format!("phase: {}", phase)));
            match phase {
                DeploymentPhase::Start => {
                    script.push(Step::Assign {
                        name: "NAME",
                        value: Word::lit(self.launch.container_name().as_str()),
                    });
                }
                DeploymentPhase::LaunchIssued => {
                    script.push(Step::raw(self.launch.to_shell()));
                }
                DeploymentPhase::Polling => {
                    script.push(Step::raw(self.poll_loop()));
                }
                DeploymentPhase::BrandingApplied => {
                    script.push(Step::raw(self.branding_invocation()));
                }
                DeploymentPhase::Complete => {
                    script.push(Step::run(["echo", COMPLETE_MARKER]));
                }
            }
        }
        script
    }

    pub fn script(&self) -> String {
        self.steps().render()
    }

    fn poll_loop(&self) -> String {
        let attempts = self.poll.attempts();
        [
            "attempt=0".to_string(),
            format!(
                "until [ \"$({} inspect -f '{{{{.State.Running}}}}' \"$NAME\" 2>/dev/null)\" = \"true\" ]; do",
                RUNTIME_BINARY
            ),
            "  attempt=$((attempt + 1))".to_string(),
            format!("  if [ \"$attempt\" -ge {} ]; then", attempts),
            format!(
                "    echo \"warning: $NAME not running after {} attempts, applying branding anyway\" >&2",
                attempts
            ),
            format!("    echo {}", POLL_TIMEOUT_MARKER),
            "    break".to_string(),
            "  fi".to_string(),
            format!("  sleep {}", self.poll.interval_secs),
            "done".to_string(),
        ]
        .join("\n")
    }

    fn branding_invocation(&self) -> String {
        let condition = match self.mode {
            BrandingMode::FullScript => {
                let body = self.injector.branding_script(&self.context);
                let delimiter = heredoc_delimiter(BRANDING_HEREDOC, body.lines());
                format!(
                    "if {} exec -i \"$NAME\" sh -s <<'{}'\n{}{}",
                    RUNTIME_BINARY, delimiter, body, delimiter
                )
            }
            BrandingMode::Oneliner => {
                let line = self.injector.branding_oneliner(&self.context);
                format!(
                    "if {} exec \"$NAME\" sh -c {}",
                    RUNTIME_BINARY,
                    shell_quote(&line)
                )
            }
        };
        format!(
            "{}\nthen\n  echo {}\nelse\n  echo \"warning: branding failed for $NAME\" >&2\n  echo {}\nfi",
            condition, BRANDING_APPLIED_MARKER, BRANDING_FAILED_MARKER
        )
    }
}

/// Full branded deployment script with the default profile and poll policy
pub fn generate_branded_deployment_script(
    launch: &LaunchCommand,
    context: &BrandingContext,
) -> String {
    BrandedDeployment::new(launch.clone(), context.clone()).script()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::{ContainerName, DeploymentConfig};

    fn launch() -> LaunchCommand {
        let config = DeploymentConfig::builder("pytorch/pytorch:2.1.0")
            .with_category("deep-learning")
            .with_gpu_count(1)
            .build()
            .unwrap();
        LaunchCommand::new(&config, &ContainerName::parse("pytorch-abc12345").unwrap())
    }

    fn ctx() -> BrandingContext {
        BrandingContext {
            instance_id: "inst-1".to_string(),
            region: "us-east-1".to_string(),
            plan: "RTX 4090".to_string(),
            expires_at: "2026-12-01".to_string(),
            username: "bob".to_string(),
        }
    }

    #[test]
    fn test_phases_in_order() {
        let script = generate_branded_deployment_script(&launch(), &ctx());
        let positions: Vec<usize> = DeploymentPhase::ALL
            .iter()
            .map(|p| script.find(&format!("# phase: {}\n", p)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));

        let launch_at = script.find("docker run -d --name pytorch-abc12345").unwrap();
        let poll_at = script.find("until [").unwrap();
        let brand_at = script.find("docker exec -i \"$NAME\" sh -s").unwrap();
        assert!(launch_at < poll_at && poll_at < brand_at);
    }

    #[test]
    fn test_poll_is_bounded_and_proceeds() {
        let plan = BrandedDeployment::new(launch(), ctx()).with_poll(PollPolicy::new(5, 3));
        let script = plan.script();

        assert!(script.contains("NAME=pytorch-abc12345\n"));
        assert!(script.contains("docker inspect -f '{{.State.Running}}' \"$NAME\""));
        assert!(script.contains("if [ \"$attempt\" -ge 5 ]; then"));
        assert!(script.contains("  sleep 3\n"));
        assert!(script.contains(">&2\n    echo provision:poll-timeout\n    break\n"));
        // Timeout breaks out of the loop, never exits
        assert!(!script.contains("exit 1"));
    }

    #[test]
    fn test_zero_attempts_still_checks_once() {
        let policy = PollPolicy::new(0, 2);
        let script = BrandedDeployment::new(launch(), ctx())
            .with_poll(policy)
            .script();
        assert!(script.contains("-ge 1 ]"));
        assert_eq!(policy.max_wait_secs(), 0);
        assert_eq!(PollPolicy::default().max_wait_secs(), 58);
    }

    #[test]
    fn test_max_wait_matches_loop_sleeps() {
        use std::os::unix::fs::PermissionsExt;

        let bin = tempfile::tempdir().unwrap();
        let slept = bin.path().join("slept");
        let stubs = [
            ("docker", "#!/bin/sh\necho false\n".to_string()),
            ("sleep", format!("#!/bin/sh\necho \"$1\" >> '{}'\n", slept.display())),
        ];
        for (name, body) in stubs {
            let path = bin.path().join(name);
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let policy = PollPolicy::new(4, 3);
        let plan = BrandedDeployment::new(launch(), ctx()).with_poll(policy);
        let path = format!("{}:{}", bin.path().display(), std::env::var("PATH").unwrap_or_default());
        let output = std::process::Command::new("sh")
            .arg("-c")
            .arg(format!("NAME=web-1\n{}", plan.poll_loop()))
            .env("PATH", path)
            .output()
            .unwrap();

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains(POLL_TIMEOUT_MARKER));
        let total: u64 = std::fs::read_to_string(&slept)
            .unwrap()
            .lines()
            .map(|l| l.parse::<u64>().unwrap())
            .sum();
        assert_eq!(total, policy.max_wait_secs());
        assert_eq!(total, 9);
    }

    #[test]
    fn test_full_script_embeds_branding() {
        let script = BrandedDeployment::new(launch(), ctx()).script();
        assert!(script.contains("sh -s <<'__PROVISION_BRANDING__'\n#!/bin/sh\nset -e\n"));
        assert!(script.contains("\n__PROVISION_BRANDING__\nthen\n  echo provision:branding-applied\n"));
        assert!(script.contains("echo provision:branding-failed\nfi\n"));
        assert!(script.trim_end().ends_with("echo provision:complete"));
    }

    #[test]
    fn test_oneliner_mode() {
        let script = BrandedDeployment::new(launch(), ctx())
            .with_mode(BrandingMode::Oneliner)
            .script();
        assert!(script.contains("if docker exec \"$NAME\" sh -c 'mkdir -p /etc/noderent && "));
        assert!(!script.contains("__PROVISION_BRANDING__"));
    }

    #[test]
    fn test_outcome_from_output() {
        let clean = "abc123\nprovision:branding-applied\nprovision:complete\n";
        let outcome = OrchestrationOutcome::from_output(clean);
        assert!(!outcome.poll_timed_out);
        assert!(outcome.branding_applied);
        assert!(outcome.completed);
        assert!(!outcome.is_degraded());

        let slow = "provision:poll-timeout\nprovision:branding-failed\nprovision:complete";
        let outcome = OrchestrationOutcome::from_output(slow);
        assert!(outcome.poll_timed_out);
        assert!(!outcome.branding_applied);
        assert!(outcome.completed);
        assert!(outcome.is_degraded());
    }

    #[test]
    fn test_phase_chain() {
        let mut phase = DeploymentPhase::Start;
        let mut seen = vec![phase];
        while let Some(next) = phase.next() {
            seen.push(next);
            phase = next;
        }
        assert_eq!(seen, DeploymentPhase::ALL.to_vec());
    }
}
