pub mod check_alerts;
pub mod cleanup;
pub mod optimize;

use std::fmt;
use std::str::FromStr;

/// A maintenance job selected by the first command-line argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    CheckAlerts,
    Cleanup,
    Optimize,
}

impl Job {
    pub fn as_str(&self) -> &'static str {
        match self {
            Job::CheckAlerts => "check-alerts",
            Job::Cleanup => "cleanup",
            Job::Optimize => "optimize",
        }
    }

    /// Pick the job from process arguments, program name excluded.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> anyhow::Result<Self> {
        let mut args = args.into_iter();
        let Some(name) = args.next() else {
            anyhow::bail!("usage: garden-maintenance <check-alerts|cleanup|optimize>");
        };
        if let Some(extra) = args.next() {
            anyhow::bail!("unexpected argument '{extra}'");
        }
        name.parse()
    }
}

impl FromStr for Job {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check-alerts" => Ok(Job::CheckAlerts),
            "cleanup" => Ok(Job::Cleanup),
            "optimize" => Ok(Job::Optimize),
            other => anyhow::bail!("unknown job '{other}', expected check-alerts, cleanup or optimize"),
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_each_job_name() {
        for job in [Job::CheckAlerts, Job::Cleanup, Job::Optimize] {
            assert_eq!(Job::from_args(args(&[job.as_str()])).unwrap(), job);
        }
    }

    #[test]
    fn rejects_missing_unknown_and_extra_arguments() {
        assert!(Job::from_args(args(&[])).is_err());
        assert!(Job::from_args(args(&["vacuum"])).is_err());
        assert!(Job::from_args(args(&["cleanup", "--now"])).is_err());
    }
}
