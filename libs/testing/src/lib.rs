//! Test doubles for snapvm.
//!
//! [`ScriptedRunner`] is an in-memory [`CommandRunner`] that answers commands
//! from a list of rules and records every call, so lifecycle code can be
//! exercised without a provisioning host.
//!
//! ```ignore
//! let runner = ScriptedRunner::new();
//! runner.on("snap-guest", exit(1, "no base image"));
//! let vm = VirtualMachine::builder(runner.clone()).build(&settings)?;
//! assert!(vm.create().is_err());
//! assert_eq!(runner.count("snap-guest"), 1);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use snapvm_remote::{CommandResult, CommandRunner, ExecError};

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub host: String,
    pub command: String,
}

#[derive(Debug, Clone)]
enum Response {
    Result(CommandResult),
    Connection(String),
    Terminated,
}

#[derive(Debug, Clone)]
struct Rule {
    host: Option<String>,
    prefix: String,
    response: Response,
    once: bool,
}

impl Rule {
    fn matches(&self, host: &str, command: &str) -> bool {
        command.starts_with(&self.prefix) && self.host.as_deref().map_or(true, |h| h == host)
    }
}

#[derive(Debug, Default)]
struct Inner {
    rules: Vec<Rule>,
    calls: Vec<Call>,
}

/// Scripted command runner.
///
/// Rules match on command prefix (and optionally host). The most recently
/// added matching rule wins; commands with no matching rule succeed with
/// empty output. Clones share rules and the call log.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    inner: Arc<Mutex<Inner>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, rule: Rule) -> &Self {
        self.lock().rules.push(rule);
        self
    }

    /// Answer commands starting with `prefix` on any host.
    pub fn on(&self, prefix: &str, result: CommandResult) -> &Self {
        self.push(Rule {
            host: None,
            prefix: prefix.to_string(),
            response: Response::Result(result),
            once: false,
        })
    }

    /// Answer commands starting with `prefix` on `host` only.
    pub fn on_host(&self, host: &str, prefix: &str, result: CommandResult) -> &Self {
        self.push(Rule {
            host: Some(host.to_string()),
            prefix: prefix.to_string(),
            response: Response::Result(result),
            once: false,
        })
    }

    /// Answer the next matching command only.
    pub fn once(&self, prefix: &str, result: CommandResult) -> &Self {
        self.push(Rule {
            host: None,
            prefix: prefix.to_string(),
            response: Response::Result(result),
            once: true,
        })
    }

    /// Fail matching commands at the transport level.
    pub fn fail_connection(&self, prefix: &str, stderr: &str) -> &Self {
        self.push(Rule {
            host: None,
            prefix: prefix.to_string(),
            response: Response::Connection(stderr.to_string()),
            once: false,
        })
    }

    /// Kill the client of matching commands before it reports an exit status,
    /// as a signal would.
    pub fn terminate(&self, prefix: &str) -> &Self {
        self.push(Rule {
            host: None,
            prefix: prefix.to_string(),
            response: Response::Terminated,
            once: false,
        })
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Commands of every call so far, in order.
    pub fn commands(&self) -> Vec<String> {
        self.lock().calls.iter().map(|c| c.command.clone()).collect()
    }

    /// Number of calls whose command starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| c.command.starts_with(prefix))
            .count()
    }

    /// Whether any command was run at all.
    pub fn is_untouched(&self) -> bool {
        self.lock().calls.is_empty()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, host: &str, command: &str) -> Result<CommandResult, ExecError> {
        let mut inner = self.lock();
        inner.calls.push(Call {
            host: host.to_string(),
            command: command.to_string(),
        });

        let Some(index) = inner.rules.iter().rposition(|r| r.matches(host, command)) else {
            return Ok(ok(&[]));
        };
        let rule = if inner.rules[index].once {
            inner.rules.remove(index)
        } else {
            inner.rules[index].clone()
        };

        match rule.response {
            Response::Result(result) => Ok(result),
            Response::Connection(stderr) => Err(ExecError::Connection {
                host: host.to_string(),
                stderr,
            }),
            Response::Terminated => Err(ExecError::Terminated {
                host: host.to_string(),
            }),
        }
    }
}

/// Successful result with the given stdout lines.
pub fn ok(lines: &[&str]) -> CommandResult {
    CommandResult {
        return_code: 0,
        stdout: lines.iter().map(|l| l.to_string()).collect(),
        stderr: String::new(),
    }
}

/// Failed result with the given exit code and stderr.
pub fn exit(code: i32, stderr: &str) -> CommandResult {
    CommandResult {
        return_code: code,
        stdout: Vec::new(),
        stderr: stderr.to_string(),
    }
}

/// Output of a successful `ping -c 1 <name>.local`.
pub fn ping_reply(name: &str, ip: &str) -> CommandResult {
    ok(&[
        &format!("PING {name}.local ({ip}) 56(84) bytes of data."),
        &format!("64 bytes from {name}.local ({ip}): icmp_seq=1 ttl=64 time=0.311 ms"),
        "",
        &format!("--- {name}.local ping statistics ---"),
        "1 packets transmitted, 1 received, 0% packet loss, time 0ms",
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_success() {
        let runner = ScriptedRunner::new();
        let result = runner.run("host", "anything").unwrap();
        assert!(result.success());
        assert_eq!(runner.commands(), vec!["anything"]);
    }

    #[test]
    fn test_latest_rule_wins() {
        let runner = ScriptedRunner::new();
        runner.on("rpm -q", ok(&[])).on("rpm -q", exit(1, "not installed"));
        assert_eq!(runner.run("h", "rpm -q foo").unwrap().return_code, 1);
    }

    #[test]
    fn test_once_is_consumed() {
        let runner = ScriptedRunner::new();
        runner.once("ping", exit(2, ""));
        assert_eq!(runner.run("h", "ping -c 1 x").unwrap().return_code, 2);
        assert_eq!(runner.run("h", "ping -c 1 x").unwrap().return_code, 0);
        assert_eq!(runner.count("ping"), 2);
    }

    #[test]
    fn test_host_scoped_rule() {
        let runner = ScriptedRunner::new();
        runner.on_host("a", "echo", exit(9, ""));
        assert_eq!(runner.run("a", "echo").unwrap().return_code, 9);
        assert_eq!(runner.run("b", "echo").unwrap().return_code, 0);
    }

    #[test]
    fn test_connection_failure() {
        let runner = ScriptedRunner::new();
        runner.fail_connection("", "No route to host");
        let err = runner.run("h", "true").unwrap_err();
        assert!(err.is_connection_error());
    }

    #[test]
    fn test_terminated_client() {
        let runner = ScriptedRunner::new();
        runner.terminate("snap-guest");
        let err = runner.run("h", "snap-guest -b x").unwrap_err();
        assert!(matches!(err, ExecError::Terminated { ref host } if host == "h"));
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_clones_share_log() {
        let runner = ScriptedRunner::new();
        let clone = runner.clone();
        clone.run("h", "one").unwrap();
        assert_eq!(runner.calls().len(), 1);
        assert!(!runner.is_untouched());
    }

    #[test]
    fn test_ping_reply_shape() {
        let reply = ping_reply("guest-x", "192.168.100.7");
        assert!(reply.stdout[0].contains("(192.168.100.7)"));
    }
}
