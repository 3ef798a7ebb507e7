//! Imperative launch command
//!
//! Renders a [`DeploymentConfig`] as a `docker run` invocation.

use serde::Serialize;

use super::config::DeploymentConfig;
use super::naming::ContainerName;
use crate::script::shell_quote;

/// Container runtime binary
pub const RUNTIME_BINARY: &str = "docker";

/// Value for `--gpus` requesting exactly `count` devices, `None` for CPU-only
pub fn gpu_request(count: u32) -> Option<String> {
    match count {
        0 => None,
        1 => Some("1".to_string()),
        n => Some(format!("count={}", n)),
    }
}

/// A `docker run` invocation for one container
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchCommand {
    container_name: ContainerName,
    /// Arguments after the runtime binary, up to and including the image
    args: Vec<String>,
    /// Entrypoint command override as separate words, appended last
    command: Vec<String>,
}

impl LaunchCommand {
    /// Build the launch command
    ///
    /// Argument order: name, GPU reservation, ports, environment, volumes,
    /// image, then the command override.
    pub fn new(config: &DeploymentConfig, name: &ContainerName) -> Self {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            name.to_string(),
        ];

        if let Some(gpus) = gpu_request(config.gpu_count()) {
            args.push("--gpus".to_string());
            args.push(gpus);
        }

        for port in config.ports() {
            args.push("-p".to_string());
            args.push(format!("{}:{}", port, port));
        }

        for (key, value) in config.environment().iter() {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        for mount in config.volumes() {
            args.push("-v".to_string());
            args.push(mount.clone());
        }

        args.push(config.image().to_string());

        Self {
            container_name: name.clone(),
            args,
            command: config.command_args().to_vec(),
        }
    }

    pub fn container_name(&self) -> &ContainerName {
        &self.container_name
    }

    /// Arguments up to and including the image
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Words of the command override
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Full argument vector for direct execution
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + self.command.len() + 1);
        argv.push(RUNTIME_BINARY.to_string());
        argv.extend(self.args.iter().cloned());
        argv.extend(self.command.iter().cloned());
        argv
    }

    /// Render as shell text; every word of [`Self::argv`] is quoted
    pub fn to_shell(&self) -> String {
        let mut line = String::from(RUNTIME_BINARY);
        for arg in self.args.iter().chain(&self.command) {
            line.push(' ');
            line.push_str(&shell_quote(arg));
        }
        line
    }
}

impl std::fmt::Display for LaunchCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_shell())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> ContainerName {
        ContainerName::parse(n).unwrap()
    }

    #[test]
    fn test_cpu_only_has_no_gpu_clause() {
        let config = DeploymentConfig::builder("nginx:1.25")
            .with_ports([80, 443])
            .build()
            .unwrap();
        let cmd = LaunchCommand::new(&config, &name("web-abc"));

        assert!(!cmd.args().contains(&"--gpus".to_string()));
        assert_eq!(
            cmd.to_shell(),
            "docker run -d --name web-abc -p 80:80 -p 443:443 nginx:1.25"
        );
    }

    #[test]
    fn test_gpu_phrasing() {
        assert_eq!(gpu_request(0), None);
        assert_eq!(gpu_request(1).as_deref(), Some("1"));
        assert_eq!(gpu_request(4).as_deref(), Some("count=4"));

        for count in 1..=8 {
            let config = DeploymentConfig::builder("cuda")
                .with_port(22)
                .with_gpu_count(count)
                .build()
                .unwrap();
            let shell = LaunchCommand::new(&config, &name("gpu-box")).to_shell();
            assert!(shell.contains("--gpus"), "missing gpu clause for {}", count);
        }
    }

    #[test]
    fn test_argument_order() {
        let config = DeploymentConfig::builder("pytorch/pytorch:2.1.0-cuda12.1")
            .with_ports([8888, 22])
            .with_gpu_count(2)
            .with_env("JUPYTER_TOKEN", "s3cret")
            .with_env("TZ", "UTC")
            .with_volume("/data:/workspace")
            .with_command("jupyter lab --ip=0.0.0.0")
            .build()
            .unwrap();
        let cmd = LaunchCommand::new(&config, &name("pytorch-u1"));

        assert_eq!(
            cmd.args(),
            &[
                "run",
                "-d",
                "--name",
                "pytorch-u1",
                "--gpus",
                "count=2",
                "-p",
                "8888:8888",
                "-p",
                "22:22",
                "-e",
                "JUPYTER_TOKEN=s3cret",
                "-e",
                "TZ=UTC",
                "-v",
                "/data:/workspace",
                "pytorch/pytorch:2.1.0-cuda12.1",
            ]
        );
        assert!(cmd
            .to_shell()
            .ends_with("pytorch/pytorch:2.1.0-cuda12.1 jupyter lab --ip=0.0.0.0"));

        let argv = cmd.argv();
        assert_eq!(argv[0], "docker");
        assert_eq!(&argv[argv.len() - 3..], &["jupyter", "lab", "--ip=0.0.0.0"]);
    }

    #[test]
    fn test_quoted_override_keeps_words() {
        let config = DeploymentConfig::builder("nginx")
            .with_port(80)
            .with_command("nginx -g 'daemon off;'")
            .build()
            .unwrap();
        let cmd = LaunchCommand::new(&config, &name("web-1"));

        let argv = cmd.argv();
        assert_eq!(&argv[argv.len() - 3..], &["nginx", "-g", "daemon off;"]);
        assert!(cmd.to_shell().ends_with("nginx nginx -g 'daemon off;'"));
    }

    #[test]
    fn test_override_is_not_expanded_on_host() {
        let config = DeploymentConfig::builder("alpine")
            .with_port(22)
            .with_command("sh -c \"echo $HOME\"")
            .build()
            .unwrap();
        let cmd = LaunchCommand::new(&config, &name("box-1"));

        assert_eq!(cmd.command(), &["sh", "-c", "echo $HOME"]);
        assert!(cmd.to_shell().ends_with("alpine sh -c 'echo $HOME'"));
    }

    #[test]
    fn test_env_values_are_quoted() {
        let config = DeploymentConfig::builder("app")
            .with_port(22)
            .with_env("GREETING", "hello world; rm -rf /")
            .build()
            .unwrap();
        let shell = LaunchCommand::new(&config, &name("app-1")).to_shell();
        assert!(shell.contains("-e 'GREETING=hello world; rm -rf /'"));
    }
}
