//! Subset of the docker engine's `GET /containers/{id}/json` response.

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerInspect {
    #[serde(default)]
    pub config: Option<ContainerConfig>,
    #[serde(default)]
    pub host_config: Option<HostConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerConfig {
    #[serde(default)]
    pub entrypoint: Option<Vec<String>>,
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
    /// Only reported by old engine API versions.
    #[serde(default)]
    pub cpu_shares: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostConfig {
    #[serde(default)]
    pub cpu_shares: Option<i64>,
}

impl ContainerInspect {
    /// Effective command line: the entrypoint followed by the command arguments.
    pub fn command_line(&self) -> String {
        let Some(config) = self.config.as_ref() else {
            return String::new();
        };
        let entrypoint = config.entrypoint.as_deref().unwrap_or_default().join(" ");
        match config.cmd.as_deref() {
            Some(cmd) if !cmd.is_empty() => format!("{} {}", entrypoint, cmd.join(" "))
                .trim_start()
                .to_owned(),
            _ => entrypoint,
        }
    }

    /// Configured relative CPU weight, `0` if none is set.
    pub fn cpu_shares(&self) -> i64 {
        self.host_config
            .as_ref()
            .and_then(|host| host.cpu_shares)
            .or_else(|| self.config.as_ref().and_then(|config| config.cpu_shares))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_inspect_response() {
        let body = r#"{
            "Id": "abc",
            "Config": {
                "Entrypoint": ["/usr/bin/stress"],
                "Cmd": ["--cpu", "2"],
                "Image": "stress"
            },
            "HostConfig": {"CpuShares": 512, "Memory": 0}
        }"#;
        let inspect: ContainerInspect = serde_json::from_str(body).unwrap();
        assert_eq!(inspect.command_line(), "/usr/bin/stress --cpu 2");
        assert_eq!(inspect.cpu_shares(), 512);
    }

    #[test]
    fn test_command_line_without_cmd() {
        let body = r#"{"Config": {"Entrypoint": ["java", "-jar", "app.jar"], "Cmd": null}}"#;
        let inspect: ContainerInspect = serde_json::from_str(body).unwrap();
        assert_eq!(inspect.command_line(), "java -jar app.jar");
    }

    #[test]
    fn test_command_line_without_entrypoint() {
        let body = r#"{"Config": {"Entrypoint": null, "Cmd": ["sleep", "60"]}}"#;
        let inspect: ContainerInspect = serde_json::from_str(body).unwrap();
        assert_eq!(inspect.command_line(), "sleep 60");
    }

    #[test]
    fn test_cpu_shares_falls_back_to_legacy_config() {
        let body = r#"{"Config": {"CpuShares": 1024}}"#;
        let inspect: ContainerInspect = serde_json::from_str(body).unwrap();
        assert_eq!(inspect.cpu_shares(), 1024);

        let inspect = ContainerInspect::default();
        assert_eq!(inspect.cpu_shares(), 0);
        assert_eq!(inspect.command_line(), "");
    }
}
