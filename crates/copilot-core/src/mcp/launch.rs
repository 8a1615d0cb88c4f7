//! Launch-spec inference for tool-provider processes
//!
//! Host configuration hands us anything from a bare command to a server
//! file path to an `npx` package spec; this module normalizes all of them
//! into a `(command, args)` pair.

use std::path::Path;

use super::error::{McpError, McpResult};

/// A normalized subprocess launch specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Program to execute
    pub command: String,
    /// Arguments, in order
    pub args: Vec<String>,
}

impl LaunchSpec {
    /// Create a spec directly
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Normalize a configured command plus extra arguments
    ///
    /// Commands containing a path separator go through file-based detection
    /// (`detect`); commands with embedded whitespace are split into program
    /// and leading arguments. Extra arguments are appended in both cases.
    pub fn resolve(command: &str, extra_args: &[String]) -> McpResult<Self> {
        let command = command.trim();
        if command.is_empty() {
            return Err(McpError::Config("MCP command is empty".to_string()));
        }

        if command.contains('/') || command.contains('\\') {
            let mut spec = Self::detect(command)?;
            spec.args.extend(extra_args.iter().cloned());
            return Ok(spec);
        }

        let mut parts = command.split_whitespace();
        let program = parts.next().unwrap_or(command).to_string();
        let mut args: Vec<String> = parts.map(str::to_string).collect();
        args.extend(extra_args.iter().cloned());

        Ok(Self::new(program, args))
    }

    /// Infer a launch command from a server path or package spec
    ///
    /// - `npx ...` specs run through the package runner as-is
    /// - scoped package names (`@scope/name`) run through `npx -y`
    /// - `.py` files run under the Python interpreter
    /// - `.js`/`.mjs` files run under node
    /// - `.jar` files run under `java -jar`
    /// - directories containing a `package.json` run via `npm start`
    /// - anything else is treated as directly executable
    ///
    /// Path-like specs that do not exist on disk fail with `McpError::Config`.
    pub fn detect(server_spec: &str) -> McpResult<Self> {
        let spec = server_spec.trim();

        if let Some(rest) = spec.strip_prefix("npx ") {
            let args = rest.split_whitespace().map(str::to_string).collect();
            return Ok(Self::new("npx", args));
        }

        // Scoped package name, e.g. @modelcontextprotocol/server-filesystem
        if spec.starts_with('@') && !Path::new(spec).exists() {
            return Ok(Self::new(
                "npx",
                vec!["-y".to_string(), spec.to_string()],
            ));
        }

        let path = Path::new(spec);
        if !path.exists() {
            return Err(McpError::Config(format!(
                "Server file does not exist: {}",
                spec
            )));
        }

        if path.is_dir() {
            if path.join("package.json").exists() {
                return Ok(Self::new(
                    "npm",
                    vec![
                        "start".to_string(),
                        "--prefix".to_string(),
                        spec.to_string(),
                    ],
                ));
            }
            return Err(McpError::Config(format!(
                "Directory has no package manifest: {}",
                spec
            )));
        }

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        let launch = match extension.as_deref() {
            Some("py") => Self::new("python3", vec![spec.to_string()]),
            Some("js") | Some("mjs") => Self::new("node", vec![spec.to_string()]),
            Some("jar") => Self::new("java", vec!["-jar".to_string(), spec.to_string()]),
            _ => Self::new(spec, Vec::new()),
        };

        Ok(launch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_splits_embedded_arguments() {
        let spec = LaunchSpec::resolve("echo hi", &[]).unwrap();
        assert_eq!(spec.command, "echo");
        assert_eq!(spec.args, vec!["hi"]);
    }

    #[test]
    fn test_resolve_appends_extra_arguments() {
        let spec =
            LaunchSpec::resolve("npx -y server", &["--port".to_string(), "3000".to_string()])
                .unwrap();
        assert_eq!(spec.command, "npx");
        assert_eq!(spec.args, vec!["-y", "server", "--port", "3000"]);
    }

    #[test]
    fn test_resolve_rejects_empty_command() {
        assert!(matches!(
            LaunchSpec::resolve("  ", &[]),
            Err(McpError::Config(_))
        ));
    }

    #[test]
    fn test_detect_npx_spec() {
        let spec = LaunchSpec::detect("npx @modelcontextprotocol/server-filesystem /tmp").unwrap();
        assert_eq!(spec.command, "npx");
        assert_eq!(
            spec.args,
            vec!["@modelcontextprotocol/server-filesystem", "/tmp"]
        );
    }

    #[test]
    fn test_scoped_package_runs_through_npx() {
        let spec = LaunchSpec::resolve("@modelcontextprotocol/server-memory", &[]).unwrap();
        assert_eq!(spec.command, "npx");
        assert_eq!(spec.args, vec!["-y", "@modelcontextprotocol/server-memory"]);
    }

    #[test]
    fn test_detect_python_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.py");
        std::fs::write(&path, "# server").unwrap();

        let spec = LaunchSpec::detect(path.to_str().unwrap()).unwrap();
        assert_eq!(spec.command, "python3");
        assert_eq!(spec.args, vec![path.to_str().unwrap()]);
    }

    #[test]
    fn test_detect_node_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.js");
        std::fs::write(&path, "// server").unwrap();

        let spec = LaunchSpec::detect(path.to_str().unwrap()).unwrap();
        assert_eq!(spec.command, "node");
    }

    #[test]
    fn test_detect_jar_server() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("server.jar");
        std::fs::write(&path, b"PK").unwrap();

        let spec = LaunchSpec::detect(path.to_str().unwrap()).unwrap();
        assert_eq!(spec.command, "java");
        assert_eq!(spec.args[0], "-jar");
    }

    #[test]
    fn test_detect_missing_path() {
        let result = LaunchSpec::detect("/definitely/not/here/server.py");
        assert!(matches!(result, Err(McpError::Config(_))));
    }

    #[test]
    fn test_detect_package_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{}").unwrap();

        let spec = LaunchSpec::detect(dir.path().to_str().unwrap()).unwrap();
        assert_eq!(spec.command, "npm");
        assert_eq!(spec.args[0], "start");
    }

    #[test]
    fn test_resolve_path_goes_through_detection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tools.py");
        std::fs::write(&path, "# tools").unwrap();

        let spec = LaunchSpec::resolve(path.to_str().unwrap(), &["--x".to_string()]).unwrap();
        assert_eq!(spec.command, "python3");
        assert_eq!(spec.args.last().map(String::as_str), Some("--x"));
    }
}
