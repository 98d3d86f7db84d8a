//! Ceremony provider backed by an external authenticator program.
//!
//! The program receives one JSON request on stdin:
//!
//! ```json
//! {"operation": "get", "options": {...}, "useAutofill": false}
//! {"operation": "create", "options": {...}, "useAutoRegister": false}
//! ```
//!
//! and prints the credential JSON (`RegistrationResponseJSON` or
//! `AuthenticationResponseJSON`) on stdout. Exit status 2, or a stderr
//! message mentioning cancellation, means the user cancelled.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use passkey_core::{
    AuthenticationResult, CeremonyFailure, CeremonyPlatform, CeremonyProvider, CreateRequest,
    CreationOptions, GetRequest, RegistrationResult, RequestOptions,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Exit status an authenticator uses to report a cancelled prompt.
pub const CANCELLED_STATUS: i32 = 2;

#[derive(Serialize)]
#[serde(tag = "operation", rename_all = "lowercase")]
enum HelperRequest<'a> {
    #[serde(rename_all = "camelCase")]
    Create {
        options: &'a CreationOptions,
        use_auto_register: bool,
    },
    #[serde(rename_all = "camelCase")]
    Get {
        options: &'a RequestOptions,
        use_autofill: bool,
    },
}

/// Runs one authenticator process per ceremony.
#[derive(Debug, Clone)]
pub struct ExternalCeremony {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalCeremony {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    #[instrument(level = "debug", skip_all, fields(program = %self.program.display()))]
    async fn run<T: DeserializeOwned>(&self, request: &HelperRequest<'_>) -> Result<T, CeremonyFailure> {
        let input = serde_json::to_vec(request).map_err(|e| {
            CeremonyFailure::platform(format!("Failed to encode authenticator request: {e}"))
        })?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    CeremonyFailure::unsupported(format!(
                        "Authenticator '{}' not found",
                        self.program.display()
                    ))
                } else {
                    CeremonyFailure::platform(format!("Failed to start authenticator: {e}"))
                }
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&input).await {
                Ok(()) => {}
                // Exited without reading the request; its status decides the outcome.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                    debug!("Authenticator closed stdin early");
                }
                Err(e) => {
                    return Err(CeremonyFailure::platform(format!(
                        "Failed to write authenticator request: {e}"
                    )))
                }
            }
        }

        let output = child.wait_with_output().await.map_err(|e| {
            CeremonyFailure::platform(format!("Authenticator did not finish: {e}"))
        })?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        debug!(status = ?output.status.code(), stdout_bytes = output.stdout.len(), "Authenticator exited");

        if !output.status.success() {
            warn!(status = ?output.status.code(), "Authenticator failed");
            return Err(classify_failure(output.status.code(), stderr));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            CeremonyFailure::platform(format!("Authenticator returned an invalid credential: {e}"))
        })
    }
}

#[async_trait]
impl CeremonyProvider for ExternalCeremony {
    async fn create_credential(
        &self,
        request: CreateRequest,
    ) -> Result<RegistrationResult, CeremonyFailure> {
        self.run(&HelperRequest::Create {
            options: &request.options,
            use_auto_register: request.use_auto_register,
        })
        .await
    }

    async fn get_credential(
        &self,
        request: GetRequest,
    ) -> Result<AuthenticationResult, CeremonyFailure> {
        self.run(&HelperRequest::Get {
            options: &request.options,
            use_autofill: request.use_autofill,
        })
        .await
    }

    fn platform(&self) -> CeremonyPlatform {
        CeremonyPlatform::Native
    }
}

fn classify_failure(status: Option<i32>, stderr: String) -> CeremonyFailure {
    if status == Some(CANCELLED_STATUS) || stderr.to_lowercase().contains("cancel") {
        CeremonyFailure::cancelled(stderr)
    } else {
        CeremonyFailure::platform(stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use passkey_core::{Base64UrlBytes, FailureKind};

    fn get_request() -> GetRequest {
        GetRequest {
            options: RequestOptions {
                challenge: Base64UrlBytes::new(b"challenge".to_vec()),
                timeout: None,
                rp_id: Some("localhost".into()),
                allow_credentials: None,
                user_verification: None,
                extensions: None,
            },
            use_autofill: true,
        }
    }

    fn shell(script: &str) -> ExternalCeremony {
        ExternalCeremony::new("sh").with_args(["-c", script])
    }

    #[test]
    fn test_builder_keeps_program_and_args() {
        let ceremony = ExternalCeremony::new("/usr/local/bin/fido-helper")
            .with_args(["--device", "usb"]);
        assert_eq!(ceremony.program(), Path::new("/usr/local/bin/fido-helper"));
        assert_eq!(ceremony.args, vec!["--device", "usb"]);
        assert_eq!(ceremony.platform(), CeremonyPlatform::Native);
    }

    #[test]
    fn test_request_wire_shape() {
        let request = get_request();
        let value = serde_json::to_value(HelperRequest::Get {
            options: &request.options,
            use_autofill: true,
        })
        .unwrap();

        assert_eq!(value["operation"], "get");
        assert_eq!(value["useAutofill"], true);
        assert_eq!(value["options"]["challenge"], "Y2hhbGxlbmdl");
    }

    #[test]
    fn test_classify_failure() {
        assert_eq!(classify_failure(Some(2), String::new()).kind, FailureKind::Cancelled);
        assert_eq!(
            classify_failure(Some(1), "User Cancelled the prompt".into()).kind,
            FailureKind::Cancelled
        );
        let other = classify_failure(Some(1), "no authenticator attached".into());
        assert_eq!(other.kind, FailureKind::Platform);
        assert_eq!(other.message.as_deref(), Some("no authenticator attached"));
    }

    #[tokio::test]
    async fn test_missing_program_is_unsupported() {
        let ceremony = ExternalCeremony::new("/nonexistent/passkey-authenticator");
        let failure = ceremony.get_credential(get_request()).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Unsupported);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancelled_exit_status() {
        let failure = shell("cat > /dev/null; exit 2")
            .get_credential(get_request())
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Cancelled);
        assert_eq!(failure.message, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancelled_without_reading_request() {
        let mut request = get_request();
        // Larger than a pipe buffer so the write hits a closed pipe.
        request.options.extensions = Some(serde_json::json!({ "padding": "x".repeat(1 << 20) }));

        let failure = shell("exit 2").get_credential(request).await.unwrap_err();
        assert_eq!(failure.kind, FailureKind::Cancelled);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_assertion_read_from_stdout() {
        let script = r#"cat > /dev/null; printf '%s' '{"id":"Y3JlZA","rawId":"Y3JlZA","type":"public-key","response":{"clientDataJSON":"e30","authenticatorData":"YXV0aA","signature":"c2ln"}}'"#;
        let assertion = shell(script).get_credential(get_request()).await.unwrap();

        assert!(assertion.has_consistent_id());
        assert_eq!(assertion.raw_id.as_bytes(), b"cred");
        assert_eq!(assertion.response.signature.as_bytes(), b"sig");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_garbage_output_is_platform_failure() {
        let failure = shell("cat > /dev/null; echo not-json")
            .get_credential(get_request())
            .await
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Platform);
    }
}
