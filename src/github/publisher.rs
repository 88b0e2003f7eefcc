//! File publishing through the GitHub contents API.
//!
//! `PUT /repos/{owner}/{repo}/contents/{path}` creates a file and commits it
//! in one call. The request never carries a blob `sha`, so GitHub refuses to
//! overwrite an existing path: publishing only ever creates.

use std::future::Future;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::types::{Committer, ContentDigest, PublishTarget, RepoId};

use super::client::OctocrabClient;
use super::error::PublishError;

/// Commit message for every created dashboard file.
pub const COMMIT_MESSAGE: &str = "autograf added in response to namespace";

/// Base used only to percent-encode route segments; the host is discarded.
const ROUTE_BASE: &str = "http://api.invalid/";

/// A successfully created file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    /// Blob SHA of the stored content.
    pub digest: ContentDigest,
    /// SHA of the commit that added the file, when GitHub reports it.
    pub commit: Option<String>,
    /// The 2xx status GitHub answered with.
    pub status: StatusCode,
}

/// Persists one payload as a new file in a remote repository.
///
/// Implementations:
/// - `OctocrabClient`: the GitHub contents API
/// - `ScriptedPublisher` (tests): scripted results with a call journal
pub trait Publisher {
    /// Creates `target.path` on `target.branch`. Fails if the path exists.
    fn publish(
        &self,
        target: PublishTarget,
    ) -> impl Future<Output = Result<Published, PublishError>> + Send;
}

impl Publisher for OctocrabClient {
    async fn publish(&self, target: PublishTarget) -> Result<Published, PublishError> {
        create_file(self, &target).await
    }
}

#[derive(Debug, Serialize)]
struct CreateFileRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    committer: Option<&'a Committer>,
}

#[derive(Debug, Deserialize)]
struct CreateFileResponse {
    content: Option<CreatedContent>,
    commit: Option<CreatedCommit>,
}

#[derive(Debug, Deserialize)]
struct CreatedContent {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CreatedCommit {
    sha: Option<String>,
}

/// Error body GitHub sends with 4xx/5xx responses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[instrument(skip(client, target), fields(repo = %target.repo, path = %target.path))]
async fn create_file(
    client: &OctocrabClient,
    target: &PublishTarget,
) -> Result<Published, PublishError> {
    let route = contents_route(&target.repo, &target.path)?;

    let request = CreateFileRequest {
        message: COMMIT_MESSAGE,
        content: BASE64.encode(&target.content),
        branch: target.branch.as_deref(),
        committer: target.committer.as_ref(),
    };

    // The raw `_put` keeps non-2xx responses (and their headers) instead of
    // folding them into an octocrab error.
    let response = client
        .inner()
        ._put(route, Some(&request))
        .await
        .map_err(PublishError::Transport)?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = client
        .inner()
        .body_to_string(response)
        .await
        .map_err(PublishError::Transport)?;

    debug!(status = %status, "Contents API responded");

    if !status.is_success() {
        return Err(PublishError::Status {
            status,
            headers,
            message: error_message(&body),
        });
    }

    let parsed: CreateFileResponse =
        serde_json::from_str(&body).map_err(|e| PublishError::InvalidResponse {
            status,
            message: e.to_string(),
        })?;

    let digest = parsed
        .content
        .map(|content| ContentDigest::new(content.sha))
        .ok_or_else(|| PublishError::InvalidResponse {
            status,
            message: "response has no content SHA".to_string(),
        })?;

    Ok(Published {
        digest,
        commit: parsed.commit.and_then(|commit| commit.sha),
        status,
    })
}

/// Builds the percent-encoded contents route for a repository path.
pub fn contents_route(repo: &RepoId, path: &str) -> Result<String, PublishError> {
    let invalid = || PublishError::InvalidTarget {
        path: path.to_string(),
    };

    if path.is_empty() || path.split('/').any(str::is_empty) {
        return Err(invalid());
    }

    let mut url = Url::parse(ROUTE_BASE).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|()| invalid())?
        .pop_if_empty()
        .extend(["repos", repo.owner.as_str(), repo.repo.as_str(), "contents"])
        .extend(path.split('/'));

    Ok(url.path().to_string())
}

/// Pulls the human-readable message out of an error body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(message),
        }) => message,
        _ if body.trim().is_empty() => "(empty response body)".to_string(),
        _ => body.chars().take(512).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::PublishErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target(path: &str) -> PublishTarget {
        PublishTarget {
            repo: RepoId::new("acme", "dashboards"),
            branch: Some("main".to_string()),
            path: path.to_string(),
            content: b"{\"title\":\"CPU\"}".to_vec(),
            committer: Committer::from_parts("Dash Bot", "dash@example.com"),
        }
    }

    fn client_for(server: &MockServer) -> OctocrabClient {
        OctocrabClient::from_token("test-token", Some(&server.uri())).unwrap()
    }

    #[test]
    fn contents_route_encodes_segments() {
        let repo = RepoId::new("acme", "dashboards");
        assert_eq!(
            contents_route(&repo, "grafana/cpu.json").unwrap(),
            "/repos/acme/dashboards/contents/grafana/cpu.json"
        );
        assert_eq!(
            contents_route(&repo, "grafana/cpu load#1.json").unwrap(),
            "/repos/acme/dashboards/contents/grafana/cpu%20load%231.json"
        );
    }

    #[test]
    fn contents_route_rejects_empty_paths() {
        let repo = RepoId::new("acme", "dashboards");
        assert!(matches!(
            contents_route(&repo, ""),
            Err(PublishError::InvalidTarget { .. })
        ));
        assert!(matches!(
            contents_route(&repo, "a//b"),
            Err(PublishError::InvalidTarget { .. })
        ));
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"message":"Bad credentials","documentation_url":"x"}"#),
            "Bad credentials"
        );
        assert_eq!(error_message(""), "(empty response body)");
        assert_eq!(error_message("upstream timeout"), "upstream timeout");
    }

    #[test]
    fn request_omits_unset_branch_and_committer() {
        let request = CreateFileRequest {
            message: COMMIT_MESSAGE,
            content: BASE64.encode("x"),
            branch: None,
            committer: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({"message": COMMIT_MESSAGE, "content": "eA=="})
        );
    }

    #[tokio::test]
    async fn publish_creates_file_and_returns_digest() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/dashboards/contents/grafana/cpu.json"))
            .and(body_partial_json(json!({
                "message": COMMIT_MESSAGE,
                "content": BASE64.encode("{\"title\":\"CPU\"}"),
                "branch": "main",
                "committer": {"name": "Dash Bot", "email": "dash@example.com"},
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "content": {
                    "name": "cpu.json",
                    "path": "grafana/cpu.json",
                    "sha": "95b966ae1c166bd92f8ae7d1c313e738c731dfc3"
                },
                "commit": {"sha": "7638417db6d59f3c431d3e1f261cc637155684cd"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let published = client_for(&server)
            .publish(target("grafana/cpu.json"))
            .await
            .unwrap();

        assert_eq!(
            published.digest,
            ContentDigest::new("95b966ae1c166bd92f8ae7d1c313e738c731dfc3")
        );
        assert_eq!(
            published.commit.as_deref(),
            Some("7638417db6d59f3c431d3e1f261cc637155684cd")
        );
        assert_eq!(published.status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn publish_existing_path_is_conflict_with_diagnostics() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/repos/acme/dashboards/contents/grafana/cpu.json"))
            .respond_with(
                ResponseTemplate::new(409)
                    .insert_header("x-github-request-id", "C0DE:1234")
                    .set_body_json(json!({"message": "Conflict"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .publish(target("grafana/cpu.json"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), PublishErrorKind::Conflict);
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert_eq!(err.request_id(), Some("C0DE:1234"));
    }

    #[tokio::test]
    async fn publish_missing_sha_validation_is_conflict() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "message": "Invalid request.\n\n\"sha\" wasn't supplied.",
                "documentation_url": "https://docs.github.com/rest/repos/contents"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .publish(target("grafana/cpu.json"))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn publish_bad_credentials_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let err = client_for(&server)
            .publish(target("grafana/cpu.json"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), PublishErrorKind::Unauthorized);
        assert!(err.to_string().contains("Bad credentials"));
    }

    #[tokio::test]
    async fn publish_success_without_content_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"commit": {}})))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .publish(target("grafana/cpu.json"))
            .await
            .unwrap_err();

        assert!(matches!(err, PublishError::InvalidResponse { .. }));
    }

    #[tokio::test]
    async fn publish_empty_path_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server).publish(target("")).await.unwrap_err();

        assert!(matches!(err, PublishError::InvalidTarget { .. }));
    }
}
