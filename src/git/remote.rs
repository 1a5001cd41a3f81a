//! Remote transport classification and push capability.
//!
//! A scheduled push must never stop at an interactive credential prompt, so
//! before pushing we ask what transport the remote's push URL uses and whether
//! that transport can authenticate unattended.

use std::fmt;
use std::path::Path;

use git2::Repository;

use crate::error::GitError;

/// Transport a remote URL resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Ssh,
    Https,
    Http,
    /// The unauthenticated `git://` daemon protocol.
    Git,
    Local,
    Unknown,
}

impl Transport {
    /// Classify a remote URL the way git resolves it.
    ///
    /// Handles explicit schemes (`ssh://`, `https://`, `file://`, ...) and the
    /// scp-like `[user@]host:path` form, which git treats as SSH whenever a
    /// colon appears before the first slash.
    pub fn from_url(url: &str) -> Self {
        let url = url.trim();

        if let Some((scheme, _)) = url.split_once("://") {
            return match scheme.to_ascii_lowercase().as_str() {
                "ssh" | "git+ssh" | "ssh+git" => Transport::Ssh,
                "https" => Transport::Https,
                "http" => Transport::Http,
                "git" => Transport::Git,
                "file" => Transport::Local,
                _ => Transport::Unknown,
            };
        }

        if let Some(colon) = url.find(':') {
            let host = &url[..colon];
            if !host.is_empty() && !host.contains('/') && !is_drive_letter(host) {
                return Transport::Ssh;
            }
        }

        if url.is_empty() {
            Transport::Unknown
        } else {
            Transport::Local
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Ssh => "ssh",
            Transport::Https => "https",
            Transport::Http => "http",
            Transport::Git => "git",
            Transport::Local => "local",
            Transport::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_drive_letter(prefix: &str) -> bool {
    prefix.len() == 1 && prefix.chars().all(|c| c.is_ascii_alphabetic())
}

/// Whether a push can proceed without user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushCapability {
    Ready { transport: Transport },
    Unsupported { transport: Transport, reason: String },
}

impl PushCapability {
    /// Decide from the transport and whether a credential helper is configured.
    pub fn evaluate(transport: Transport, has_credential_helper: bool) -> Self {
        let unsupported = |reason: &str| PushCapability::Unsupported {
            transport,
            reason: reason.to_string(),
        };

        match transport {
            Transport::Ssh | Transport::Local => PushCapability::Ready { transport },
            Transport::Https if has_credential_helper => PushCapability::Ready { transport },
            Transport::Https => {
                unsupported("HTTPS remote has no credential helper and would prompt for a password")
            }
            Transport::Http => unsupported("plain HTTP is not a secure transport"),
            Transport::Git => unsupported("the git:// protocol does not support authenticated push"),
            Transport::Unknown => unsupported("remote URL uses an unrecognized transport"),
        }
    }
}

/// Inspect `remote` in the repository containing `root`.
///
/// Uses the push URL when one is configured, otherwise the fetch URL.
pub fn query_push_capability(root: &Path, remote: &str) -> Result<PushCapability, GitError> {
    let repo = Repository::discover(root).map_err(GitError::OpenRepository)?;
    let found = repo
        .find_remote(remote)
        .map_err(|e| GitError::RemoteNotFound(remote.to_string(), e))?;

    let url = found
        .pushurl()
        .or_else(|| found.url())
        .ok_or_else(|| GitError::RemoteUrlMissing(remote.to_string()))?;
    let transport = Transport::from_url(url);

    let has_helper = repo
        .config()
        .and_then(|c| c.get_string("credential.helper"))
        .map(|h| !h.trim().is_empty())
        .unwrap_or(false);

    Ok(PushCapability::evaluate(transport, has_helper))
}
