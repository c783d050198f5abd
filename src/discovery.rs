use std::process::Stdio;

use serde::Deserialize;

use crate::config::CommandTemplate;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListedRepo {
    name_with_owner: String,
}

/// List the repositories of every user, in the order the users were given.
///
/// A user whose listing cannot be started or exits non-zero contributes no
/// repositories; the others are unaffected.
pub async fn discover_all(users: &[String], lister: &CommandTemplate) -> Vec<String> {
    let mut repos = Vec::new();
    for user in users {
        match discover_user(user, lister).await {
            Some(found) => {
                tracing::info!("{}: {} repositories", user, found.len());
                repos.extend(found);
            }
            None => tracing::warn!("{}: repository listing failed", user),
        }
    }
    repos
}

async fn discover_user(user: &str, lister: &CommandTemplate) -> Option<Vec<String>> {
    let output = lister
        .command("user", user)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .await
        .map_err(|e| tracing::warn!("failed to run '{}': {}", lister.program(), e))
        .ok()?;

    if !output.status.success() {
        return None;
    }

    Some(parse_listing(&String::from_utf8_lossy(&output.stdout)))
}

/// Accept either a JSON array of `{"nameWithOwner": ...}` objects or plain
/// text with one name per line.
fn parse_listing(text: &str) -> Vec<String> {
    if let Ok(listed) = serde_json::from_str::<Vec<ListedRepo>>(text) {
        return listed.into_iter().map(|r| r.name_with_owner).collect();
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}
