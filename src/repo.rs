use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::command;
use crate::error::Error;

pub const TRUNK: &str = "origin/master";

static ORIGIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new("^origin/(.*)$").unwrap());

/// normalized names of branches that were merged into trunk after the cutoff
/// and therefore need a review check
pub async fn candidate_branches(dir: &Path, after: &str) -> Result<BTreeSet<String>, Error> {
    let tips = merge_tips(dir, after).await?;
    log::info!("merge commits after '{after}': {}", tips.len());

    let mut relation: BTreeSet<String> = BTreeSet::new();
    for tip in &tips {
        let branches = containing_branches(dir, tip).await?;
        // tips already reachable from trunk need no further tracking
        if branches.contains(TRUNK) {
            continue;
        }
        relation.extend(branches);
    }
    let merged = merged_branches(dir).await?;
    log::info!("relation branches: {relation:?}");
    log::info!("merged branches: {merged:?}");

    let candidates = normalize(relation.intersection(&merged));
    log::info!(
        "check branch count: {count}, list: {candidates:?}",
        count = candidates.len()
    );
    Ok(candidates)
}

/// second parents of first-parent merge commits after the cutoff
async fn merge_tips(dir: &Path, after: &str) -> Result<Vec<String>, Error> {
    let cmd = format!("git log --after='{after}' --first-parent --pretty='%h %P'");
    let output = git(dir, &cmd).await?;
    Ok(parse_merge_tips(&output))
}

async fn containing_branches(dir: &Path, tip: &str) -> Result<BTreeSet<String>, Error> {
    let cmd = format!("git branch -r --contains {tip}");
    let output = git(dir, &cmd).await?;
    Ok(parse_branch_list(&output))
}

async fn merged_branches(dir: &Path) -> Result<BTreeSet<String>, Error> {
    let output = git(dir, "git branch -r --merged").await?;
    let mut branches = parse_branch_list(&output);
    // trunk is trivially merged into itself
    branches.remove(TRUNK);
    Ok(branches)
}

async fn git(dir: &Path, cmd: &str) -> Result<String, Error> {
    let output = command::run_with_retry(
        cmd,
        dir,
        command::DEFAULT_TIMEOUT,
        command::DEFAULT_RETRY_TIMES,
        command::DEFAULT_RETRY_INTERVAL,
    )
    .await?;
    Ok(output.stdout)
}

fn parse_merge_tips(log: &str) -> Vec<String> {
    let mut tips = Vec::new();
    for line in log.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        // '%h %P' yields three or more fields only for merge commits
        if fields.len() >= 3 {
            tips.push(fields[2].to_owned());
        }
    }
    tips
}

fn parse_branch_list(raw: &str) -> BTreeSet<String> {
    raw.lines()
        .map(str::trim)
        // "origin/HEAD -> origin/master" is an alias, not a branch
        .filter(|line| !line.is_empty() && !line.contains("->"))
        .map(str::to_owned)
        .collect()
}

fn normalize<'a, I>(branches: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a String>,
{
    branches
        .into_iter()
        .filter_map(|branch| branch_name_map_filter(branch))
        .map(str::trim)
        .filter(|branch| !branch.is_empty())
        .map(str::to_owned)
        .collect()
}

fn branch_name_map_filter(name: &str) -> Option<&str> {
    if name == "origin/HEAD" {
        return None;
    }

    let captures = match ORIGIN_RE.captures(name) {
        Some(cap) => cap,
        None => return Some(name),
    };

    Some(captures.get(1).unwrap().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::run_checked;
    use crate::command::DEFAULT_TIMEOUT;

    #[test]
    fn merge_tips_come_from_second_parents() {
        let log = "\
aaa111 bbb222 ccc333
ddd444 eee555
fff666 ggg777 hhh888 iii999
";
        assert_eq!(parse_merge_tips(log), vec!["ccc333", "hhh888"]);
    }

    #[test]
    fn branch_list_skips_alias_and_blank_lines() {
        let raw = "\
  origin/HEAD -> origin/master
  origin/master
  origin/feature/x

";
        let parsed = parse_branch_list(raw);
        let expected: BTreeSet<String> = ["origin/master", "origin/feature/x"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn normalization_strips_remote_prefix() {
        let branches: BTreeSet<String> = ["origin/a", "local-branch", "origin/HEAD", "origin/"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        let normalized = normalize(&branches);
        let expected: BTreeSet<String> = ["a", "local-branch"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        assert_eq!(normalized, expected);
    }

    #[test]
    fn candidates_are_the_normalized_intersection() {
        let relation: BTreeSet<String> = ["origin/a", "origin/b"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        let merged: BTreeSet<String> = ["origin/b", "origin/c"]
            .into_iter()
            .map(str::to_owned)
            .collect();
        let candidates = normalize(relation.intersection(&merged));
        let expected: BTreeSet<String> = ["b"].into_iter().map(str::to_owned).collect();
        assert_eq!(candidates, expected);
    }

    async fn git_in(dir: &Path, args: &str) {
        let cmd = format!(
            "git -c user.name=test -c user.email=test@example.com -c commit.gpgsign=false {args}"
        );
        run_checked(&cmd, dir, DEFAULT_TIMEOUT).await.unwrap();
    }

    #[tokio::test]
    async fn resolves_branch_merged_through_local_trunk() {
        let tmp = tempfile::tempdir().unwrap();
        let origin = tmp.path().join("origin");
        let work = tmp.path().join("work");
        std::fs::create_dir_all(&origin).unwrap();

        git_in(&origin, "init .").await;
        git_in(&origin, "symbolic-ref HEAD refs/heads/master").await;
        git_in(&origin, "commit --allow-empty -m one").await;
        git_in(&origin, "checkout -b feature/x").await;
        git_in(&origin, "commit --allow-empty -m two").await;
        git_in(&origin, "checkout master").await;

        git_in(
            tmp.path(),
            &format!("clone '{o}' '{w}'", o = origin.display(), w = work.display()),
        )
        .await;
        // merged locally, never pushed, so origin/master does not contain it
        git_in(&work, "merge --no-ff origin/feature/x -m merge-feature").await;

        let candidates = candidate_branches(&work, "2020-01-01 00:00:00")
            .await
            .unwrap();
        let expected: BTreeSet<String> = ["feature/x"].into_iter().map(str::to_owned).collect();
        assert_eq!(candidates, expected);
    }

    #[tokio::test]
    async fn future_cutoff_yields_no_candidates() {
        let tmp = tempfile::tempdir().unwrap();
        let origin = tmp.path().join("origin");
        std::fs::create_dir_all(&origin).unwrap();

        git_in(&origin, "init .").await;
        git_in(&origin, "symbolic-ref HEAD refs/heads/master").await;
        git_in(&origin, "commit --allow-empty -m one").await;

        let candidates = candidate_branches(&origin, "2999-01-01 00:00:00")
            .await
            .unwrap();
        assert!(candidates.is_empty());
    }
}
