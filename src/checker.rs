use std::collections::BTreeMap;

use crate::error::Error;
use crate::options::Options;
use crate::repo;
use crate::review;
use crate::upsource::UpsourceClient;

pub struct Checker<'a> {
    options: &'a Options,
    client: &'a UpsourceClient,
}

impl<'a> Checker<'a> {
    pub fn new(options: &'a Options, client: &'a UpsourceClient) -> Checker<'a> {
        Checker { options, client }
    }

    /// true when every candidate branch has a fully-approved review
    pub async fn run(&self) -> Result<bool, Error> {
        let candidates =
            repo::candidate_branches(&self.options.repo_dir, &self.options.check_start_time)
                .await?;
        let mut failed: BTreeMap<String, String> = BTreeMap::new();
        for branch in &candidates {
            log::info!("check review of branch '{branch}'");
            let result = review::check_branch(self.client, self.options, branch).await;
            if result.is_pass {
                log::info!(
                    "review check pass, branch: {branch}\n{message}",
                    message = result.message
                );
            } else {
                failed.insert(branch.clone(), result.message);
            }
        }
        if failed.is_empty() {
            log::info!("Check review pass");
            return Ok(true);
        }
        log::error!("Check review failed! count: {}", failed.len());
        log::error!("\n{}", render_report(&failed));
        Ok(false)
    }
}

fn render_report(failed: &BTreeMap<String, String>) -> String {
    let blocks: Vec<String> = failed
        .iter()
        .map(|(branch, message)| {
            format!(
                "{banner}{branch}{banner}\n{message}",
                banner = "=".repeat(20)
            )
        })
        .collect();
    blocks.join("\n\n\n")
}
