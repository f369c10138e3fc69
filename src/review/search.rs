use serde_json::Map;
use serde_json::Value;

use crate::options::Options;
use crate::review::CheckResult;
use crate::review::ReviewList;
use crate::review::Tally;
use crate::upsource;
use crate::upsource::UpsourceClient;

pub async fn check(client: &UpsourceClient, options: &Options, branch: &str) -> CheckResult {
    let mut supplied = Map::new();
    supplied.insert("limit".to_owned(), Value::from(options.default_limit));
    supplied.insert("query".to_owned(), Value::from(branch));
    supplied.insert(
        "projectId".to_owned(),
        Value::from(options.upsource_project.as_str()),
    );
    match client.call("getReviews", &supplied).await {
        Ok(result) => evaluate(client.endpoint(), &options.upsource_project, &result),
        Err(e) => CheckResult::fail(format!("Review query failed: {e}")),
    }
}

/// every review matching the branch must be fully accepted
pub fn evaluate(endpoint: &str, project: &str, result: &Value) -> CheckResult {
    let list: ReviewList = match serde_json::from_value(result.clone()) {
        Ok(list) => list,
        Err(e) => return CheckResult::fail(format!("Malformed review payload: {e}")),
    };
    if list.reviews.is_empty() {
        return CheckResult::fail("Not found branch review!".to_owned());
    }
    let mut is_pass = true;
    let mut lines = Vec::new();
    for review in &list.reviews {
        let tally = Tally::of(&review.participants);
        if !tally.is_pass() {
            is_pass = false;
        }
        let line = match review.id() {
            Some(id) => {
                let url = upsource::review_url(endpoint, project, id);
                format!(
                    "{id}\turl: <a target=_blank href={url}>{url}</a>\taccepted/pass: {accepted}/{total}",
                    accepted = tally.accepted,
                    total = tally.reviewers
                )
            }
            None => {
                is_pass = false;
                format!(
                    "missing reviewId\taccepted/pass: {accepted}/{total}",
                    accepted = tally.accepted,
                    total = tally.reviewers
                )
            }
        };
        lines.push(line);
    }
    CheckResult {
        is_pass,
        message: lines.join("\n"),
    }
}
