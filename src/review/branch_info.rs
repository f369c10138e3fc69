use serde_json::Map;
use serde_json::Value;

use crate::options::Options;
use crate::review::BranchInfo;
use crate::review::CanCreateReview;
use crate::review::CheckResult;
use crate::review::Tally;
use crate::upsource;
use crate::upsource::UpsourceClient;

pub async fn check(client: &UpsourceClient, options: &Options, branch: &str) -> CheckResult {
    let mut supplied = Map::new();
    supplied.insert(
        "projectId".to_owned(),
        Value::from(options.upsource_project.as_str()),
    );
    supplied.insert("branch".to_owned(), Value::from(branch));
    match client.call("getBranchInfo", &supplied).await {
        Ok(result) => evaluate(client.endpoint(), &options.upsource_project, &result),
        Err(e) => CheckResult::fail(format!("Branch query failed: {e}")),
    }
}

/// ladder over the branch payload, the first broken rung is the verdict
pub fn evaluate(endpoint: &str, project: &str, result: &Value) -> CheckResult {
    let info: BranchInfo = match serde_json::from_value(result.clone()) {
        Ok(info) => info,
        Err(e) => return CheckResult::fail(format!("Malformed branch payload: {e}")),
    };
    if matches!(
        info.can_create_review,
        Some(CanCreateReview { is_allowed: true })
    ) {
        // a review can still be opened, so none gates this branch yet
        return CheckResult::fail("Not found branch review.".to_owned());
    }
    let review = match &info.review_info {
        Some(review) => review,
        None => return CheckResult::fail("Can't find reviewId".to_owned()),
    };
    let id = match review.id() {
        Some(id) => id,
        None => return CheckResult::fail("Can't find reviewId".to_owned()),
    };
    let tally = Tally::of(&review.participants);
    if tally.reviewers == 0 {
        return CheckResult::fail("Not found reviewer!".to_owned());
    }
    if tally.accepted < tally.reviewers {
        return CheckResult::fail(format!(
            "Has unfinished review: {accepted}/{total}",
            accepted = tally.accepted,
            total = tally.reviewers
        ));
    }
    CheckResult::pass(upsource::review_url(endpoint, project, id))
}
