use crate::modules::archive::domain::Category;
use crate::modules::crawl::domain::{catalog_job, listing_job};
use crate::modules::jobs::domain::entities::Job;
use crate::modules::jobs::domain::repository::JobRepository;
use crate::shared::errors::AppResult;
use crate::log_info;
use uuid::Uuid;

/// Cold start: one catalog crawl per board with an empty snapshot and one
/// first-attempt listing crawl per subreddit, queued in a single batch.
pub async fn seed(
    job_repository: &dyn JobRepository,
    boards: &[String],
    general_subreddits: &[String],
    politics_subreddits: &[String],
) -> AppResult<Vec<Uuid>> {
    let mut jobs: Vec<Job> = Vec::new();
    for board in boards {
        jobs.push(catalog_job(board, &[])?);
    }
    for channel in general_subreddits {
        jobs.push(listing_job(channel, Category::General, 0)?);
    }
    for channel in politics_subreddits {
        jobs.push(listing_job(channel, Category::Politics, 0)?);
    }

    if jobs.is_empty() {
        log_info!("Nothing to seed; no boards or subreddits configured");
        return Ok(Vec::new());
    }

    let ids = job_repository.enqueue_batch(jobs).await?;
    log_info!(
        "Seeded {} crawl jobs ({} boards, {} subreddits)",
        ids.len(),
        boards.len(),
        general_subreddits.len() + politics_subreddits.len()
    );
    Ok(ids)
}
