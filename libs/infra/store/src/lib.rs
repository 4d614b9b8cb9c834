//! The durable store (§4.1): jobs, workers, credits and auth behind a
//! transactional libsql connection, exposing the atomic operations the
//! rest of the coordinator relies on (CAS assignment, conditional
//! deduction, requeue-on-teardown).

mod client;
mod errors;
mod repositories;
mod schema;

pub use client::Store;
pub use errors::StoreError;

#[cfg(test)]
mod tests {
    use super::*;
    use gridx_domain_models::job::{JobLimits, Language};
    use gridx_domain_models::worker::{WorkerCapabilities, WorkerStatus};
    use uuid::Uuid;

    async fn memory_store() -> Store {
        Store::connect(":memory:", None).await.expect("in-memory store connects")
    }

    #[tokio::test]
    async fn create_and_fetch_job_round_trips() {
        let store = memory_store().await;
        let id = Uuid::new_v4();
        store
            .create_job(id, "alice", "print('hi')", Language::Python, &JobLimits::none(), 6.0)
            .await
            .unwrap();

        let job = store.get_job(id).await.unwrap().expect("job exists");
        assert_eq!(job.submitter_id, "alice");
        assert_eq!(job.reserved_cost, 6.0);
        assert_eq!(job.status.as_str(), "queued");
        assert!(job.worker_id.is_none());
    }

    #[tokio::test]
    async fn assign_to_worker_is_cas_and_single_shot() {
        let store = memory_store().await;
        let job_id = Uuid::new_v4();
        let worker_id = Uuid::new_v4();

        store
            .create_job(job_id, "alice", "1+1", Language::Python, &JobLimits::none(), 1.0)
            .await
            .unwrap();
        store
            .upsert_worker(worker_id, None, &WorkerCapabilities::default(), Some("bob"), None)
            .await
            .unwrap();

        assert!(store.assign_job_to_worker(job_id, worker_id).await.unwrap());
        // Already running: a second assign attempt must fail.
        assert!(!store.assign_job_to_worker(job_id, worker_id).await.unwrap());

        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status.as_str(), "running");
        assert_eq!(job.worker_id, Some(worker_id));
    }

    #[tokio::test]
    async fn deduct_never_goes_negative() {
        let store = memory_store().await;
        store.ensure_user("alice", 10.0).await.unwrap();

        assert!(store.deduct("alice", 6.0).await.unwrap());
        assert!(!store.deduct("alice", 6.0).await.unwrap());
        assert_eq!(store.get_balance("alice").await.unwrap(), 4.0);
    }

    #[tokio::test]
    async fn credit_creates_user_with_zero_balance_if_absent() {
        let store = memory_store().await;
        store.credit("bob", 5.0).await.unwrap();
        assert_eq!(store.get_balance("bob").await.unwrap(), 5.0);
    }

    #[tokio::test]
    async fn get_balance_does_not_create_a_row_for_unknown_user() {
        let store = memory_store().await;
        assert_eq!(store.get_balance("nobody").await.unwrap(), 0.0);
        assert!(store.get_user_credits("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn requeue_running_jobs_for_worker_resets_and_returns_ids() {
        let store = memory_store().await;
        let job_id = Uuid::new_v4();
        let worker_id = Uuid::new_v4();

        store
            .create_job(job_id, "alice", "1+1", Language::Python, &JobLimits::none(), 1.0)
            .await
            .unwrap();
        store
            .upsert_worker(worker_id, None, &WorkerCapabilities::default(), Some("bob"), None)
            .await
            .unwrap();
        store.assign_job_to_worker(job_id, worker_id).await.unwrap();

        let requeued = store.requeue_running_jobs_for_worker(worker_id).await.unwrap();
        assert_eq!(requeued, vec![job_id]);

        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status.as_str(), "queued");
        assert!(job.worker_id.is_none());
        assert!(job.started_at.is_none());
    }

    #[tokio::test]
    async fn worker_reconnect_lookup_finds_existing_row_by_owner_and_token() {
        let store = memory_store().await;
        let worker_id = Uuid::new_v4();
        store
            .upsert_worker(
                worker_id,
                None,
                &WorkerCapabilities::default(),
                Some("bob"),
                Some("token-1"),
            )
            .await
            .unwrap();

        let found = store.get_worker_by_auth("bob", "token-1").await.unwrap();
        assert_eq!(found, Some(worker_id));
        assert_eq!(store.get_worker_by_auth("bob", "token-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn user_auth_distinguishes_new_match_and_mismatch() {
        use gridx_domain_models::auth::AuthCheck;

        let store = memory_store().await;
        assert_eq!(store.check_user_auth("bob", "t1").await.unwrap(), AuthCheck::NewUser);

        store.register_user_auth("bob", "t1").await.unwrap();
        assert_eq!(store.check_user_auth("bob", "t1").await.unwrap(), AuthCheck::Match);
        assert_eq!(store.check_user_auth("bob", "t2").await.unwrap(), AuthCheck::Mismatch);
    }

    #[tokio::test]
    async fn complete_job_marks_worker_idle_and_increments_count_on_success() {
        let store = memory_store().await;
        let job_id = Uuid::new_v4();
        let worker_id = Uuid::new_v4();

        store
            .create_job(job_id, "alice", "1+1", Language::Python, &JobLimits::none(), 1.0)
            .await
            .unwrap();
        store
            .upsert_worker(worker_id, None, &WorkerCapabilities::default(), Some("bob"), None)
            .await
            .unwrap();
        store.assign_job_to_worker(job_id, worker_id).await.unwrap();

        store.complete_job(job_id, worker_id, "ok", "", 0).await.unwrap();

        let job = store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status.as_str(), "completed");

        let worker = store.get_worker(worker_id).await.unwrap().unwrap();
        assert_eq!(worker.status, WorkerStatus::Idle);
        assert_eq!(worker.jobs_completed, 1);
    }
}
