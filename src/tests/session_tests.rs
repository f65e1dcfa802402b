// src/tests/session_tests.rs
use super::utils::{sessions_for, test_site_config, FakeWeb};
use crate::errors::{BrowserError, ScrapeError};
use crate::session::{IdentityPool, RateLimiter};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const URL: &str = "https://leiloes.test/lista";

#[tokio::test]
async fn release_closes_browser_once() -> Result<(), Box<dyn std::error::Error>> {
    let web = Arc::new(FakeWeb::new().page(URL, "<html><head><title>Lista</title></head></html>"));
    let sessions = sessions_for(&web);
    let config = test_site_config(URL);

    let mut session = sessions.acquire("caixa", &config).await?;
    session.goto(URL).await?;
    assert_eq!(session.title().await?, "Lista");
    assert!(config.identities.identities().contains(session.identity()));

    sessions.release(session).await;
    assert_eq!(web.launched(), 1);
    assert_eq!(web.closed(), 1);
    Ok(())
}

#[tokio::test]
async fn scoped_session_releases_on_error() {
    let web = Arc::new(FakeWeb::new());
    let sessions = sessions_for(&web);
    let cancel = CancellationToken::new();

    let result: Result<(), ScrapeError> = sessions
        .with_session("zuk", &test_site_config(URL), &cancel, |session| {
            async move {
                session.goto(URL).await?;
                Err(ScrapeError::Config("selector drifted".into()))
            }
            .boxed()
        })
        .await;

    assert!(matches!(result, Err(ScrapeError::Config(_))));
    assert_eq!(web.closed(), 1);
}

#[tokio::test]
async fn scoped_session_releases_on_panic() {
    let web = Arc::new(FakeWeb::new());
    let sessions = sessions_for(&web);
    let cancel = CancellationToken::new();

    let result: Result<usize, ScrapeError> = sessions
        .with_session("zuk", &test_site_config(URL), &cancel, |session| {
            async move {
                session.goto(URL).await?;
                let broken: Option<usize> = None;
                Ok(broken.expect("card index out of range"))
            }
            .boxed()
        })
        .await;

    assert!(matches!(result, Err(ScrapeError::Panicked(ref msg)) if msg.contains("card index")));
    assert_eq!(web.closed(), 1);
}

#[tokio::test]
async fn cancelled_before_acquire_never_launches() {
    let web = Arc::new(FakeWeb::new());
    let sessions = sessions_for(&web);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result: Result<(), ScrapeError> = sessions
        .with_session("zuk", &test_site_config(URL), &cancel, |_session| async { Ok(()) }.boxed())
        .await;

    assert!(matches!(result, Err(ScrapeError::Cancelled)));
    assert_eq!(web.launched(), 0);
}

#[tokio::test]
async fn launch_failure_is_reported() {
    let web = Arc::new(FakeWeb::new().failing_launch());
    let sessions = sessions_for(&web);
    let result = sessions.acquire("caixa", &test_site_config(URL)).await;
    assert!(matches!(result, Err(ScrapeError::Browser(BrowserError::Launch(_)))));
}

#[tokio::test]
async fn page_operations_are_time_bounded() -> Result<(), Box<dyn std::error::Error>> {
    let web = Arc::new(FakeWeb::new().latency("slow.test", Duration::from_secs(5)));
    let sessions = sessions_for(&web);
    let mut session = sessions.acquire("caixa", &test_site_config(URL)).await?;

    let err = session.goto("https://slow.test/lista").await.unwrap_err();
    assert!(err.is_timeout());

    sessions.release(session).await;
    Ok(())
}

#[tokio::test]
async fn hung_stealth_step_times_out_and_closes() {
    let web = Arc::new(FakeWeb::new().slow_stealth(Duration::from_secs(30)));
    let sessions = sessions_for(&web);

    let started = std::time::Instant::now();
    let result = sessions.acquire("caixa", &test_site_config(URL)).await;

    assert!(matches!(result, Err(ref e) if e.is_timeout()));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(web.launched(), 1);
    assert_eq!(web.closed(), 1);
}

#[tokio::test]
async fn aborted_task_still_closes_its_browser() {
    let web = Arc::new(FakeWeb::new().latency("slow.test", Duration::from_secs(30)));
    let sessions = sessions_for(&web);
    let config = test_site_config(URL);

    let task = tokio::spawn(async move {
        let cancel = CancellationToken::new();
        let result: Result<(), ScrapeError> = sessions
            .with_session("zuk", &config, &cancel, |session| {
                async move { session.goto("https://slow.test/lista").await }.boxed()
            })
            .await;
        result
    });

    // Let the body reach the slow navigation, then abort mid-body.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(web.launched(), 1);
    assert_eq!(web.closed(), 0);
    task.abort();
    assert!(task.await.is_err_and(|e| e.is_cancelled()));

    // The background close spawned on drop.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(web.closed(), 1);
}

#[tokio::test]
async fn sessions_are_independent() -> Result<(), Box<dyn std::error::Error>> {
    let web = Arc::new(FakeWeb::new());
    let sessions = sessions_for(&web);
    let mut session = sessions.acquire("caixa", &test_site_config(URL)).await?;
    assert!(!session.is_released());

    let result = sessions
        .with_session("caixa", &test_site_config(URL), &CancellationToken::new(), |_s| async { Ok(7) }.boxed())
        .await?;
    assert_eq!(result, 7);

    session.goto(URL).await?;
    sessions.release(session).await;
    assert_eq!(web.closed(), 2);
    Ok(())
}

#[test]
fn rate_limiter_stays_within_bounds() {
    let limiter = RateLimiter::from_millis(50, 10);
    assert_eq!(limiter.bounds(), (Duration::from_millis(10), Duration::from_millis(50)));
    for _ in 0..100 {
        let d = limiter.next_delay();
        assert!(d >= Duration::from_millis(10) && d <= Duration::from_millis(50));
    }
    assert_eq!(RateLimiter::disabled().next_delay(), Duration::ZERO);
}

#[test]
fn identity_pool_picks_members() {
    let pool = IdentityPool::default();
    for _ in 0..20 {
        assert!(pool.identities().contains(&pool.pick()));
    }
    let empty = IdentityPool::new(Vec::new());
    assert!(empty.is_empty());
    assert!(!empty.pick().user_agent.is_empty());
}
