// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (C) 2025 Shahzad A. Bhatti <bhatti@plexobject.com>
//
// This file is part of Arbiter.
//
// Arbiter is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// Arbiter is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with Arbiter. If not, see <https://www.gnu.org/licenses/>.

//! Redis lock integration tests.
//!
//! These tests verify:
//! - The record layout in Redis (hash `owner` field plus a millisecond TTL)
//! - Acquisition, contention, release and refresh through the Lua scripts
//! - Wait timeouts, lease expiry and watchdog renewal against a live server
//! - Prefix isolation and mutual exclusion across handles
//!
//! Every test skips when no Redis answers at `ARBITER_TEST_REDIS_URL`
//! (default `redis://127.0.0.1:6379`). Lock names carry a ULID suffix so runs
//! never collide.

#[cfg(feature = "redis-backend")]
mod tests {
    use arbiter_common::test_helpers::{get_redis_url, redis_available, unique_name};
    use arbiter_common::OpContext;
    use arbiter_locks::{
        create_client_from_config, redis::RedisLockStore, scripts::OWNER_FIELD, BackendType,
        ClientConfig, LockClient, LockError, LockOptions, LockState, LockStore,
    };
    use redis::aio::MultiplexedConnection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::{sleep, Duration, Instant};

    macro_rules! require_redis {
        () => {
            if !redis_available().await {
                eprintln!("Skipping: Redis not available at {}", get_redis_url());
                return;
            }
        };
    }

    async fn create_client() -> LockClient {
        LockClient::connect(&get_redis_url())
            .await
            .expect("Failed to connect lock client to Redis")
    }

    async fn raw_connection() -> MultiplexedConnection {
        redis::Client::open(get_redis_url())
            .unwrap()
            .get_multiplexed_async_connection()
            .await
            .unwrap()
    }

    async fn hget_owner(conn: &mut MultiplexedConnection, key: &str) -> Option<String> {
        redis::cmd("HGET")
            .arg(key)
            .arg(OWNER_FIELD)
            .query_async(conn)
            .await
            .unwrap()
    }

    async fn pttl(conn: &mut MultiplexedConnection, key: &str) -> i64 {
        redis::cmd("PTTL").arg(key).query_async(conn).await.unwrap()
    }

    async fn exists(conn: &mut MultiplexedConnection, key: &str) -> bool {
        let count: i64 = redis::cmd("EXISTS").arg(key).query_async(conn).await.unwrap();
        count == 1
    }

    #[tokio::test]
    async fn test_redis_lock_record_layout() {
        require_redis!();
        let client = create_client().await;
        let mut conn = raw_connection().await;
        let ctx = OpContext::background();
        let name = unique_name("test-layout");
        let key = client.key_for(&name);

        let lock = client.new_lock(&name).unwrap();
        lock.lock(&ctx).await.unwrap();

        assert!(key.starts_with("arbiter:"));
        assert_eq!(hget_owner(&mut conn, &key).await.as_deref(), Some(lock.token()));
        let ttl = pttl(&mut conn, &key).await;
        assert!(ttl > 29_000 && ttl <= 30_000, "unexpected PTTL {}", ttl);

        let record = client.get_record(&name).await.unwrap().unwrap();
        assert_eq!(record.owner, lock.token());
        assert!(record.ttl.is_some());

        lock.unlock(&ctx).await.unwrap();
        assert!(!exists(&mut conn, &key).await);
        assert!(client.get_record(&name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redis_try_lock_contention() {
        require_redis!();
        let client = create_client().await;
        let ctx = OpContext::background();
        let name = unique_name("test-trylock");

        let lock1 = client.new_lock(&name).unwrap();
        let lock2 = client.new_lock(&name).unwrap();

        assert!(lock1.try_lock(&ctx).await.unwrap());
        assert!(!lock2.try_lock(&ctx).await.unwrap());
        assert!(!lock1.try_lock(&ctx).await.unwrap());

        lock1.unlock(&ctx).await.unwrap();
        assert!(lock2.try_lock(&ctx).await.unwrap());
        lock2.unlock(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_lock_wait_timeout() {
        require_redis!();
        let client = create_client().await;
        let ctx = OpContext::background();
        let name = unique_name("test-timeout");

        let holder = client.new_lock(&name).unwrap();
        let waiter = client
            .new_lock_with_options(
                &name,
                LockOptions::default().with_wait_timeout(Duration::from_secs(2)),
            )
            .unwrap();

        holder.lock(&ctx).await.unwrap();

        let start = Instant::now();
        let err = waiter.lock(&ctx).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(err.is_timeout(), "expected timeout, got {:?}", err);
        assert!(elapsed >= Duration::from_secs(2));
        assert!(elapsed < Duration::from_millis(2500), "gave up late: {:?}", elapsed);

        holder.unlock(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_lock_waits_for_release() {
        require_redis!();
        let client = create_client().await;
        let ctx = OpContext::background();
        let name = unique_name("test-handoff");

        let holder = client.new_lock(&name).unwrap();
        let waiter = client
            .new_lock_with_options(
                &name,
                LockOptions::default().with_wait_timeout(Duration::from_secs(5)),
            )
            .unwrap();
        holder.lock(&ctx).await.unwrap();

        let release_ctx = ctx.clone();
        let task = tokio::spawn(async move {
            sleep(Duration::from_millis(300)).await;
            holder.unlock(&release_ctx).await
        });

        waiter.lock(&ctx).await.unwrap();
        task.await.unwrap().unwrap();
        waiter.unlock(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_lease_expiry() {
        require_redis!();
        let client = create_client().await;
        let mut conn = raw_connection().await;
        let ctx = OpContext::background();
        let name = unique_name("test-expiry");

        let lock = client
            .new_lock_with_options(
                &name,
                LockOptions::default().with_lease_time(Duration::from_millis(500)),
            )
            .unwrap();
        lock.lock(&ctx).await.unwrap();

        sleep(Duration::from_millis(800)).await;

        assert!(!exists(&mut conn, &client.key_for(&name)).await);
        assert!(lock.refresh(&ctx).await.unwrap_err().is_not_held());
        assert_eq!(lock.state().await, LockState::Lost);
        assert!(matches!(lock.try_lock(&ctx).await, Err(LockError::LockLost(_))));

        let successor = client.new_lock(&name).unwrap();
        assert!(successor.try_lock(&ctx).await.unwrap());
        successor.unlock(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_refresh_resets_ttl() {
        require_redis!();
        let client = create_client().await;
        let mut conn = raw_connection().await;
        let ctx = OpContext::background();
        let name = unique_name("test-refresh");
        let key = client.key_for(&name);

        let lock = client
            .new_lock_with_options(
                &name,
                LockOptions::default().with_lease_time(Duration::from_secs(2)),
            )
            .unwrap();
        lock.lock(&ctx).await.unwrap();

        sleep(Duration::from_millis(1200)).await;
        assert!(pttl(&mut conn, &key).await <= 800);

        lock.refresh(&ctx).await.unwrap();
        let ttl = pttl(&mut conn, &key).await;
        assert!(ttl > 1_500 && ttl <= 2_000, "unexpected PTTL {}", ttl);

        lock.unlock(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_watchdog_keeps_lock_alive() {
        require_redis!();
        let client = create_client().await;
        let mut conn = raw_connection().await;
        let ctx = OpContext::background();
        let name = unique_name("test-watchdog");
        let key = client.key_for(&name);

        let lock = client
            .new_lock_with_options(
                &name,
                LockOptions::default()
                    .with_watchdog(true)
                    .with_watchdog_interval(Duration::from_secs(1)),
            )
            .unwrap();
        lock.lock(&ctx).await.unwrap();

        sleep(Duration::from_millis(2500)).await;

        assert_eq!(hget_owner(&mut conn, &key).await.as_deref(), Some(lock.token()));
        let ttl = pttl(&mut conn, &key).await;
        assert!(ttl > 0 && ttl <= 1_000, "unexpected PTTL {}", ttl);
        assert!(lock.watchdog_running().await);

        lock.unlock(&ctx).await.unwrap();
        assert!(!lock.watchdog_running().await);
        assert!(!exists(&mut conn, &key).await);
    }

    #[tokio::test]
    async fn test_redis_watchdog_stops_with_context() {
        require_redis!();
        let client = create_client().await;
        let mut conn = raw_connection().await;
        let name = unique_name("test-watchdog-ctx");

        let lock = client
            .new_lock_with_options(
                &name,
                LockOptions::default()
                    .with_watchdog(true)
                    .with_watchdog_interval(Duration::from_secs(1)),
            )
            .unwrap();

        let acquire_ctx = OpContext::background().child();
        lock.lock(&acquire_ctx).await.unwrap();
        acquire_ctx.cancel();

        sleep(Duration::from_millis(1500)).await;

        assert!(!exists(&mut conn, &client.key_for(&name)).await);
        assert!(!lock.watchdog_running().await);
    }

    #[tokio::test]
    async fn test_redis_unlock_by_non_owner() {
        require_redis!();
        let client = create_client().await;
        let mut conn = raw_connection().await;
        let ctx = OpContext::background();
        let name = unique_name("test-non-owner");
        let key = client.key_for(&name);

        let holder = client.new_lock(&name).unwrap();
        let stranger = client.new_lock(&name).unwrap();

        assert!(stranger.unlock(&ctx).await.unwrap_err().is_not_held());

        holder.lock(&ctx).await.unwrap();
        assert!(stranger.unlock(&ctx).await.unwrap_err().is_not_held());
        assert!(stranger.refresh(&ctx).await.unwrap_err().is_not_held());
        assert_eq!(hget_owner(&mut conn, &key).await.as_deref(), Some(holder.token()));

        holder.unlock(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_store_primitives() {
        require_redis!();
        let store = RedisLockStore::new(&get_redis_url()).await.unwrap();
        let key = unique_name("arbiter-test:store");
        let ttl = Duration::from_secs(10);

        assert!(store.try_acquire(&key, "token-1", ttl).await.unwrap());
        assert!(!store.try_acquire(&key, "token-2", ttl).await.unwrap());

        assert!(!store.refresh(&key, "token-2", ttl).await.unwrap());
        assert!(store.refresh(&key, "token-1", ttl).await.unwrap());

        assert!(!store.release(&key, "token-2").await.unwrap());
        assert!(store.release(&key, "token-1").await.unwrap());
        assert!(!store.release(&key, "token-1").await.unwrap());
        assert!(store.get_record(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redis_prefix_isolation() {
        require_redis!();
        let store: Arc<RedisLockStore> =
            Arc::new(RedisLockStore::new(&get_redis_url()).await.unwrap());
        let client1 = LockClient::new(store.clone()).with_key_prefix("arbiter-test-a:");
        let client2 = LockClient::new(store.clone()).with_key_prefix("arbiter-test-b:");
        let ctx = OpContext::background();
        let name = unique_name("test-prefix");

        let lock1 = client1.new_lock(&name).unwrap();
        let lock2 = client2.new_lock(&name).unwrap();

        lock1.lock(&ctx).await.unwrap();
        assert!(lock2.try_lock(&ctx).await.unwrap());

        lock1.unlock(&ctx).await.unwrap();
        lock2.unlock(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_client_from_config() {
        require_redis!();
        let config = ClientConfig {
            backend: BackendType::Redis {
                url: get_redis_url(),
            },
            key_prefix: "arbiter-config:".to_string(),
            lock_defaults: LockOptions::default().with_lease_time(Duration::from_secs(5)),
        };
        let client = create_client_from_config(config).await.unwrap();
        let mut conn = raw_connection().await;
        let ctx = OpContext::background();
        let name = unique_name("test-config");

        let lock = client.new_lock(&name).unwrap();
        lock.lock(&ctx).await.unwrap();

        let key = format!("arbiter-config:{}", name);
        let ttl = pttl(&mut conn, &key).await;
        assert!(ttl > 4_000 && ttl <= 5_000, "unexpected PTTL {}", ttl);

        lock.unlock(&ctx).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_redis_concurrent_mutual_exclusion() {
        require_redis!();
        const TASKS: usize = 4;
        const ITERATIONS: usize = 3;

        let client = create_client().await;
        let name = unique_name("test-concurrent");
        let holders = Arc::new(AtomicUsize::new(0));
        let max_holders = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..TASKS {
            let client = client.clone();
            let name = name.clone();
            let holders = holders.clone();
            let max_holders = max_holders.clone();

            handles.push(tokio::spawn(async move {
                let ctx = OpContext::background();
                let lock = client
                    .new_lock_with_options(
                        &name,
                        LockOptions::default()
                            .with_wait_timeout(Duration::from_secs(30))
                            .with_retry_interval(Duration::from_millis(10)),
                    )
                    .unwrap();

                for _ in 0..ITERATIONS {
                    lock.lock(&ctx).await.unwrap();
                    let now = holders.fetch_add(1, Ordering::SeqCst) + 1;
                    max_holders.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(10)).await;
                    holders.fetch_sub(1, Ordering::SeqCst);
                    lock.unlock(&ctx).await.unwrap();
                }
            }));
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_holders.load(Ordering::SeqCst), 1);
    }
}
