use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// 키 하나의 고정 윈도 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub count: u64,
    /// 윈도가 끝나는 시각 (epoch 밀리초)
    pub window_reset_time: u64,
}

impl RateLimitState {
    pub fn is_expired(&self, now: u64) -> bool {
        self.window_reset_time <= now
    }
}

/// 판정 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowDecision {
    Allowed { remaining: u64, reset_at: u64 },
    Limited { reset_at: u64 },
}

/// 고정 윈도 카운터 알고리즘. 저장소와 무관한 순수 계산입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedWindow {
    pub window_ms: u64,
    pub max_requests: u64,
}

impl FixedWindow {
    pub fn new(window_ms: u64, max_requests: u64) -> Self {
        Self {
            window_ms,
            max_requests,
        }
    }

    /// 현재 상태로 요청 하나를 판정하고 저장할 다음 상태를 반환합니다.
    pub fn evaluate(
        &self,
        state: Option<RateLimitState>,
        now: u64,
    ) -> (RateLimitState, WindowDecision) {
        let state = match state {
            Some(state) if !state.is_expired(now) => state,
            _ => RateLimitState {
                count: 0,
                window_reset_time: now.saturating_add(self.window_ms),
            },
        };

        if state.count >= self.max_requests {
            return (
                state,
                WindowDecision::Limited {
                    reset_at: state.window_reset_time,
                },
            );
        }

        let next = RateLimitState {
            count: state.count + 1,
            ..state
        };
        (
            next,
            WindowDecision::Allowed {
                remaining: self.max_requests - next.count,
                reset_at: next.window_reset_time,
            },
        )
    }
}

/// 속도 제한 상태 저장소 trait
///
/// 메모리 외의 저장소(분산 캐시 등)로 바꿔도 윈도 알고리즘은 그대로입니다.
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<RateLimitState>;

    async fn set(&self, key: &str, state: RateLimitState);

    /// 만료된 항목을 지우고 지운 개수를 반환합니다.
    async fn purge_expired(&self, now: u64) -> usize;

    /// 읽기-검사-증가를 하나의 원자적 단위로 수행합니다.
    async fn hit(&self, key: &str, window: &FixedWindow, now: u64) -> WindowDecision;
}

/// 프로세스 내부 메모리 저장소
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, RateLimitState>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

fn purge(entries: &mut HashMap<String, RateLimitState>, now: u64) -> usize {
    let before = entries.len();
    entries.retain(|_, state| !state.is_expired(now));
    before - entries.len()
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get(&self, key: &str) -> Option<RateLimitState> {
        self.entries.read().await.get(key).copied()
    }

    async fn set(&self, key: &str, state: RateLimitState) {
        self.entries.write().await.insert(key.to_string(), state);
    }

    async fn purge_expired(&self, now: u64) -> usize {
        purge(&mut *self.entries.write().await, now)
    }

    async fn hit(&self, key: &str, window: &FixedWindow, now: u64) -> WindowDecision {
        let mut entries = self.entries.write().await;

        let purged = purge(&mut entries, now);
        if purged > 0 {
            debug!(purged, "만료된 rate limit 항목 정리");
        }

        let (state, decision) = window.evaluate(entries.get(key).copied(), now);
        entries.insert(key.to_string(), state);
        decision
    }
}
