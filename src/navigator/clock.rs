use std::time::{Duration, Instant};

/// 轮询等待使用的时钟，测试中可替换为手动时钟
pub trait Clock {
    fn now(&self) -> Instant;

    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
