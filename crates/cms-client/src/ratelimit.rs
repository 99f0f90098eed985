use std::{num::NonZeroU32, sync::Arc};

use governor::{DefaultDirectRateLimiter, Quota};

pub type RateLimiter = DefaultDirectRateLimiter;

/// Process-wide limiter shared by every outbound API call.
pub fn rate_limiter(requests_per_second: u32) -> Arc<RateLimiter> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rate)))
}
