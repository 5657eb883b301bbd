/// Read-through caching over a `TieredCache`.
///
/// Checks the cache for `$key`. On a hit the cached value is returned. On a
/// miss the async `$block` runs, its value is written to the cache (memory
/// and/or durable tier, per the cache's policy) and then returned. Errors from
/// `$block` propagate with `?` and nothing is cached.
///
/// # Arguments
/// * `$cache`: a `TieredCache<T>`.
/// * `$key`: the `CacheKey` to read and write.
/// * `$block`: future producing `AppResult<T>` on a miss.
///
/// # Example
/// ```rust,ignore
/// let route = cached!(self.cache.routes, key, async move {
///     self.provider.compute_route(origin, destination, mode).await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        if let Some(cached) = $cache.get(&$key).await {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.put(&$key, ::std::clone::Clone::clone(&value)).await;
            Ok(value)
        }
    }};
}
