//! Shared utility functions.
//!
//! Small helpers used across multiple modules. Nothing in this module is
//! HTTP-specific -- these are general-purpose building blocks.

// ---------------------------------------------------------------------------
// Environment helpers
// ---------------------------------------------------------------------------

/// Read an environment variable, returning `None` for empty or unset values.
pub(crate) fn read_env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// Mutex helpers
// ---------------------------------------------------------------------------

/// Lock a [`Mutex`](std::sync::Mutex), recovering from poison.
///
/// If the mutex was poisoned (a prior panic occurred while the lock was
/// held), logs a warning, clears the poison flag, and returns the guard
/// anyway.
///
/// # When this is safe
///
/// All `Mutex`es in this crate protect simple slots (an `Option<T>`
/// taken once, or a registry vector whose operations are single calls).
/// There is no multi-field invariant that a panicking thread could leave
/// half-updated, so the data behind the lock is always in a valid state.
pub(crate) fn lock_or_clear<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            warn!(
                "Mutex poisoned (prior panic while lock held); \
                 recovering -- protected data is a simple slot"
            );
            mutex.clear_poison();
            poisoned.into_inner()
        }
    }
}

// ---------------------------------------------------------------------------
// Percent-decoding
// ---------------------------------------------------------------------------

/// Decode `%XX` escapes in a string, leaving malformed escapes verbatim.
///
/// Used for URL userinfo and proxy credentials, where the parsed URL
/// hands back percent-encoded components. Decoded bytes are interpreted
/// as UTF-8 with lossy replacement.
pub(crate) fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && let Some(hex) = bytes.get(i + 1..i + 3)
            && let Ok(byte) = u8::from_str_radix(std::str::from_utf8(hex).unwrap_or(""), 16)
        {
            out.push(byte);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

// ---------------------------------------------------------------------------
// Tuple splat
// ---------------------------------------------------------------------------

/// Callable that accepts its arguments as a single tuple.
///
/// Implemented for closures of arity 2 through 4. See [`spread()`].
pub trait Spread<Args> {
    /// The closure's return type.
    type Output;

    /// Invoke the closure with the unpacked tuple.
    fn call_spread(&self, args: Args) -> Self::Output;
}

macro_rules! impl_spread {
    ($($name:ident),+) => {
        impl<F, $($name,)+ R> Spread<($($name,)+)> for F
        where
            F: Fn($($name),+) -> R,
        {
            type Output = R;

            #[allow(non_snake_case)]
            fn call_spread(&self, ($($name,)+): ($($name,)+)) -> R {
                self($($name),+)
            }
        }
    };
}

impl_spread!(A, B);
impl_spread!(A, B, C);
impl_spread!(A, B, C, D);

/// Adapt a multi-argument closure into one taking a single tuple.
///
/// Useful for feeding the tuple output of `futures_util::join!` (or a
/// zipped iterator) into a closure written with named parameters:
///
/// ```rust
/// let put = courier::spread(|name: &str, count: u32| format!("{name}={count}"));
/// assert_eq!(put(("retries", 3)), "retries=3");
/// ```
pub fn spread<F, Args>(f: F) -> impl Fn(Args) -> F::Output
where
    F: Spread<Args>,
{
    move |args| f.call_spread(args)
}
